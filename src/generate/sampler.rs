use std::collections::BTreeMap;

use rand::Rng;

use crate::{
    foundation::error::{ForgeError, ForgeResult},
    model::TraitValue,
};

/// Normalized discrete distribution over trait values.
#[derive(Clone, Debug, PartialEq)]
pub struct Distribution {
    values: Vec<TraitValue>,
    /// Running sum of probabilities; the last entry is exactly `1.0`.
    cumulative: Vec<f64>,
}

impl Distribution {
    /// Values with non-zero probability, in candidate order.
    pub fn values(&self) -> &[TraitValue] {
        &self.values
    }

    /// Number of values with non-zero probability.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false: empty distributions are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Probability of `value`, `0.0` when not part of the distribution.
    pub fn probability(&self, value: &TraitValue) -> f64 {
        self.values
            .iter()
            .position(|v| v == value)
            .map(|i| {
                let prev = if i == 0 { 0.0 } else { self.cumulative[i - 1] };
                self.cumulative[i] - prev
            })
            .unwrap_or(0.0)
    }

    /// Inverse-CDF lookup for `u` in `[0, 1)`.
    pub fn sample(&self, u: f64) -> &TraitValue {
        let i = self
            .cumulative
            .partition_point(|&c| c <= u)
            .min(self.values.len() - 1);
        &self.values[i]
    }
}

/// Restrict `weights` to `candidates` and renormalize so the result sums to 1.
///
/// Candidates with weight `0.0` (or missing from `weights`) are dropped. Fails when no
/// candidate has a positive weight, or when a weight is negative or not finite.
pub fn distribution<'a>(
    candidates: impl IntoIterator<Item = &'a TraitValue>,
    weights: &BTreeMap<TraitValue, f64>,
) -> ForgeResult<Distribution> {
    let mut values = Vec::new();
    let mut raw = Vec::new();
    for candidate in candidates {
        let w = weights.get(candidate).copied().unwrap_or(0.0);
        if !w.is_finite() || w < 0.0 {
            return Err(ForgeError::generation(format!(
                "invalid weight {w} for value '{candidate}'"
            )));
        }
        if w > 0.0 {
            values.push(candidate.clone());
            raw.push(w);
        }
    }

    let total: f64 = raw.iter().sum();
    if values.is_empty() || total <= 0.0 {
        return Err(ForgeError::generation("no candidate has a positive weight"));
    }

    let mut acc = 0.0;
    let mut cumulative: Vec<f64> = raw
        .iter()
        .map(|w| {
            acc += w / total;
            acc
        })
        .collect();
    if let Some(last) = cumulative.last_mut() {
        *last = 1.0;
    }

    Ok(Distribution { values, cumulative })
}

/// Draw one value from `candidates` according to their renormalized `weights`.
pub fn draw<'a, R: Rng + ?Sized>(
    candidates: impl IntoIterator<Item = &'a TraitValue>,
    weights: &BTreeMap<TraitValue, f64>,
    rng: &mut R,
) -> ForgeResult<TraitValue> {
    let dist = distribution(candidates, weights)?;
    Ok(dist.sample(rng.random::<f64>()).clone())
}

#[cfg(test)]
#[path = "../../tests/unit/generate/sampler.rs"]
mod tests;
