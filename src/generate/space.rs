use std::collections::BTreeSet;

use crate::{
    generate::engine::{CompositionEngine, Partial, Step},
    model::{RuleFilter, TraitSet, TraitValue},
};

const MIN_REJECTION_BUDGET: u64 = 10_000;
const MAX_REJECTION_BUDGET: u64 = 50_000_000;
const REJECTIONS_PER_COMBINATION: u64 = 64;

/// Saturating product of the number of values each layer can ever take.
///
/// A layer can take any positively weighted value, plus any value an Equals rule can force on it
/// regardless of weight.
pub fn upper_bound(engine: &CompositionEngine<'_>) -> u64 {
    let rules = engine.rules();
    engine.layers().iter().fold(1u64, |acc, layer| {
        let mut options: BTreeSet<&TraitValue> = layer.selectable().collect();
        for rule in rules.rules_for(&layer.name) {
            if rule.filter != RuleFilter::Equals {
                continue;
            }
            if let Some((this, _)) = rule.oriented(&layer.name) {
                options.extend(this.values.iter());
            }
        }
        acc.saturating_mul(options.len() as u64)
    })
}

/// Count every distinct trait set the engine can produce, or `None` if there are more than
/// `limit`.
///
/// Walks the same per-layer decisions as [`CompositionEngine::assemble`], branching on every
/// value a draw could return. Drawn values are never overwritten afterwards, so distinct leaves
/// are distinct trait sets.
pub fn count_reachable(engine: &CompositionEngine<'_>, limit: u64) -> Option<u64> {
    let mut total = 0u64;
    let partial = Partial::new(engine.layers().len());
    let complete = walk(engine, partial, 0, 1.0, &mut |_, _| {
        total += 1;
        total <= limit
    });
    complete.then_some(total)
}

/// Every trait set the engine can produce, paired with the probability that a single
/// [`CompositionEngine::assemble`] call yields it, or `None` past `limit` sets.
pub fn reachable_sets(
    engine: &CompositionEngine<'_>,
    limit: u64,
) -> Option<Vec<(TraitSet, f64)>> {
    let mut sets = Vec::new();
    let partial = Partial::new(engine.layers().len());
    let complete = walk(engine, partial, 0, 1.0, &mut |leaf, p| {
        if sets.len() as u64 >= limit {
            return false;
        }
        if let Some(set) = leaf.clone().finish() {
            sets.push((set, p));
        }
        true
    });
    complete.then_some(sets)
}

/// Consecutive-rejection budget used when none is configured.
pub fn default_rejection_budget(upper_bound: u64) -> u64 {
    upper_bound
        .saturating_mul(REJECTIONS_PER_COMBINATION)
        .clamp(MIN_REJECTION_BUDGET, MAX_REJECTION_BUDGET)
}

/// Depth-first walk over candidate decisions; `leaf` returns `false` to stop.
fn walk<F>(
    engine: &CompositionEngine<'_>,
    mut partial: Partial,
    i: usize,
    p: f64,
    leaf: &mut F,
) -> bool
where
    F: FnMut(&Partial, f64) -> bool,
{
    if i == engine.layers().len() {
        return leaf(&partial, p);
    }
    match engine.step(i, &partial) {
        Step::DeadEnd => true,
        Step::Forced(v) => {
            engine.settle(i, v, &mut partial);
            walk(engine, partial, i + 1, p, leaf)
        }
        Step::Draw(dist) => {
            for v in dist.values() {
                let mut branch = partial.clone();
                engine.settle(i, v.clone(), &mut branch);
                if !walk(engine, branch, i + 1, p * dist.probability(v), leaf) {
                    return false;
                }
            }
            true
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/generate/space.rs"]
mod tests;
