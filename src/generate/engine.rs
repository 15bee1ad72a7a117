use std::{borrow::Cow, collections::HashSet};

use rand::Rng;

use crate::{
    foundation::error::{ForgeError, ForgeResult},
    generate::{
        sampler::{Distribution, distribution},
        space,
    },
    model::{Collection, Layer, TraitSet, TraitValue},
    rules::index::RuleIndex,
};

/// Options for [`CompositionEngine::generate`].
#[derive(Clone, Debug)]
pub struct GenerateOpts {
    /// Number of distinct trait sets to produce.
    pub count: usize,
    /// Give up after this many rejected candidates in a row.
    ///
    /// `None` derives a budget from the combination-space upper bound.
    pub max_consecutive_rejections: Option<u64>,
    /// Enumerate the reachable space exactly when its upper bound is at most this size.
    pub enumeration_limit: u64,
}

impl GenerateOpts {
    /// Default options for `count` trait sets.
    pub fn new(count: usize) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }
}

impl Default for GenerateOpts {
    fn default() -> Self {
        Self {
            count: 1,
            max_consecutive_rejections: None,
            enumeration_limit: 1_000_000,
        }
    }
}

/// Counters describing one generation run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenerationStats {
    /// Candidates assembled, including rejected ones.
    pub attempts: u64,
    /// Candidates rejected as repeats of an accepted trait set.
    pub duplicates: u64,
    /// Candidates abandoned because a layer had no admissible value.
    pub dead_ends: u64,
    /// Product of per-layer option counts (saturating).
    pub space_upper_bound: u64,
    /// Exact number of reachable trait sets, when enumerated.
    pub reachable: Option<u64>,
}

/// Result of [`CompositionEngine::generate`].
#[derive(Clone, Debug)]
pub struct Generated {
    /// Accepted, pairwise-distinct trait sets.
    pub collection: Collection,
    /// Run counters.
    pub stats: GenerationStats,
}

/// Outcome of assembling a single candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Assembly {
    /// Every layer received a value.
    Complete(TraitSet),
    /// `layer` had no admissible value given earlier choices.
    DeadEnd {
        /// Name of the layer that could not be filled.
        layer: String,
    },
}

/// In-progress candidate: values decided so far, plus values forced onto later layers.
#[derive(Clone, Debug)]
pub(crate) struct Partial {
    pub(crate) decided: Vec<Option<TraitValue>>,
    pub(crate) pending: Vec<Option<TraitValue>>,
}

impl Partial {
    pub(crate) fn new(layers: usize) -> Self {
        Self {
            decided: vec![None; layers],
            pending: vec![None; layers],
        }
    }

    pub(crate) fn finish(self) -> Option<TraitSet> {
        self.decided
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .map(TraitSet::new)
    }
}

/// How the next layer gets its value.
#[derive(Clone, Debug)]
pub(crate) enum Step<'e> {
    Forced(TraitValue),
    Draw(Cow<'e, Distribution>),
    DeadEnd,
}

/// Layer-by-layer trait-set assembly driven by weights and compatibility rules.
///
/// Per candidate the engine walks layers in declared order. A layer holding a value forced by an
/// earlier Equals rule takes it as is; a layer with rules anchored on earlier layers draws from
/// the filtered, renormalized candidates; any other layer draws from its full weight table. Each
/// settled value immediately forces the partners of its Equals rules on layers not yet visited.
/// Complete candidates whose ordered value tuple was already accepted are discarded whole.
#[derive(Clone, Debug)]
pub struct CompositionEngine<'a> {
    layers: &'a [Layer],
    rules: &'a RuleIndex,
    base: Vec<Distribution>,
}

impl<'a> CompositionEngine<'a> {
    /// Prepare an engine over `layers` (ordered by declared index) and their rule index.
    pub fn new(layers: &'a [Layer], rules: &'a RuleIndex) -> ForgeResult<Self> {
        let mut base = Vec::with_capacity(layers.len());
        for (i, layer) in layers.iter().enumerate() {
            if layer.declared_index != i {
                return Err(ForgeError::validation(format!(
                    "layer '{}' has declared index {} but sits at position {i}",
                    layer.name, layer.declared_index
                )));
            }
            let dist = distribution(layer.weights.keys(), &layer.weights).map_err(|_| {
                ForgeError::validation(format!(
                    "layer '{}' has no value with a positive weight",
                    layer.name
                ))
            })?;
            base.push(dist);
        }
        Ok(Self {
            layers,
            rules,
            base,
        })
    }

    /// Layers in declared order.
    pub fn layers(&self) -> &'a [Layer] {
        self.layers
    }

    /// The rule index driving candidate filtering and forcing.
    pub fn rules(&self) -> &'a RuleIndex {
        self.rules
    }

    /// Assemble one candidate trait set.
    pub fn assemble<R: Rng + ?Sized>(&self, rng: &mut R) -> ForgeResult<Assembly> {
        let mut partial = Partial::new(self.layers.len());
        for (i, layer) in self.layers.iter().enumerate() {
            let value = match self.step(i, &partial) {
                Step::Forced(v) => v,
                Step::Draw(dist) => dist.sample(rng.random::<f64>()).clone(),
                Step::DeadEnd => {
                    return Ok(Assembly::DeadEnd {
                        layer: layer.name.clone(),
                    });
                }
            };
            self.settle(i, value, &mut partial);
        }
        partial
            .finish()
            .map(Assembly::Complete)
            .ok_or_else(|| ForgeError::generation("candidate left a layer without a value"))
    }

    /// Generate `opts.count` distinct trait sets.
    ///
    /// Fails with [`ForgeError::Exhausted`] when the reachable space is provably too small, or
    /// when the rejection budget runs out before enough distinct trait sets were found. When the
    /// reachable space was enumerated and is large enough, running out of budget instead fills
    /// the remainder from the unseen trait sets, each weighted by its assembly probability.
    #[tracing::instrument(skip(self, opts, rng), fields(count = opts.count))]
    pub fn generate<R: Rng + ?Sized>(
        &self,
        opts: &GenerateOpts,
        rng: &mut R,
    ) -> ForgeResult<Generated> {
        if opts.count == 0 {
            return Err(ForgeError::validation("requested count must be >= 1"));
        }
        let requested = opts.count as u64;

        let mut stats = GenerationStats {
            space_upper_bound: space::upper_bound(self),
            ..GenerationStats::default()
        };
        if requested > stats.space_upper_bound {
            return Err(ForgeError::Exhausted {
                requested,
                accepted: 0,
                reachable: None,
            });
        }
        if stats.space_upper_bound <= opts.enumeration_limit {
            stats.reachable = space::count_reachable(self, opts.enumeration_limit);
            if let Some(reachable) = stats.reachable
                && requested > reachable
            {
                return Err(ForgeError::Exhausted {
                    requested,
                    accepted: 0,
                    reachable: Some(reachable),
                });
            }
        }

        let budget = opts
            .max_consecutive_rejections
            .unwrap_or_else(|| space::default_rejection_budget(stats.space_upper_bound));
        tracing::debug!(
            upper_bound = stats.space_upper_bound,
            reachable = ?stats.reachable,
            budget,
            "combination space bounded"
        );

        let names = self.layers.iter().map(|l| l.name.clone()).collect();
        let mut collection = Collection::empty(names);
        let mut accepted: HashSet<TraitSet> = HashSet::with_capacity(opts.count);
        let mut consecutive = 0u64;

        while (collection.len() as u64) < requested {
            if consecutive >= budget {
                if stats.reachable.is_some() {
                    self.fill_from_space(opts, &mut accepted, &mut collection, rng)?;
                    break;
                }
                return Err(ForgeError::Exhausted {
                    requested,
                    accepted: collection.len() as u64,
                    reachable: None,
                });
            }
            stats.attempts += 1;

            let set = match self.assemble(rng)? {
                Assembly::Complete(set) => set,
                Assembly::DeadEnd { layer } => {
                    tracing::trace!(layer = layer.as_str(), "dead end, discarding candidate");
                    stats.dead_ends += 1;
                    consecutive += 1;
                    continue;
                }
            };

            if accepted.contains(&set) {
                tracing::trace!("duplicate candidate rejected");
                stats.duplicates += 1;
                consecutive += 1;
                continue;
            }

            accepted.insert(set.clone());
            collection.push(set);
            consecutive = 0;
        }

        tracing::info!(
            accepted = collection.len(),
            attempts = stats.attempts,
            duplicates = stats.duplicates,
            dead_ends = stats.dead_ends,
            "generated trait sets"
        );
        Ok(Generated { collection, stats })
    }

    /// Complete `collection` from the enumerated space, sampling unseen trait sets without
    /// replacement in proportion to their assembly probability.
    fn fill_from_space<R: Rng + ?Sized>(
        &self,
        opts: &GenerateOpts,
        accepted: &mut HashSet<TraitSet>,
        collection: &mut Collection,
        rng: &mut R,
    ) -> ForgeResult<()> {
        let requested = opts.count as u64;
        let missing = opts.count - collection.len();
        let mut keyed: Vec<(f64, TraitSet)> = space::reachable_sets(self, opts.enumeration_limit)
            .unwrap_or_default()
            .into_iter()
            .filter(|(set, p)| *p > 0.0 && !accepted.contains(set))
            .map(|(set, p)| ((1.0 - rng.random::<f64>()).ln() / p, set))
            .collect();
        if keyed.len() < missing {
            return Err(ForgeError::Exhausted {
                requested,
                accepted: collection.len() as u64,
                reachable: Some((accepted.len() + keyed.len()) as u64),
            });
        }
        tracing::debug!(
            missing,
            unseen = keyed.len(),
            "rejection budget spent, filling from enumerated space"
        );

        keyed.sort_by(|a, b| b.0.total_cmp(&a.0));
        for (_, set) in keyed.into_iter().take(missing) {
            accepted.insert(set.clone());
            collection.push(set);
        }
        Ok(())
    }

    pub(crate) fn step(&self, i: usize, partial: &Partial) -> Step<'_> {
        let layer = &self.layers[i];
        let constrained = self.rules.is_constrained(&layer.name);

        if let Some(forced) = &partial.pending[i] {
            if constrained
                && !self
                    .rules
                    .filter_candidates(layer, &partial.decided)
                    .contains(forced)
            {
                return Step::DeadEnd;
            }
            return Step::Forced(forced.clone());
        }

        if !constrained {
            return Step::Draw(Cow::Borrowed(&self.base[i]));
        }
        let candidates = self.rules.filter_candidates(layer, &partial.decided);
        match distribution(candidates.iter(), &layer.weights) {
            Ok(dist) => Step::Draw(Cow::Owned(dist)),
            Err(_) => Step::DeadEnd,
        }
    }

    pub(crate) fn settle(&self, i: usize, value: TraitValue, partial: &mut Partial) {
        let name = &self.layers[i].name;
        for (other, forced) in self.rules.forced_follow_ups(name, &value) {
            match self.rules.declared_index(other) {
                Some(j) if j > i => partial.pending[j] = Some(forced.clone()),
                _ => tracing::trace!(
                    layer = name.as_str(),
                    forced_layer = other,
                    "follow-up targets an already decided layer, ignored"
                ),
            }
        }
        partial.decided[i] = Some(value);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/generate/engine.rs"]
mod tests;
