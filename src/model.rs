use std::collections::{BTreeMap, HashSet};

use smallvec::SmallVec;

use crate::foundation::error::{ForgeError, ForgeResult};

/// Spelling of [`TraitValue::Absent`] in configuration files and for display.
pub const ABSENT_SPELLING: &str = "None";

/// One option within a layer: a concrete asset stem, or nothing at all for an optional layer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TraitValue {
    /// Asset file stem resolved from the catalog.
    Concrete(String),
    /// The optional layer contributes nothing to the image.
    Absent,
}

impl TraitValue {
    /// Build a [`TraitValue::Concrete`] value.
    pub fn concrete(stem: impl Into<String>) -> Self {
        Self::Concrete(stem.into())
    }

    /// Whether this is the [`TraitValue::Absent`] marker.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Concrete stem, if any.
    pub fn as_concrete(&self) -> Option<&str> {
        match self {
            Self::Concrete(s) => Some(s),
            Self::Absent => None,
        }
    }

    /// Cell text for tabular output: the stem, or the empty string for [`TraitValue::Absent`].
    pub fn table_cell(&self) -> &str {
        self.as_concrete().unwrap_or("")
    }
}

impl std::fmt::Display for TraitValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Concrete(s) => f.write_str(s),
            Self::Absent => f.write_str(ABSENT_SPELLING),
        }
    }
}

/// A validated layer with its full weight table.
///
/// `weights` holds every live option of the layer (plus [`TraitValue::Absent`] for optional
/// layers). Options the configuration did not weight are present with weight `0.0`.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    /// Layer (and asset directory) name.
    pub name: String,
    /// Position in the configured stacking order; 0 is the background.
    pub declared_index: usize,
    /// Whether the layer must always contribute a concrete value.
    pub required: bool,
    /// Selection weight per option.
    pub weights: BTreeMap<TraitValue, f64>,
}

impl Layer {
    /// Weight of `value`, `0.0` when unknown.
    pub fn weight(&self, value: &TraitValue) -> f64 {
        self.weights.get(value).copied().unwrap_or(0.0)
    }

    /// Options with a strictly positive weight, in catalog order.
    pub fn selectable(&self) -> impl Iterator<Item = &TraitValue> {
        self.weights
            .iter()
            .filter(|(_, w)| **w > 0.0)
            .map(|(v, _)| v)
    }

    /// Whether `value` is a live option of this layer.
    pub fn has_option(&self, value: &TraitValue) -> bool {
        self.weights.contains_key(value)
    }
}

/// Kind of compatibility constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuleFilter {
    /// Choosing the anchor value forces the partner value.
    Equals,
    /// The two sides never co-occur.
    NotEquals,
}

/// One side of a [`Rule`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleSide {
    /// Layer name this side refers to.
    pub trait_name: String,
    /// Values on this side. Exactly one for [`RuleFilter::Equals`].
    pub values: SmallVec<[TraitValue; 1]>,
}

impl RuleSide {
    /// Build a side holding a single value.
    pub fn single(trait_name: impl Into<String>, value: TraitValue) -> Self {
        let mut values = SmallVec::new();
        values.push(value);
        Self {
            trait_name: trait_name.into(),
            values,
        }
    }

    /// Build a side holding a set of values.
    pub fn set(
        trait_name: impl Into<String>,
        values: impl IntoIterator<Item = TraitValue>,
    ) -> Self {
        Self {
            trait_name: trait_name.into(),
            values: values.into_iter().collect(),
        }
    }

    /// The only value on this side, if it holds exactly one.
    pub fn only_value(&self) -> Option<&TraitValue> {
        match self.values.as_slice() {
            [v] => Some(v),
            _ => None,
        }
    }

    /// Whether `value` matches this side (equality, or membership for sets).
    pub fn matches(&self, value: &TraitValue) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

/// A compatibility rule linking two layers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    /// Constraint kind.
    pub filter: RuleFilter,
    /// First side (`trait_1` in configuration).
    pub side_a: RuleSide,
    /// Second side (`trait_2` in configuration).
    pub side_b: RuleSide,
}

impl Rule {
    /// Orient the rule around `trait_name`: returns `(this_side, partner_side)`.
    pub fn oriented(&self, trait_name: &str) -> Option<(&RuleSide, &RuleSide)> {
        if self.side_a.trait_name == trait_name {
            Some((&self.side_a, &self.side_b))
        } else if self.side_b.trait_name == trait_name {
            Some((&self.side_b, &self.side_a))
        } else {
            None
        }
    }
}

/// One full assignment of a value to every layer, ordered by declared index.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TraitSet {
    values: Vec<TraitValue>,
}

impl TraitSet {
    /// Wrap values already ordered by declared layer index.
    pub fn new(values: Vec<TraitValue>) -> Self {
        Self { values }
    }

    /// Chosen values in layer order.
    pub fn values(&self) -> &[TraitValue] {
        &self.values
    }

    /// Value chosen for the layer at `declared_index`.
    pub fn get(&self, declared_index: usize) -> Option<&TraitValue> {
        self.values.get(declared_index)
    }

    /// Number of layers covered.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the set covers no layers.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Ordered sequence of pairwise-distinct trait sets.
#[derive(Clone, Debug, PartialEq)]
pub struct Collection {
    layer_names: Vec<String>,
    sets: Vec<TraitSet>,
}

impl Collection {
    pub(crate) fn empty(layer_names: Vec<String>) -> Self {
        Self {
            layer_names,
            sets: Vec::new(),
        }
    }

    /// Build a collection from existing trait sets, checking width and distinctness.
    pub fn from_sets(layer_names: Vec<String>, sets: Vec<TraitSet>) -> ForgeResult<Self> {
        let mut seen = HashSet::with_capacity(sets.len());
        for (i, set) in sets.iter().enumerate() {
            if set.len() != layer_names.len() {
                return Err(ForgeError::validation(format!(
                    "trait set {i} has {} values, expected {}",
                    set.len(),
                    layer_names.len()
                )));
            }
            if !seen.insert(set) {
                return Err(ForgeError::validation(format!(
                    "trait set {i} duplicates an earlier trait set"
                )));
            }
        }
        Ok(Self { layer_names, sets })
    }

    pub(crate) fn push(&mut self, set: TraitSet) {
        self.sets.push(set);
    }

    pub(crate) fn sets_slice(&self) -> &[TraitSet] {
        &self.sets
    }

    /// Layer names in declared order (the table columns).
    pub fn layer_names(&self) -> &[String] {
        &self.layer_names
    }

    /// Trait set at collection position `index`.
    pub fn get(&self, index: usize) -> Option<&TraitSet> {
        self.sets.get(index)
    }

    /// Iterate trait sets in acceptance order.
    pub fn iter(&self) -> std::slice::Iter<'_, TraitSet> {
        self.sets.iter()
    }

    /// Number of accepted trait sets.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether no trait set has been accepted.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a TraitSet;
    type IntoIter = std::slice::Iter<'a, TraitSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.sets.iter()
    }
}

#[cfg(test)]
#[path = "../tests/unit/model.rs"]
mod tests;
