use std::collections::{BTreeSet, HashMap};

use crate::{
    foundation::error::{ForgeError, ForgeResult},
    model::{Layer, Rule, RuleFilter, RuleSide, TraitValue},
};

/// Immutable lookup from trait (layer) name to the rules mentioning it.
///
/// Every rule is stored under both of its trait names. Rules only ever constrain the later of
/// their two layers in declared order: the earlier layer is decided first, and its value either
/// narrows the later layer's candidates ([`RuleIndex::filter_candidates`]) or forces the later
/// layer's value outright ([`RuleIndex::forced_follow_ups`]).
#[derive(Clone, Debug)]
pub struct RuleIndex {
    rules: Vec<Rule>,
    by_trait: HashMap<String, Vec<usize>>,
    declared_index: HashMap<String, usize>,
}

impl RuleIndex {
    /// Index `rules` against `layers`, rejecting rules that cannot be honored.
    ///
    /// Rejected: unknown layer names, rules relating a layer to itself, Equals rules with more
    /// than one value on a side, values that are not live options of their layer, and pairs of
    /// Equals rules that could force one layer to two different values in the same trait set.
    pub fn build(rules: Vec<Rule>, layers: &[Layer]) -> ForgeResult<Self> {
        let declared_index: HashMap<String, usize> = layers
            .iter()
            .map(|l| (l.name.clone(), l.declared_index))
            .collect();

        let by_name: HashMap<&str, &Layer> =
            layers.iter().map(|l| (l.name.as_str(), l)).collect();

        let mut by_trait: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, rule) in rules.iter().enumerate() {
            validate_rule(i, rule, &by_name)?;
            by_trait
                .entry(rule.side_a.trait_name.clone())
                .or_default()
                .push(i);
            by_trait
                .entry(rule.side_b.trait_name.clone())
                .or_default()
                .push(i);
        }

        let index = Self {
            rules,
            by_trait,
            declared_index,
        };
        index.reject_conflicting_equals()?;
        Ok(index)
    }

    /// All indexed rules in configuration order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rules mentioning `trait_name` on either side, in configuration order.
    pub fn rules_for<'a>(
        &'a self,
        trait_name: &str,
    ) -> impl Iterator<Item = &'a Rule> + use<'a> {
        self.by_trait
            .get(trait_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|&i| &self.rules[i])
    }

    /// Whether some rule on `trait_name` has a partner decided earlier in layer order.
    pub fn is_constrained(&self, trait_name: &str) -> bool {
        self.applicable(trait_name).next().is_some()
    }

    /// Candidates for `layer` given the values already decided for earlier layers.
    ///
    /// `decided[i]` holds the value of the layer with declared index `i`, if decided. Starting
    /// from every live option of `layer`: a matching Equals rule collapses the result to that
    /// rule's value for `layer` (the last matching Equals rule wins), and a matching NotEquals
    /// rule removes its values for `layer`. Removals also apply to a collapsed value, so the
    /// result may be empty.
    pub fn filter_candidates(
        &self,
        layer: &Layer,
        decided: &[Option<TraitValue>],
    ) -> Vec<TraitValue> {
        let mut collapsed: Option<&TraitValue> = None;
        let mut removed: BTreeSet<&TraitValue> = BTreeSet::new();

        for (rule, this, partner) in self.applicable(&layer.name) {
            let Some(partner_value) = self
                .declared_index
                .get(&partner.trait_name)
                .and_then(|&i| decided.get(i))
                .and_then(Option::as_ref)
            else {
                continue;
            };
            if !partner.matches(partner_value) {
                continue;
            }
            match rule.filter {
                RuleFilter::Equals => {
                    if let Some(v) = this.only_value() {
                        collapsed = Some(v);
                    }
                }
                RuleFilter::NotEquals => removed.extend(this.values.iter()),
            }
        }

        match collapsed {
            Some(v) if removed.contains(v) => Vec::new(),
            Some(v) => vec![v.clone()],
            None => layer
                .weights
                .keys()
                .filter(|v| !removed.contains(v))
                .cloned()
                .collect(),
        }
    }

    /// Values forced on other layers by choosing `chosen` for `trait_name`.
    ///
    /// Yields `(other_trait_name, forced_value)` for every Equals rule anchored on
    /// `trait_name = chosen`, on either side.
    pub fn forced_follow_ups<'a>(
        &'a self,
        trait_name: &'a str,
        chosen: &'a TraitValue,
    ) -> impl Iterator<Item = (&'a str, &'a TraitValue)> + 'a {
        self.rules_for(trait_name).filter_map(move |rule| {
            if rule.filter != RuleFilter::Equals {
                return None;
            }
            let (this, other) = rule.oriented(trait_name)?;
            if !this.matches(chosen) {
                return None;
            }
            Some((other.trait_name.as_str(), other.only_value()?))
        })
    }

    /// Declared index of `trait_name`.
    pub fn declared_index(&self, trait_name: &str) -> Option<usize> {
        self.declared_index.get(trait_name).copied()
    }

    fn applicable<'a>(
        &'a self,
        trait_name: &'a str,
    ) -> impl Iterator<Item = (&'a Rule, &'a RuleSide, &'a RuleSide)> + 'a {
        let own = self.declared_index(trait_name);
        self.rules_for(trait_name).filter_map(move |rule| {
            let (this, partner) = rule.oriented(trait_name)?;
            let partner_idx = self.declared_index(&partner.trait_name)?;
            (partner_idx < own?).then_some((rule, this, partner))
        })
    }

    fn reject_conflicting_equals(&self) -> ForgeResult<()> {
        // (rule index, anchor side, target side), oriented earlier -> later.
        let forcing: Vec<(usize, &RuleSide, &RuleSide)> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, r)| r.filter == RuleFilter::Equals)
            .filter_map(|(i, r)| {
                let a = self.declared_index(&r.side_a.trait_name)?;
                let b = self.declared_index(&r.side_b.trait_name)?;
                Some(if a < b {
                    (i, &r.side_a, &r.side_b)
                } else {
                    (i, &r.side_b, &r.side_a)
                })
            })
            .collect();

        for (n, (i, anchor_i, target_i)) in forcing.iter().enumerate() {
            for (j, anchor_j, target_j) in &forcing[n + 1..] {
                if target_i.trait_name != target_j.trait_name || target_i.values == target_j.values
                {
                    continue;
                }
                let anchors_co_occur = anchor_i.trait_name != anchor_j.trait_name
                    || anchor_i.values == anchor_j.values;
                if anchors_co_occur {
                    return Err(ForgeError::validation(format!(
                        "equals rules {i} and {j} can force layer '{}' to different values ('{}' and '{}')",
                        target_i.trait_name,
                        display_values(target_i),
                        display_values(target_j),
                    )));
                }
            }
        }
        Ok(())
    }
}

fn validate_rule(i: usize, rule: &Rule, layers: &HashMap<&str, &Layer>) -> ForgeResult<()> {
    if rule.side_a.trait_name == rule.side_b.trait_name {
        return Err(ForgeError::validation(format!(
            "rule {i} relates layer '{}' to itself",
            rule.side_a.trait_name
        )));
    }
    for side in [&rule.side_a, &rule.side_b] {
        let Some(layer) = layers.get(side.trait_name.as_str()) else {
            return Err(ForgeError::validation(format!(
                "rule {i} references unknown layer '{}'",
                side.trait_name
            )));
        };
        if side.values.is_empty() {
            return Err(ForgeError::validation(format!(
                "rule {i} has no value for layer '{}'",
                side.trait_name
            )));
        }
        if rule.filter == RuleFilter::Equals && side.values.len() != 1 {
            return Err(ForgeError::validation(format!(
                "rule {i}: equals rules take a single value for layer '{}'",
                side.trait_name
            )));
        }
        if let Some(bad) = side.values.iter().find(|v| !layer.has_option(v)) {
            return Err(ForgeError::validation(format!(
                "rule {i} references value '{bad}' which is not available in layer '{}'",
                side.trait_name
            )));
        }
    }
    Ok(())
}

fn display_values(side: &RuleSide) -> String {
    side.values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[path = "../../tests/unit/rules/index.rs"]
mod tests;
