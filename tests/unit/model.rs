use super::*;

fn c(s: &str) -> TraitValue {
    TraitValue::concrete(s)
}

#[test]
fn absent_sorts_after_concrete_values() {
    let mut values = vec![TraitValue::Absent, c("b"), c("a")];
    values.sort();
    assert_eq!(values, vec![c("a"), c("b"), TraitValue::Absent]);
}

#[test]
fn absent_is_distinct_from_a_stem_spelled_none() {
    let stem = c(ABSENT_SPELLING);
    assert_ne!(stem, TraitValue::Absent);
    assert_eq!(stem.to_string(), TraitValue::Absent.to_string());
    assert_eq!(TraitValue::Absent.table_cell(), "");
    assert_eq!(stem.table_cell(), "None");

    let a = TraitSet::new(vec![stem]);
    let b = TraitSet::new(vec![TraitValue::Absent]);
    assert_ne!(a, b);
    let distinct: HashSet<_> = [a, b].into_iter().collect();
    assert_eq!(distinct.len(), 2);
}

#[test]
fn rule_orientation_follows_trait_name() {
    let rule = Rule {
        filter: RuleFilter::Equals,
        side_a: RuleSide::single("hat", c("crown")),
        side_b: RuleSide::single("background", c("gold")),
    };
    let (this, other) = rule.oriented("background").unwrap();
    assert_eq!(this.trait_name, "background");
    assert_eq!(other.trait_name, "hat");
    assert!(rule.oriented("eyes").is_none());
}

#[test]
fn rule_side_set_membership() {
    let side = RuleSide::set("eyes", [c("red"), c("blue")]);
    assert!(side.matches(&c("blue")));
    assert!(!side.matches(&c("green")));
    assert!(side.only_value().is_none());
}

#[test]
fn layer_selectable_skips_zero_weights() {
    let layer = Layer {
        name: "hat".to_string(),
        declared_index: 1,
        required: false,
        weights: [(c("cap"), 0.0), (c("crown"), 60.0), (TraitValue::Absent, 40.0)]
            .into_iter()
            .collect(),
    };
    let picks: Vec<_> = layer.selectable().cloned().collect();
    assert_eq!(picks, vec![c("crown"), TraitValue::Absent]);
    assert!(layer.has_option(&c("cap")));
    assert_eq!(layer.weight(&c("missing")), 0.0);
}

#[test]
fn collection_from_sets_rejects_duplicates_and_bad_width() {
    let names = vec!["bg".to_string(), "hat".to_string()];
    let dup = Collection::from_sets(
        names.clone(),
        vec![
            TraitSet::new(vec![c("red"), c("cap")]),
            TraitSet::new(vec![c("red"), c("cap")]),
        ],
    );
    assert!(dup.is_err());

    let narrow = Collection::from_sets(names.clone(), vec![TraitSet::new(vec![c("red")])]);
    assert!(narrow.is_err());

    let ok = Collection::from_sets(names, vec![TraitSet::new(vec![c("red"), c("cap")])]).unwrap();
    assert_eq!(ok.len(), 1);
    assert_eq!(ok.layer_names()[1], "hat");
}
