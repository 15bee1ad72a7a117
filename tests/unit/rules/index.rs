use super::*;

fn c(s: &str) -> TraitValue {
    TraitValue::concrete(s)
}

fn layer(name: &str, declared_index: usize, options: &[&str]) -> Layer {
    Layer {
        name: name.to_string(),
        declared_index,
        required: true,
        weights: options.iter().map(|o| (c(o), 1.0)).collect(),
    }
}

fn layers() -> Vec<Layer> {
    vec![
        layer("background", 0, &["gold", "silver", "blue"]),
        layer("body", 1, &["robot", "alien"]),
        layer("hat", 2, &["crown", "cap", "halo"]),
    ]
}

fn equals(a: (&str, &str), b: (&str, &str)) -> Rule {
    Rule {
        filter: RuleFilter::Equals,
        side_a: RuleSide::single(a.0, c(a.1)),
        side_b: RuleSide::single(b.0, c(b.1)),
    }
}

fn not_equals(a: (&str, &[&str]), b: (&str, &[&str])) -> Rule {
    Rule {
        filter: RuleFilter::NotEquals,
        side_a: RuleSide::set(a.0, a.1.iter().map(|v| c(v))),
        side_b: RuleSide::set(b.0, b.1.iter().map(|v| c(v))),
    }
}

#[test]
fn rules_are_indexed_under_both_trait_names() {
    let index = RuleIndex::build(
        vec![equals(("hat", "crown"), ("background", "gold"))],
        &layers(),
    )
    .unwrap();
    assert_eq!(index.rules_for("hat").count(), 1);
    assert_eq!(index.rules_for("background").count(), 1);
    assert_eq!(index.rules_for("body").count(), 0);
}

#[test]
fn only_the_later_layer_is_constrained() {
    let index = RuleIndex::build(
        vec![equals(("hat", "crown"), ("background", "gold"))],
        &layers(),
    )
    .unwrap();
    assert!(index.is_constrained("hat"));
    assert!(!index.is_constrained("background"));
    assert!(!index.is_constrained("body"));
}

#[test]
fn equals_collapses_candidates_when_partner_matches() {
    let all = layers();
    let index = RuleIndex::build(
        vec![equals(("background", "gold"), ("hat", "crown"))],
        &all,
    )
    .unwrap();

    let decided = vec![Some(c("gold")), Some(c("robot")), None];
    assert_eq!(index.filter_candidates(&all[2], &decided), vec![c("crown")]);

    let decided = vec![Some(c("silver")), Some(c("robot")), None];
    assert_eq!(index.filter_candidates(&all[2], &decided).len(), 3);
}

#[test]
fn not_equals_removes_values_for_partner_set_membership() {
    let all = layers();
    let index = RuleIndex::build(
        vec![not_equals(("background", &["gold", "silver"]), ("hat", &["halo"]))],
        &all,
    )
    .unwrap();

    let decided = vec![Some(c("silver")), Some(c("alien")), None];
    assert_eq!(
        index.filter_candidates(&all[2], &decided),
        vec![c("cap"), c("crown")]
    );

    let decided = vec![Some(c("blue")), Some(c("alien")), None];
    assert_eq!(index.filter_candidates(&all[2], &decided).len(), 3);
}

#[test]
fn not_equals_can_veto_a_collapsed_value() {
    let all = layers();
    let index = RuleIndex::build(
        vec![
            equals(("background", "gold"), ("hat", "crown")),
            not_equals(("body", &["robot"]), ("hat", &["crown"])),
        ],
        &all,
    )
    .unwrap();
    let decided = vec![Some(c("gold")), Some(c("robot")), None];
    assert!(index.filter_candidates(&all[2], &decided).is_empty());
}

#[test]
fn forced_follow_ups_fire_from_either_side() {
    let index = RuleIndex::build(
        vec![
            equals(("hat", "halo"), ("background", "blue")),
            not_equals(("background", &["blue"]), ("body", &["robot"])),
        ],
        &layers(),
    )
    .unwrap();

    let blue = c("blue");
    let forced: Vec<_> = index.forced_follow_ups("background", &blue).collect();
    assert_eq!(forced, vec![("hat", &c("halo"))]);

    let halo = c("halo");
    let forced: Vec<_> = index.forced_follow_ups("hat", &halo).collect();
    assert_eq!(forced, vec![("background", &c("blue"))]);

    let gold = c("gold");
    assert_eq!(index.forced_follow_ups("background", &gold).count(), 0);
}

#[test]
fn build_rejects_unknown_layers_and_values() {
    let err = RuleIndex::build(vec![equals(("eyes", "red"), ("hat", "cap"))], &layers())
        .unwrap_err();
    assert!(err.to_string().contains("unknown layer 'eyes'"));

    let err = RuleIndex::build(vec![equals(("hat", "beanie"), ("body", "robot"))], &layers())
        .unwrap_err();
    assert!(err.to_string().contains("'beanie'"));
}

#[test]
fn build_rejects_self_reference_and_multi_value_equals() {
    let err = RuleIndex::build(vec![equals(("hat", "cap"), ("hat", "crown"))], &layers())
        .unwrap_err();
    assert!(err.to_string().contains("itself"));

    let multi = Rule {
        filter: RuleFilter::Equals,
        side_a: RuleSide::set("hat", [c("cap"), c("crown")]),
        side_b: RuleSide::single("body", c("robot")),
    };
    assert!(RuleIndex::build(vec![multi], &layers()).is_err());
}

#[test]
fn build_rejects_equals_rules_that_can_conflict() {
    // Different anchor layers can both match in one trait set.
    let err = RuleIndex::build(
        vec![
            equals(("background", "gold"), ("hat", "crown")),
            equals(("body", "robot"), ("hat", "cap")),
        ],
        &layers(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("layer 'hat'"));
}

#[test]
fn build_accepts_mutually_exclusive_equals_anchors() {
    let index = RuleIndex::build(
        vec![
            equals(("background", "gold"), ("hat", "crown")),
            equals(("background", "silver"), ("hat", "cap")),
        ],
        &layers(),
    );
    assert!(index.is_ok());
}
