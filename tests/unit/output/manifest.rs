use std::path::PathBuf;

use super::*;
use crate::{assets::catalog::AssetCatalog, config::load::parse_yaml};

fn blueprint() -> Blueprint {
    let cfg = parse_yaml(
        "collection: { name: apes, count: 2, filetype: png }\n\
         assets:\n  path: ./assets\n  layers:\n    - { name: bg, required: true }\n    - { name: hat }\n",
    )
    .unwrap();
    let catalog = AssetCatalog::from_listings(
        "/assets",
        vec![
            (
                "bg",
                vec![
                    ("gold".to_string(), PathBuf::from("/assets/bg/gold.png")),
                    ("blue".to_string(), PathBuf::from("/assets/bg/blue.png")),
                ],
            ),
            (
                "hat",
                vec![("crown".to_string(), PathBuf::from("/assets/hat/crown.png"))],
            ),
        ],
    );
    Blueprint::with_catalog(&cfg, catalog).unwrap()
}

fn collection() -> Collection {
    Collection::from_sets(
        vec!["bg".to_string(), "hat".to_string()],
        vec![
            TraitSet::new(vec![
                TraitValue::concrete("gold"),
                TraitValue::concrete("crown"),
            ]),
            TraitSet::new(vec![TraitValue::concrete("blue"), TraitValue::Absent]),
        ],
    )
    .unwrap()
}

#[test]
fn from_collection_writes_empty_cell_for_absent() {
    let table = TraitTable::from_collection(&collection(), FileType::Png);
    assert_eq!(table.columns, vec!["bg", "hat"]);
    assert_eq!(table.rows[0].filename, "0.png");
    assert_eq!(table.rows[0].values, vec!["gold", "crown"]);
    assert_eq!(table.rows[1].filename, "1.png");
    assert_eq!(table.rows[1].values, vec!["blue", ""]);
}

#[test]
fn to_collection_restores_absent_on_optional_layers() {
    let bp = blueprint();
    let table = TraitTable::from_collection(&collection(), FileType::Png);
    assert_eq!(table.to_collection(&bp).unwrap(), collection());
}

#[test]
fn to_collection_rejects_mismatched_columns_and_unknown_values() {
    let bp = blueprint();

    let mut table = TraitTable::from_collection(&collection(), FileType::Png);
    table.columns.reverse();
    assert!(matches!(
        table.to_collection(&bp),
        Err(ForgeError::Validation(_))
    ));

    let mut table = TraitTable::from_collection(&collection(), FileType::Png);
    table.rows[0].values[0] = "silver".to_string();
    let err = table.to_collection(&bp).unwrap_err();
    assert!(err.to_string().contains("'silver'"));

    let mut table = TraitTable::from_collection(&collection(), FileType::Png);
    table.rows[0].values[0] = String::new();
    assert!(table.to_collection(&bp).is_err());

    let mut table = TraitTable::from_collection(&collection(), FileType::Png);
    table.rows[1] = table.rows[0].clone();
    let err = table.to_collection(&bp).unwrap_err();
    assert!(err.to_string().contains("duplicates"));
}

#[test]
fn write_then_read_preserves_table() {
    let path = std::env::temp_dir().join(format!(
        "layerforge_manifest_{}_{}/metadata/metadata.json",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    let table = TraitTable::from_collection(&collection(), FileType::Jpeg);
    table.write(&path).unwrap();
    assert_eq!(TraitTable::read(&path).unwrap(), table);

    if let Some(dir) = path.parent().and_then(Path::parent) {
        let _ = std::fs::remove_dir_all(dir);
    }
}

#[test]
fn read_reports_malformed_json_as_serde_error() {
    let path = std::env::temp_dir().join(format!(
        "layerforge_manifest_bad_{}.json",
        std::process::id()
    ));
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(TraitTable::read(&path), Err(ForgeError::Serde(_))));
    let _ = std::fs::remove_file(path);
}
