use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    config::{model::FileType, validate::Blueprint},
    foundation::error::{ForgeError, ForgeResult},
    model::{Collection, TraitSet, TraitValue},
    output::layout::OutputLayout,
};

/// Tabular record of a collection: one column per layer, one row per trait set.
///
/// Absent values are written as the empty string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraitTable {
    /// Layer names in declared order.
    pub columns: Vec<String>,
    /// Rows in collection order.
    pub rows: Vec<TraitRow>,
}

/// One trait set in a [`TraitTable`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraitRow {
    /// Output image file name, e.g. `3.png`.
    pub filename: String,
    /// One cell per column.
    pub values: Vec<String>,
}

impl TraitTable {
    /// Tabulate `collection`, naming rows after their output images.
    pub fn from_collection(collection: &Collection, filetype: FileType) -> Self {
        let rows = collection
            .iter()
            .enumerate()
            .map(|(i, set)| TraitRow {
                filename: OutputLayout::image_file_name(i, filetype),
                values: set
                    .values()
                    .iter()
                    .map(|v| v.table_cell().to_string())
                    .collect(),
            })
            .collect();
        Self {
            columns: collection.layer_names().to_vec(),
            rows,
        }
    }

    /// Rebuild a collection, checking every cell against `blueprint`'s layers.
    pub fn to_collection(&self, blueprint: &Blueprint) -> ForgeResult<Collection> {
        let layer_names = blueprint.layer_names();
        if self.columns != layer_names {
            return Err(ForgeError::validation(format!(
                "manifest columns {:?} do not match configured layers {:?}",
                self.columns, layer_names
            )));
        }

        let mut sets = Vec::with_capacity(self.rows.len());
        for (r, row) in self.rows.iter().enumerate() {
            if row.values.len() != blueprint.layers.len() {
                return Err(ForgeError::validation(format!(
                    "manifest row {r} ('{}') has {} values, expected {}",
                    row.filename,
                    row.values.len(),
                    blueprint.layers.len()
                )));
            }
            let values = blueprint
                .layers
                .iter()
                .zip(&row.values)
                .map(|(layer, cell)| {
                    let value = if cell.is_empty() {
                        TraitValue::Absent
                    } else {
                        TraitValue::concrete(cell.as_str())
                    };
                    if layer.has_option(&value) {
                        Ok(value)
                    } else {
                        Err(ForgeError::validation(format!(
                            "manifest row {r} has value '{cell}' for layer '{}', which is not one of its options",
                            layer.name
                        )))
                    }
                })
                .collect::<ForgeResult<Vec<_>>>()?;
            sets.push(TraitSet::new(values));
        }
        Collection::from_sets(layer_names, sets)
    }

    /// Write the table as pretty JSON, creating parent directories.
    pub fn write(&self, path: &Path) -> ForgeResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create manifest dir '{}'", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ForgeError::serde(format!("encode manifest: {e}")))?;
        std::fs::write(path, json)
            .with_context(|| format!("write manifest '{}'", path.display()))?;
        Ok(())
    }

    /// Read a table previously written with [`TraitTable::write`].
    pub fn read(path: &Path) -> ForgeResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read manifest '{}'", path.display()))?;
        serde_json::from_str(&text)
            .map_err(|e| ForgeError::serde(format!("parse manifest '{}': {e}", path.display())))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/output/manifest.rs"]
mod tests;
