use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::foundation::error::{ForgeError, ForgeResult};

/// Asset files available for one layer, keyed by file stem.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LayerAssets {
    by_stem: BTreeMap<String, PathBuf>,
}

impl LayerAssets {
    /// Stems in sorted order.
    pub fn stems(&self) -> impl Iterator<Item = &str> {
        self.by_stem.keys().map(String::as_str)
    }

    /// File backing `stem`.
    pub fn path(&self, stem: &str) -> Option<&Path> {
        self.by_stem.get(stem).map(PathBuf::as_path)
    }

    /// Whether `stem` is present.
    pub fn contains(&self, stem: &str) -> bool {
        self.by_stem.contains_key(stem)
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.by_stem.len()
    }

    /// Whether the layer directory held no usable assets.
    pub fn is_empty(&self) -> bool {
        self.by_stem.is_empty()
    }
}

/// Immutable snapshot of the per-layer asset directories under one root.
///
/// Each layer maps to `<root>/<layer name>/`; only regular files directly inside that directory
/// whose names do not start with `.` are considered, keyed by file stem. Files in nested
/// subdirectories are ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetCatalog {
    root: PathBuf,
    layers: BTreeMap<String, LayerAssets>,
}

impl AssetCatalog {
    /// Scan the asset directory of every layer in `layer_names`.
    #[tracing::instrument(skip_all, fields(root = %root.as_ref().display()))]
    pub fn scan<I, S>(root: impl AsRef<Path>, layer_names: I) -> ForgeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let root = root.as_ref().to_path_buf();
        let mut layers = BTreeMap::new();
        for name in layer_names {
            let name = name.as_ref();
            let assets = scan_layer_dir(&root, name)?;
            tracing::debug!(layer = name, assets = assets.len(), "scanned layer directory");
            layers.insert(name.to_string(), assets);
        }
        Ok(Self { root, layers })
    }

    /// Build a catalog from in-memory listings, without touching the filesystem.
    pub fn from_listings<I, S, V>(root: impl Into<PathBuf>, listings: I) -> Self
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: IntoIterator<Item = (String, PathBuf)>,
    {
        let layers = listings
            .into_iter()
            .map(|(name, files)| {
                (
                    name.into(),
                    LayerAssets {
                        by_stem: files.into_iter().collect(),
                    },
                )
            })
            .collect();
        Self {
            root: root.into(),
            layers,
        }
    }

    /// Root directory holding one subdirectory per layer.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Assets scanned for `layer`.
    pub fn layer(&self, layer: &str) -> ForgeResult<&LayerAssets> {
        self.layers
            .get(layer)
            .ok_or_else(|| ForgeError::catalog(format!("layer '{layer}' is not in the catalog")))
    }

    /// Trait-value identifiers (file stems) available for `layer`.
    pub fn list_trait_values(&self, layer: &str) -> ForgeResult<BTreeSet<String>> {
        Ok(self.layer(layer)?.stems().map(str::to_string).collect())
    }

    /// File backing `stem` in `layer`.
    pub fn resolve(&self, layer: &str, stem: &str) -> ForgeResult<&Path> {
        self.layer(layer)?.path(stem).ok_or_else(|| {
            ForgeError::catalog(format!("no asset '{stem}' in layer '{layer}'"))
        })
    }
}

fn scan_layer_dir(root: &Path, layer: &str) -> ForgeResult<LayerAssets> {
    let dir = root.join(layer);
    if !dir.is_dir() {
        return Err(ForgeError::catalog(format!(
            "asset directory for layer '{layer}' not found at '{}'; the layer name must match the folder name exactly",
            dir.display()
        )));
    }

    let entries =
        std::fs::read_dir(&dir).with_context(|| format!("read asset dir '{}'", dir.display()))?;

    let mut by_stem = BTreeMap::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read entry in '{}'", dir.display()))?;
        let path = entry.path();
        // Follows symlinks, unlike `DirEntry::file_type`.
        if !path.is_file() {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if stem.is_empty() || stem.starts_with('.') {
            continue;
        }
        if let Some(prev) = by_stem.insert(stem.to_string(), path.clone()) {
            return Err(ForgeError::catalog(format!(
                "layer '{layer}' has two assets with stem '{stem}': '{}' and '{}'",
                prev.display(),
                path.display()
            )));
        }
    }

    Ok(LayerAssets { by_stem })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/catalog.rs"]
mod tests;
