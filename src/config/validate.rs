use std::{
    collections::{BTreeMap, HashSet},
    path::{Path, PathBuf},
};

use crate::{
    assets::catalog::AssetCatalog,
    config::model::{FileType, FilterConfig, ForgeConfig, LayerConfig, RuleConfig, RuleTraitConfig},
    foundation::error::{ForgeError, ForgeResult},
    generate::engine::CompositionEngine,
    model::{ABSENT_SPELLING, Layer, Rule, RuleFilter, RuleSide, TraitValue},
    rules::index::RuleIndex,
};

/// Fully validated, immutable inputs for one generation session.
#[derive(Clone, Debug)]
pub struct Blueprint {
    /// Collection (and output folder) name.
    pub name: String,
    /// Number of distinct trait sets to produce.
    pub count: usize,
    /// Output image format.
    pub filetype: FileType,
    /// Configured RNG seed.
    pub seed: Option<u64>,
    /// Layers in declared order; `layers[i].declared_index == i`.
    pub layers: Vec<Layer>,
    /// Rule lookup built from the configured rules.
    pub rules: RuleIndex,
    /// Scanned asset directories.
    pub catalog: AssetCatalog,
}

impl Blueprint {
    /// Validate `cfg`, scanning assets under `assets.path` resolved against `base_dir`.
    #[tracing::instrument(skip_all, fields(collection = %cfg.collection.name))]
    pub fn from_config(cfg: &ForgeConfig, base_dir: &Path) -> ForgeResult<Self> {
        let root = resolve_assets_root(&cfg.assets.path, base_dir);
        check_layer_names(&cfg.assets.layers)?;
        let catalog = AssetCatalog::scan(&root, cfg.assets.layers.iter().map(|l| &l.name))?;
        Self::with_catalog(cfg, catalog)
    }

    /// Validate `cfg` against an already scanned catalog.
    pub fn with_catalog(cfg: &ForgeConfig, catalog: AssetCatalog) -> ForgeResult<Self> {
        let name = cfg.collection.name.trim();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(ForgeError::validation(format!(
                "collection name '{}' must be a plain, non-empty folder name",
                cfg.collection.name
            )));
        }
        let count = match cfg.collection.count {
            Some(0) => return Err(ForgeError::validation("collection.count must be >= 1")),
            Some(n) => n,
            None => {
                return Err(ForgeError::validation(
                    "collection.count is missing; set it in the config or pass --count",
                ));
            }
        };
        if cfg.assets.layers.is_empty() {
            return Err(ForgeError::validation("no layers specified"));
        }
        check_layer_names(&cfg.assets.layers)?;

        let layers = cfg
            .assets
            .layers
            .iter()
            .enumerate()
            .map(|(i, l)| build_layer(i, l, &catalog))
            .collect::<ForgeResult<Vec<_>>>()?;

        let rules = cfg
            .rules
            .iter()
            .enumerate()
            .map(|(i, r)| build_rule(i, r, &layers))
            .collect::<ForgeResult<Vec<_>>>()?;
        let rules = RuleIndex::build(rules, &layers)?;

        tracing::debug!(
            layers = layers.len(),
            rules = rules.rules().len(),
            "configuration validated"
        );

        Ok(Self {
            name: name.to_string(),
            count,
            filetype: cfg.collection.filetype,
            seed: cfg.collection.seed,
            layers,
            rules,
            catalog,
        })
    }

    /// Layer names in declared order.
    pub fn layer_names(&self) -> Vec<String> {
        self.layers.iter().map(|l| l.name.clone()).collect()
    }

    /// Layer by name.
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Generation engine over this blueprint's layers and rules.
    pub fn engine(&self) -> ForgeResult<CompositionEngine<'_>> {
        CompositionEngine::new(&self.layers, &self.rules)
    }

    /// Interpret a configured value name for `layer`.
    ///
    /// The reserved spelling `None` means [`TraitValue::Absent`] on optional layers only.
    pub fn value_for(layer: &Layer, raw: &str) -> TraitValue {
        parse_value(layer.required, raw)
    }
}

/// Resolve `assets.path` against the configuration file's directory.
pub fn resolve_assets_root(path: &str, base_dir: &Path) -> PathBuf {
    let p = PathBuf::from(path);
    if p.is_absolute() { p } else { base_dir.join(p) }
}

fn check_layer_names(layers: &[LayerConfig]) -> ForgeResult<()> {
    let mut seen = HashSet::new();
    for (i, layer) in layers.iter().enumerate() {
        let name = layer.name.as_str();
        if name.trim().is_empty() {
            return Err(ForgeError::validation(format!(
                "no layer name specified for layer at index {i}"
            )));
        }
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(ForgeError::validation(format!(
                "layer name '{name}' must be a plain folder name"
            )));
        }
        if !seen.insert(name) {
            return Err(ForgeError::validation(format!(
                "layer '{name}' is declared more than once"
            )));
        }
    }
    Ok(())
}

fn parse_value(required: bool, raw: &str) -> TraitValue {
    if !required && raw == ABSENT_SPELLING {
        TraitValue::Absent
    } else {
        TraitValue::concrete(raw)
    }
}

fn build_layer(
    declared_index: usize,
    cfg: &LayerConfig,
    catalog: &AssetCatalog,
) -> ForgeResult<Layer> {
    let assets = catalog.layer(&cfg.name)?;
    if !cfg.required && assets.contains(ABSENT_SPELLING) {
        return Err(ForgeError::validation(format!(
            "optional layer '{}' has an asset named '{ABSENT_SPELLING}', which is reserved for leaving the layer out",
            cfg.name
        )));
    }

    let mut options: Vec<TraitValue> = assets.stems().map(TraitValue::concrete).collect();
    if !cfg.required {
        options.push(TraitValue::Absent);
    }
    if options.is_empty() {
        return Err(ForgeError::validation(format!(
            "required layer '{}' has no assets",
            cfg.name
        )));
    }

    let weights: BTreeMap<TraitValue, f64> = match &cfg.rarity_weights {
        None => {
            let even = 100.0 / options.len() as f64;
            options.into_iter().map(|v| (v, even)).collect()
        }
        Some(explicit) => {
            let total: u64 = explicit.values().map(|&w| u64::from(w)).sum();
            if total != 100 {
                return Err(ForgeError::validation(format!(
                    "rarity_weights do not sum to 100 for layer '{}' (sum is {total})",
                    cfg.name
                )));
            }
            let mut weights: BTreeMap<TraitValue, f64> =
                options.into_iter().map(|v| (v, 0.0)).collect();
            for (raw, &w) in explicit {
                let value = parse_value(cfg.required, raw.as_str());
                match weights.get_mut(&value) {
                    Some(slot) => *slot = f64::from(w),
                    None => {
                        return Err(ForgeError::validation(format!(
                            "invalid image name '{}' provided for rarity_weights in layer '{}'",
                            raw.as_str(),
                            cfg.name
                        )));
                    }
                }
            }
            weights
        }
    };

    Ok(Layer {
        name: cfg.name.clone(),
        declared_index,
        required: cfg.required,
        weights,
    })
}

fn build_rule(i: usize, cfg: &RuleConfig, layers: &[Layer]) -> ForgeResult<Rule> {
    let side = |t: &RuleTraitConfig| -> ForgeResult<RuleSide> {
        let layer = layers.iter().find(|l| l.name == t.name).ok_or_else(|| {
            ForgeError::validation(format!("rule {i} references unknown layer '{}'", t.name))
        })?;
        Ok(RuleSide::set(
            t.name.clone(),
            t.value
                .names()
                .into_iter()
                .map(|raw| parse_value(layer.required, raw)),
        ))
    };

    Ok(Rule {
        filter: match cfg.filter {
            FilterConfig::Equals => RuleFilter::Equals,
            FilterConfig::NotEquals => RuleFilter::NotEquals,
        },
        side_a: side(&cfg.trait_1)?,
        side_b: side(&cfg.trait_2)?,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/config/validate.rs"]
mod tests;
