//! Layerforge generates collections of layered images from folders of trait assets.
//!
//! A run has two phases:
//!
//! - Generation: a [`CompositionEngine`] draws pairwise-distinct [`TraitSet`]s layer by layer,
//!   honoring rarity weights and cross-layer [`Rule`]s, and fails with
//!   [`ForgeError::Exhausted`] when the reachable combination space is too small.
//! - Rendering: [`render_collection`] stacks each trait set's assets with premultiplied
//!   source-over on a worker pool and returns a [`BatchReport`].
//!
//! Configuration is loaded with [`load_config`] and validated into a [`Blueprint`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod config;
mod foundation;
mod generate;
mod model;
mod output;
mod render;
mod rules;

pub use crate::foundation::error::{ForgeError, ForgeResult};

pub use crate::assets::PreparedImage;
pub use crate::assets::catalog::{AssetCatalog, LayerAssets};
pub use crate::assets::decode::{decode_image, load_image};
pub use crate::config::load::{load_config, parse_json, parse_yaml};
pub use crate::config::model::{
    AssetsConfig, CollectionConfig, FileType, FilterConfig, ForgeConfig, LayerConfig, RuleConfig,
    RuleTraitConfig, RuleValueConfig, ValueName,
};
pub use crate::config::validate::{Blueprint, resolve_assets_root};
pub use crate::generate::engine::{
    Assembly, CompositionEngine, GenerateOpts, Generated, GenerationStats,
};
pub use crate::generate::sampler::{Distribution, distribution, draw};
pub use crate::generate::space::{
    count_reachable, default_rejection_budget, reachable_sets, upper_bound,
};
pub use crate::model::{
    ABSENT_SPELLING, Collection, Layer, Rule, RuleFilter, RuleSide, TraitSet, TraitValue,
};
pub use crate::output::layout::OutputLayout;
pub use crate::output::manifest::{TraitRow, TraitTable};
pub use crate::render::composite::{PremulRgba8, composite_layers, over, over_in_place};
pub use crate::render::pipeline::{
    BatchReport, RenderFailure, RenderOpts, RenderOutcome, render_collection, render_trait_set,
    resolve_sources, save_image,
};
pub use crate::rules::index::RuleIndex;
