use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Root configuration document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForgeConfig {
    /// What to produce.
    pub collection: CollectionConfig,
    /// Where layer assets live and how layers are weighted.
    pub assets: AssetsConfig,
    /// Cross-layer compatibility rules.
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// Collection-level settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionConfig {
    /// Collection name; also the output folder name.
    pub name: String,
    /// Number of distinct trait sets to generate.
    #[serde(default, alias = "requested_count")]
    pub count: Option<usize>,
    /// Asset and output image format.
    pub filetype: FileType,
    /// RNG seed; a random one is drawn (and logged) when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Image container used for outputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PNG with alpha.
    Png,
    /// JPEG; transparency is flattened onto black.
    #[serde(alias = "jpg")]
    Jpeg,
}

impl FileType {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    /// Matching `image` crate format.
    pub fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

/// Asset root and layer stack.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetsConfig {
    /// Directory holding one subdirectory per layer. Relative paths resolve against the
    /// configuration file's directory.
    pub path: String,
    /// Layers from background (first) to topmost (last).
    pub layers: Vec<LayerConfig>,
}

/// One configured layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerConfig {
    /// Layer name; must match its asset folder name.
    pub name: String,
    /// When false the layer may be left out of a trait set.
    #[serde(default)]
    pub required: bool,
    /// Integer percentages per trait value, summing to 100. Missing means even weighting.
    #[serde(default)]
    pub rarity_weights: Option<BTreeMap<ValueName, u32>>,
}

/// Rule filter kind as spelled in configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterConfig {
    /// `equals`
    Equals,
    /// `notequals`
    #[serde(alias = "not_equals")]
    NotEquals,
}

/// One configured rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Constraint kind.
    pub filter: FilterConfig,
    /// First side.
    pub trait_1: RuleTraitConfig,
    /// Second side.
    pub trait_2: RuleTraitConfig,
}

/// One side of a configured rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleTraitConfig {
    /// Layer name.
    pub name: String,
    /// Single value, or a list of values (`notequals` only).
    pub value: RuleValueConfig,
}

/// A rule value: one name or a list of names.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValueConfig {
    /// A single trait value.
    One(ValueName),
    /// Several trait values.
    Many(Vec<ValueName>),
}

impl RuleValueConfig {
    /// Names in configuration order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::One(v) => vec![v.as_str()],
            Self::Many(vs) => vs.iter().map(ValueName::as_str).collect(),
        }
    }
}

/// Trait value name as written in configuration.
///
/// Accepts YAML scalars that are not strings (asset files are often named `1.png`), keeping
/// their textual form.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ValueName(pub String);

impl ValueName {
    /// The name as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ValueName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl<'de> Deserialize<'de> for ValueName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Visitor;

        impl serde::de::Visitor<'_> for Visitor {
            type Value = ValueName;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a trait value name")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<ValueName, E> {
                Ok(ValueName(v.to_string()))
            }

            fn visit_string<E: serde::de::Error>(self, v: String) -> Result<ValueName, E> {
                Ok(ValueName(v))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<ValueName, E> {
                Ok(ValueName(v.to_string()))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<ValueName, E> {
                Ok(ValueName(v.to_string()))
            }

            fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<ValueName, E> {
                Ok(ValueName(v.to_string()))
            }

            fn visit_bool<E: serde::de::Error>(self, v: bool) -> Result<ValueName, E> {
                Ok(ValueName(v.to_string()))
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}
