use std::path::Path;

use anyhow::Context;

use crate::{
    config::model::ForgeConfig,
    foundation::error::{ForgeError, ForgeResult},
};

/// Read a configuration file, choosing the format from its extension.
///
/// `.json` is parsed as JSON; `.yaml`, `.yml` and anything else as YAML.
pub fn load_config(path: &Path) -> ForgeResult<ForgeConfig> {
    if !path.is_file() {
        return Err(ForgeError::validation(format!(
            "config file not found at '{}'",
            path.display()
        )));
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config '{}'", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        parse_json(&text)
    } else {
        parse_yaml(&text)
    }
}

/// Parse a YAML configuration document.
pub fn parse_yaml(text: &str) -> ForgeResult<ForgeConfig> {
    serde_yaml::from_str(text).map_err(|e| ForgeError::serde(format!("parse config YAML: {e}")))
}

/// Parse a JSON configuration document.
pub fn parse_json(text: &str) -> ForgeResult<ForgeConfig> {
    serde_json::from_str(text).map_err(|e| ForgeError::serde(format!("parse config JSON: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/config/load.rs"]
mod tests;
