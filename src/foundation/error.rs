/// Convenience result type used across layerforge.
pub type ForgeResult<T> = Result<T, ForgeError>;

/// Top-level error taxonomy used by generation and rendering APIs.
#[derive(thiserror::Error, Debug)]
pub enum ForgeError {
    /// Invalid user-provided configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// Asset directories that cannot be scanned into a catalog.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Errors while assembling trait sets.
    #[error("generation error: {0}")]
    Generation(String),

    /// The reachable combination space cannot supply the requested number of distinct trait sets.
    #[error(
        "combination space exhausted: requested {requested}, accepted {accepted}{}",
        reachable_suffix(*reachable)
    )]
    Exhausted {
        /// Number of distinct trait sets requested.
        requested: u64,
        /// Number of distinct trait sets accepted before giving up.
        accepted: u64,
        /// Exact reachable space size when it was enumerated.
        reachable: Option<u64>,
    },

    /// Errors while compositing a single trait set.
    #[error("render error: {0}")]
    Render(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn reachable_suffix(reachable: Option<u64>) -> String {
    match reachable {
        Some(n) => format!(" (only {n} reachable combinations)"),
        None => String::new(),
    }
}

impl ForgeError {
    /// Build a [`ForgeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ForgeError::Catalog`] value.
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }

    /// Build a [`ForgeError::Generation`] value.
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Build a [`ForgeError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`ForgeError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
