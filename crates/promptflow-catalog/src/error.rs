//! Catalog error types.
//!
//! Catalog construction is the only fallible operation; lookups that miss
//! return empty results rather than errors.

/// Unified error type for the service catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    // -- Loading errors ------------------------------------------------------
    /// The catalog data file could not be parsed.
    #[error("failed to parse catalog data: {reason}")]
    ParseFailed { reason: String },

    /// Two services share the same name (compared case-insensitively).
    #[error("duplicate service name: {name}")]
    DuplicateService { name: String },

    /// A service definition is structurally invalid.
    #[error("invalid service `{name}`: {reason}")]
    InvalidService { name: String, reason: String },

    // -- Matching errors -----------------------------------------------------
    /// The keyword automaton could not be built.
    #[error("failed to build keyword matcher: {reason}")]
    MatcherBuildFailed { reason: String },
}

/// Convenience alias used throughout the catalog crate.
pub type Result<T> = std::result::Result<T, CatalogError>;

impl From<toml::de::Error> for CatalogError {
    fn from(err: toml::de::Error) -> Self {
        Self::ParseFailed {
            reason: err.to_string(),
        }
    }
}
