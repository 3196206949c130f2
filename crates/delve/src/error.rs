//! Unified error type for Delve.

use delve_graph::GraphError;
use delve_transition::NavigationError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `delve` crate you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attributes let `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum DelveError {
    /// Room catalog problem (unknown room, malformed catalog).
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A navigation request was rejected or abandoned.
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    /// The configuration document could not be parsed.
    #[error("invalid dungeon configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl DelveError {
    /// `true` when retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Navigation(NavigationError::Busy))
    }
}

#[cfg(test)]
mod tests {
    use delve_graph::RoomId;

    use super::*;

    #[test]
    fn test_from_graph_error() {
        let err = GraphError::NotFound(RoomId::new("vault"));
        let delve_err: DelveError = err.into();
        assert!(matches!(delve_err, DelveError::Graph(_)));
        assert!(delve_err.to_string().contains("vault"));
    }

    #[test]
    fn test_from_navigation_error() {
        let delve_err: DelveError = NavigationError::Busy.into();
        assert!(matches!(delve_err, DelveError::Navigation(_)));
        assert!(delve_err.is_transient());
    }

    #[test]
    fn test_from_config_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let delve_err: DelveError = err.into();
        assert!(matches!(delve_err, DelveError::Config(_)));
        assert!(delve_err.to_string().starts_with("invalid dungeon configuration"));
    }
}
