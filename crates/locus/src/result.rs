//! Result and error types for Locus.

use thiserror::Error;

/// Result type for Locus operations
pub type LocusResult<T> = Result<T, LocusError>;

/// Errors that can occur while resolving locators
#[derive(Debug, Error)]
pub enum LocusError {
    /// Logical element key was empty
    #[error("Invalid locator key: keys must be non-empty")]
    InvalidKey,

    /// The model reported that the element is not in the page markup
    #[error("AI could not find element '{key}' ({description}) in the page markup")]
    NotFound {
        /// Logical element key
        key: String,
        /// Natural-language description
        description: String,
    },

    /// The model produced a selector that matches nothing on the live page
    #[error("AI suggested selector '{selector}' for '{key}' ({description}) but it does not match the live page")]
    Hallucinated {
        /// Logical element key
        key: String,
        /// Natural-language description
        description: String,
        /// The rejected candidate selector
        selector: String,
    },

    /// The inference backend could not be reached or failed
    #[error("Inference backend failed while resolving '{key}' ({description}): {message}")]
    InferenceUnavailable {
        /// Logical element key
        key: String,
        /// Natural-language description
        description: String,
        /// Backend error message
        message: String,
    },

    /// No API key configured for the inference backend
    #[error("No inference API key configured. Set one of: {variables}")]
    MissingCredential {
        /// Environment variables that were consulted
        variables: String,
    },

    /// The page markup could not be captured for reduction
    #[error("Failed to capture page snapshot: {message}")]
    Snapshot {
        /// Error message
        message: String,
    },

    /// Page error
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl LocusError {
    /// Whether this error came out of the resolution protocol itself
    /// (as opposed to setup, I/O or browser failures).
    #[must_use]
    pub const fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Hallucinated { .. } | Self::InferenceUnavailable { .. }
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_key_and_description() {
        let err = LocusError::NotFound {
            key: "login-submit-btn".into(),
            description: "Login button".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("could not find"));
        assert!(msg.contains("login-submit-btn"));
        assert!(msg.contains("Login button"));
    }

    #[test]
    fn test_hallucinated_message_is_distinct_from_not_found() {
        let err = LocusError::Hallucinated {
            key: "k".into(),
            description: "d".into(),
            selector: "#nope".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("#nope"));
        assert!(msg.contains("does not match the live page"));
        assert!(!msg.contains("could not find"));
    }

    #[test]
    fn test_resolution_failure_classification() {
        assert!(LocusError::NotFound {
            key: "k".into(),
            description: "d".into()
        }
        .is_resolution_failure());
        assert!(!LocusError::InvalidKey.is_resolution_failure());
        assert!(!LocusError::MissingCredential {
            variables: "LOCUS_API_KEY".into()
        }
        .is_resolution_failure());
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: LocusError = io_err.into();
        assert!(err.to_string().contains("I/O"));
    }
}
