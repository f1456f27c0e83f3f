//! Error types for testflight-core

use thiserror::Error;

/// Broad classification of a [`TestFlightError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Signing, HTTP, or decoding failure talking to App Store Connect.
    Transport,
    /// An expected resource was missing or unreadable.
    DomainState,
    /// The build is not in a state that allows submission.
    Policy,
    /// Caller-supplied input was unusable.
    Config,
}

/// Errors that can occur while publishing a build to TestFlight
#[derive(Error, Debug)]
pub enum TestFlightError {
    /// Private key could not be parsed
    #[error("invalid API private key: {0}")]
    InvalidKey(String),

    /// Token signing failed
    #[error("failed to sign access token: {0}")]
    Signing(String),

    /// Non-success HTTP status from App Store Connect
    #[error("App Store Connect returned {status} for {method} {path}: {body}")]
    Http {
        status: u16,
        method: String,
        path: String,
        body: String,
    },

    /// Request could not be sent or the response could not be read
    #[error("HTTP transport error: {0}")]
    Transport(String),

    /// Response body did not match the expected resource shape
    #[error("unexpected response payload: {0}")]
    Decode(String),

    /// Base URL or request path could not be turned into a URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// No VALID, unexpired build matched the filter
    #[error("no matching build found for app {app_id} version {version}")]
    NoMatchingBuild { app_id: String, version: String },

    /// Build has no beta localization record
    #[error("no beta build localization found for build {build_id}")]
    NoLocalization { build_id: String },

    /// No external beta group with the given name
    #[error("no external beta group named '{group_name}' found for app {app_id}")]
    NoMatchingGroup { app_id: String, group_name: String },

    /// Build beta detail is missing one of its states
    #[error("Error querying build state.")]
    BuildStateUnavailable,

    /// Build is in a terminal state that blocks submission
    #[error("build rejected by App Store Connect: {state}")]
    BuildRejected { state: String },

    /// Build has not finished processing yet
    #[error(
        "AppStoreConnect is still processing the build. (external: {external}, internal: {internal})"
    )]
    StillProcessing { external: String, internal: String },

    /// Required input missing or empty
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl TestFlightError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TestFlightError::InvalidKey(_)
            | TestFlightError::Signing(_)
            | TestFlightError::Http { .. }
            | TestFlightError::Transport(_)
            | TestFlightError::Decode(_)
            | TestFlightError::InvalidUrl(_) => ErrorKind::Transport,
            TestFlightError::NoMatchingBuild { .. }
            | TestFlightError::NoLocalization { .. }
            | TestFlightError::NoMatchingGroup { .. }
            | TestFlightError::BuildStateUnavailable => ErrorKind::DomainState,
            TestFlightError::BuildRejected { .. } | TestFlightError::StillProcessing { .. } => {
                ErrorKind::Policy
            }
            TestFlightError::InvalidInput(_) => ErrorKind::Config,
        }
    }

    /// True when re-running the publish later may succeed without intervention.
    pub fn is_transient(&self) -> bool {
        matches!(self, TestFlightError::StillProcessing { .. })
    }
}

impl From<reqwest::Error> for TestFlightError {
    fn from(err: reqwest::Error) -> Self {
        TestFlightError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for TestFlightError {
    fn from(err: serde_json::Error) -> Self {
        TestFlightError::Decode(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for TestFlightError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        TestFlightError::Signing(err.to_string())
    }
}

/// Result type for TestFlight operations.
pub type Result<T> = std::result::Result<T, TestFlightError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_error_carries_vendor_state() {
        let err = TestFlightError::BuildRejected {
            state: "PROCESSING_EXCEPTION".to_string(),
        };
        assert!(err.to_string().contains("PROCESSING_EXCEPTION"));
        assert_eq!(err.kind(), ErrorKind::Policy);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_still_processing_is_transient() {
        let err = TestFlightError::StillProcessing {
            external: "PROCESSING".to_string(),
            internal: "PROCESSING".to_string(),
        };
        assert!(err
            .to_string()
            .starts_with("AppStoreConnect is still processing the build."));
        assert!(err.is_transient());
    }

    #[test]
    fn test_http_error_keeps_vendor_body() {
        let err = TestFlightError::Http {
            status: 409,
            method: "POST".to_string(),
            path: "betaAppReviewSubmissions".to_string(),
            body: r#"{"errors":[{"code":"ENTITY_ERROR"}]}"#.to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("409"));
        assert!(msg.contains("ENTITY_ERROR"));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_domain_state_kinds() {
        assert_eq!(
            TestFlightError::BuildStateUnavailable.kind(),
            ErrorKind::DomainState
        );
        assert_eq!(
            TestFlightError::BuildStateUnavailable.to_string(),
            "Error querying build state."
        );
        let err = TestFlightError::NoMatchingBuild {
            app_id: "123".to_string(),
            version: "1.0".to_string(),
        };
        assert!(err.to_string().contains("no matching build"));
    }
}
