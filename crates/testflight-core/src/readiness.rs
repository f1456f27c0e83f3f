//! Build readiness decision table.
//!
//! Rules are evaluated in order:
//!
//! 1. Either state missing: unknown.
//! 2. External `READY_FOR_BETA_SUBMISSION` and internal `READY_FOR_BETA_TESTING`
//!    or `IN_BETA_TESTING`: ready.
//! 3. Either state `PROCESSING_EXCEPTION` or `MISSING_EXPORT_COMPLIANCE`:
//!    rejected, reported with the external state.
//! 4. Anything else: still processing.

use tracing::warn;

use crate::error::{Result, TestFlightError};
use crate::model::{BetaBuildState, BuildBetaDetails};

/// Outcome of evaluating a build's beta states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildReadiness {
    Ready,
    Rejected {
        external: BetaBuildState,
    },
    StillProcessing {
        external: BetaBuildState,
        internal: BetaBuildState,
    },
    Unknown,
}

impl BuildReadiness {
    /// Convert to the publish flow's error taxonomy.
    pub fn into_result(self) -> Result<()> {
        match self {
            BuildReadiness::Ready => Ok(()),
            BuildReadiness::Unknown => Err(TestFlightError::BuildStateUnavailable),
            BuildReadiness::Rejected { external } => Err(TestFlightError::BuildRejected {
                state: external.to_string(),
            }),
            BuildReadiness::StillProcessing { external, internal } => {
                warn!(%external, %internal, "build is not ready for beta submission yet");
                Err(TestFlightError::StillProcessing {
                    external: external.to_string(),
                    internal: internal.to_string(),
                })
            }
        }
    }
}

pub fn evaluate_build_readiness(details: &BuildBetaDetails) -> BuildReadiness {
    let (external, internal) = match (
        &details.external_build_state,
        &details.internal_build_state,
    ) {
        (Some(external), Some(internal)) => (external, internal),
        _ => return BuildReadiness::Unknown,
    };

    let internal_ready = matches!(
        internal,
        BetaBuildState::ReadyForBetaTesting | BetaBuildState::InBetaTesting
    );
    if *external == BetaBuildState::ReadyForBetaSubmission && internal_ready {
        return BuildReadiness::Ready;
    }

    if external.is_rejectable() || internal.is_rejectable() {
        return BuildReadiness::Rejected {
            external: external.clone(),
        };
    }

    BuildReadiness::StillProcessing {
        external: external.clone(),
        internal: internal.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(external: Option<&str>, internal: Option<&str>) -> BuildBetaDetails {
        BuildBetaDetails {
            external_build_state: external.map(BetaBuildState::from),
            internal_build_state: internal.map(BetaBuildState::from),
            ..Default::default()
        }
    }

    #[derive(Debug, PartialEq)]
    enum Outcome {
        Proceed,
        Rejected,
        StillProcessing,
        Unknown,
    }

    fn outcome(external: Option<&str>, internal: Option<&str>) -> Outcome {
        match evaluate_build_readiness(&details(external, internal)) {
            BuildReadiness::Ready => Outcome::Proceed,
            BuildReadiness::Rejected { .. } => Outcome::Rejected,
            BuildReadiness::StillProcessing { .. } => Outcome::StillProcessing,
            BuildReadiness::Unknown => Outcome::Unknown,
        }
    }

    #[test]
    fn test_decision_table() {
        let ready = Some("READY_FOR_BETA_SUBMISSION");
        let cases: &[(Option<&str>, Option<&str>, Outcome)] = &[
            (ready, Some("READY_FOR_BETA_TESTING"), Outcome::Proceed),
            (ready, Some("IN_BETA_TESTING"), Outcome::Proceed),
            (None, Some("IN_BETA_TESTING"), Outcome::Unknown),
            (ready, None, Outcome::Unknown),
            (None, None, Outcome::Unknown),
            (Some("PROCESSING_EXCEPTION"), Some("PROCESSING"), Outcome::Rejected),
            (Some("MISSING_EXPORT_COMPLIANCE"), Some("PROCESSING"), Outcome::Rejected),
            (Some("PROCESSING"), Some("PROCESSING_EXCEPTION"), Outcome::Rejected),
            (ready, Some("MISSING_EXPORT_COMPLIANCE"), Outcome::Rejected),
            (ready, Some("PROCESSING"), Outcome::StillProcessing),
            (Some("PROCESSING"), Some("IN_BETA_TESTING"), Outcome::StillProcessing),
            (Some("IN_BETA_REVIEW"), Some("IN_BETA_TESTING"), Outcome::StillProcessing),
            (Some("SOMETHING_NEW"), Some("SOMETHING_ELSE"), Outcome::StillProcessing),
        ];

        for (external, internal, expected) in cases {
            assert_eq!(
                &outcome(*external, *internal),
                expected,
                "external={:?} internal={:?}",
                external,
                internal
            );
        }
    }

    #[test]
    fn test_rejection_reports_external_state() {
        let err = evaluate_build_readiness(&details(
            Some("PROCESSING"),
            Some("MISSING_EXPORT_COMPLIANCE"),
        ))
        .into_result()
        .unwrap_err();
        match err {
            TestFlightError::BuildRejected { state } => assert_eq!(state, "PROCESSING"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_maps_to_query_error() {
        let err = evaluate_build_readiness(&details(None, Some("IN_BETA_TESTING")))
            .into_result()
            .unwrap_err();
        assert_eq!(err.to_string(), "Error querying build state.");
    }

    #[test]
    fn test_ready_is_ok() {
        assert!(evaluate_build_readiness(&details(
            Some("READY_FOR_BETA_SUBMISSION"),
            Some("READY_FOR_BETA_TESTING"),
        ))
        .into_result()
        .is_ok());
    }
}
