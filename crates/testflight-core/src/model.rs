//! App Store Connect resource model.
//!
//! Responses follow the JSON:API shape `{"data": ...}` where each resource is
//! `{"type", "id", "attributes"}`. Each resource kind gets its own attribute
//! struct so a step can only read fields its resource actually carries.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }
    };
}

resource_id!(
    /// Identifier of a `builds` resource (also keys its `buildBetaDetails`).
    BuildId
);
resource_id!(
    /// Identifier of a `betaBuildLocalizations` resource.
    LocalizationId
);
resource_id!(
    /// Identifier of a `betaGroups` resource.
    GroupId
);

/// Caller-supplied filter that selects a single build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReference {
    pub app_id: String,
    pub version: String,
}

// ---------------------------------------------------------------------------
// JSON:API documents
// ---------------------------------------------------------------------------

/// Resource kinds this client reads or writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceType {
    Builds,
    BuildBetaDetails,
    BetaBuildLocalizations,
    BetaGroups,
    BetaAppReviewSubmissions,
    #[serde(other)]
    Other,
}

/// Top-level response document.
#[derive(Debug, Clone, Deserialize)]
pub struct Document<D> {
    pub data: D,
}

/// A single resource object with kind-specific attributes.
#[derive(Debug, Clone, Deserialize)]
pub struct Resource<A> {
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub id: String,
    pub attributes: Option<A>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildAttributes {
    pub version: Option<String>,
    pub processing_state: Option<String>,
    pub expired: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildBetaDetailAttributes {
    pub auto_notify_enabled: Option<bool>,
    pub did_notify: Option<bool>,
    pub external_build_state: Option<BetaBuildState>,
    pub internal_build_state: Option<BetaBuildState>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetaBuildLocalizationAttributes {
    pub locale: Option<String>,
    pub whats_new: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetaGroupAttributes {
    pub name: Option<String>,
    pub is_internal_group: Option<bool>,
}

// ---------------------------------------------------------------------------
// Outgoing payloads
// ---------------------------------------------------------------------------

/// `{"type", "id"}` pointer used in relationship bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub id: String,
}

impl ResourceIdentifier {
    pub fn build(id: &BuildId) -> Self {
        Self {
            kind: ResourceType::Builds,
            id: id.0.clone(),
        }
    }
}

/// PATCH body for a single resource.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceUpdate<A> {
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub id: String,
    pub attributes: A,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsNewUpdate {
    pub whats_new: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoNotifyUpdate {
    pub auto_notify_enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelationshipData {
    pub data: ResourceIdentifier,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionRelationships {
    pub build: RelationshipData,
}

/// POST body creating a `betaAppReviewSubmissions` resource.
#[derive(Debug, Clone, Serialize)]
pub struct BetaAppReviewSubmissionCreate {
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub relationships: SubmissionRelationships,
}

impl BetaAppReviewSubmissionCreate {
    pub fn for_build(build_id: &BuildId) -> Self {
        Self {
            kind: ResourceType::BetaAppReviewSubmissions,
            relationships: SubmissionRelationships {
                build: RelationshipData {
                    data: ResourceIdentifier::build(build_id),
                },
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Beta build states
// ---------------------------------------------------------------------------

/// External or internal beta state of a build as reported by App Store Connect.
///
/// Unrecognised values are kept verbatim in [`BetaBuildState::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum BetaBuildState {
    Processing,
    ProcessingException,
    MissingExportCompliance,
    ReadyForBetaTesting,
    InBetaTesting,
    Expired,
    ReadyForBetaSubmission,
    InExportComplianceReview,
    WaitingForBetaReview,
    InBetaReview,
    BetaRejected,
    BetaApproved,
    Other(String),
}

impl BetaBuildState {
    pub fn as_str(&self) -> &str {
        match self {
            BetaBuildState::Processing => "PROCESSING",
            BetaBuildState::ProcessingException => "PROCESSING_EXCEPTION",
            BetaBuildState::MissingExportCompliance => "MISSING_EXPORT_COMPLIANCE",
            BetaBuildState::ReadyForBetaTesting => "READY_FOR_BETA_TESTING",
            BetaBuildState::InBetaTesting => "IN_BETA_TESTING",
            BetaBuildState::Expired => "EXPIRED",
            BetaBuildState::ReadyForBetaSubmission => "READY_FOR_BETA_SUBMISSION",
            BetaBuildState::InExportComplianceReview => "IN_EXPORT_COMPLIANCE_REVIEW",
            BetaBuildState::WaitingForBetaReview => "WAITING_FOR_BETA_REVIEW",
            BetaBuildState::InBetaReview => "IN_BETA_REVIEW",
            BetaBuildState::BetaRejected => "BETA_REJECTED",
            BetaBuildState::BetaApproved => "BETA_APPROVED",
            BetaBuildState::Other(s) => s,
        }
    }

    /// States from which the build can never reach beta review on its own.
    pub fn is_rejectable(&self) -> bool {
        matches!(
            self,
            BetaBuildState::ProcessingException | BetaBuildState::MissingExportCompliance
        )
    }
}

impl From<String> for BetaBuildState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PROCESSING" => BetaBuildState::Processing,
            "PROCESSING_EXCEPTION" => BetaBuildState::ProcessingException,
            "MISSING_EXPORT_COMPLIANCE" => BetaBuildState::MissingExportCompliance,
            "READY_FOR_BETA_TESTING" => BetaBuildState::ReadyForBetaTesting,
            "IN_BETA_TESTING" => BetaBuildState::InBetaTesting,
            "EXPIRED" => BetaBuildState::Expired,
            "READY_FOR_BETA_SUBMISSION" => BetaBuildState::ReadyForBetaSubmission,
            "IN_EXPORT_COMPLIANCE_REVIEW" => BetaBuildState::InExportComplianceReview,
            "WAITING_FOR_BETA_REVIEW" => BetaBuildState::WaitingForBetaReview,
            "IN_BETA_REVIEW" => BetaBuildState::InBetaReview,
            "BETA_REJECTED" => BetaBuildState::BetaRejected,
            "BETA_APPROVED" => BetaBuildState::BetaApproved,
            _ => BetaBuildState::Other(s),
        }
    }
}

impl From<&str> for BetaBuildState {
    fn from(s: &str) -> Self {
        BetaBuildState::from(s.to_string())
    }
}

impl std::fmt::Display for BetaBuildState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a build's beta detail, read once per publish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildBetaDetails {
    pub external_build_state: Option<BetaBuildState>,
    pub internal_build_state: Option<BetaBuildState>,
    pub auto_notify_enabled: bool,
    pub did_notify: bool,
}

impl From<BuildBetaDetailAttributes> for BuildBetaDetails {
    fn from(attrs: BuildBetaDetailAttributes) -> Self {
        Self {
            external_build_state: attrs.external_build_state,
            internal_build_state: attrs.internal_build_state,
            auto_notify_enabled: attrs.auto_notify_enabled.unwrap_or(false),
            did_notify: attrs.did_notify.unwrap_or(false),
        }
    }
}
