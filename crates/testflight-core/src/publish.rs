//! TestFlight publish orchestration.
//!
//! Runs the seven remote steps in a fixed order and stops at the first
//! failure. Identifiers discovered along the way are carried in stage records
//! ([`ResolvedBuild`] → [`LocalizedBuild`] → [`ResolvedBuildState`]) that each
//! step consumes and returns, so a later step can only run once the ids it
//! needs exist. Steps already executed are not rolled back on failure.

use std::time::Instant;

use tracing::{info, Instrument};

use crate::client::AppStoreConnectClient;
use crate::config::ClientConfig;
use crate::error::{Result, TestFlightError};
use crate::model::{BuildId, BuildReference, GroupId, LocalizationId};
use crate::obs::{
    emit_publish_failed, emit_publish_finished, emit_publish_started, emit_step_completed,
    publish_span,
};
use crate::readiness::evaluate_build_readiness;
use crate::token::Credentials;

/// The steps of a publish, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStep {
    ResolveBuild,
    CheckReadiness,
    ResolveLocalization,
    UpdateReleaseNotes,
    EnableAutoNotify,
    AddToGroup,
    SubmitForReview,
}

impl PublishStep {
    pub const ALL: [PublishStep; 7] = [
        PublishStep::ResolveBuild,
        PublishStep::CheckReadiness,
        PublishStep::ResolveLocalization,
        PublishStep::UpdateReleaseNotes,
        PublishStep::EnableAutoNotify,
        PublishStep::AddToGroup,
        PublishStep::SubmitForReview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStep::ResolveBuild => "resolve_build",
            PublishStep::CheckReadiness => "check_readiness",
            PublishStep::ResolveLocalization => "resolve_localization",
            PublishStep::UpdateReleaseNotes => "update_release_notes",
            PublishStep::EnableAutoNotify => "enable_auto_notify",
            PublishStep::AddToGroup => "add_to_group",
            PublishStep::SubmitForReview => "submit_for_review",
        }
    }

    /// 1-based position in the sequence.
    pub fn seq(&self) -> u8 {
        match self {
            PublishStep::ResolveBuild => 1,
            PublishStep::CheckReadiness => 2,
            PublishStep::ResolveLocalization => 3,
            PublishStep::UpdateReleaseNotes => 4,
            PublishStep::EnableAutoNotify => 5,
            PublishStep::AddToGroup => 6,
            PublishStep::SubmitForReview => 7,
        }
    }
}

impl std::fmt::Display for PublishStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Stage records
// ---------------------------------------------------------------------------

/// Build resolved by step 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBuild {
    pub build_id: BuildId,
}

impl ResolvedBuild {
    pub fn with_localization(self, localization_id: LocalizationId) -> LocalizedBuild {
        LocalizedBuild {
            build_id: self.build_id,
            localization_id,
        }
    }
}

/// Build plus the localization resolved by step 3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizedBuild {
    pub build_id: BuildId,
    pub localization_id: LocalizationId,
}

impl LocalizedBuild {
    pub fn with_group(self, group_id: GroupId) -> ResolvedBuildState {
        ResolvedBuildState {
            build_id: self.build_id,
            localization_id: self.localization_id,
            group_id,
        }
    }
}

/// Every identifier discovered during a publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBuildState {
    pub build_id: BuildId,
    pub localization_id: LocalizationId,
    pub group_id: GroupId,
}

/// Successful publish outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub state: ResolvedBuildState,
    pub steps: Vec<PublishStep>,
    pub duration_ms: u64,
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Inputs for one publish.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub build: BuildReference,
    pub group_name: String,
    pub credentials: Credentials,
    pub whats_new: String,
}

impl PublishRequest {
    pub fn new(
        app_id: &str,
        version: &str,
        group_name: &str,
        credentials: Credentials,
        whats_new: &str,
    ) -> Self {
        PublishRequest {
            build: BuildReference {
                app_id: app_id.trim().to_string(),
                version: version.trim().to_string(),
            },
            group_name: group_name.trim().to_string(),
            credentials,
            whats_new: whats_new.to_string(),
        }
    }

    /// Reject empty required inputs before any request is made.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("app id", self.build.app_id.as_str()),
            ("bundle version", self.build.version.as_str()),
            ("group name", self.group_name.as_str()),
            ("issuer id", self.credentials.issuer_id()),
            ("API key id", self.credentials.key_id()),
            ("API private key", self.credentials.private_key()),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(TestFlightError::InvalidInput(format!("{} is required", name)));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

/// Runs publish steps against a client.
pub struct TestFlightPublisher<'a> {
    client: &'a AppStoreConnectClient,
}

impl<'a> TestFlightPublisher<'a> {
    pub fn new(client: &'a AppStoreConnectClient) -> Self {
        TestFlightPublisher { client }
    }

    /// Step 1: newest VALID, unexpired build for the reference.
    pub async fn resolve_build(&self, reference: &BuildReference) -> Result<ResolvedBuild> {
        let build_id = self.client.find_latest_build(reference).await?;
        info!(build_id = %build_id, "resolved build");
        Ok(ResolvedBuild { build_id })
    }

    /// Step 2: fail unless the build is ready for beta submission.
    pub async fn check_build_readiness(&self, build: &ResolvedBuild) -> Result<()> {
        let details = self.client.build_beta_details(&build.build_id).await?;
        evaluate_build_readiness(&details).into_result()
    }

    /// Step 3: attach the build's beta localization id.
    pub async fn resolve_localization(&self, build: ResolvedBuild) -> Result<LocalizedBuild> {
        let localization_id = self
            .client
            .beta_build_localization_id(&build.build_id)
            .await?;
        Ok(build.with_localization(localization_id))
    }

    /// Step 4: set the release notes.
    pub async fn update_release_notes(&self, build: &LocalizedBuild, whats_new: &str) -> Result<()> {
        self.client
            .update_whats_new(&build.localization_id, whats_new)
            .await
    }

    /// Step 5: notify testers automatically once the build is available.
    pub async fn enable_auto_notify(&self, build: &LocalizedBuild) -> Result<()> {
        self.client.enable_auto_notify(&build.build_id).await
    }

    /// Step 6: resolve the external group and add the build to it.
    pub async fn add_to_group(
        &self,
        build: LocalizedBuild,
        app_id: &str,
        group_name: &str,
    ) -> Result<ResolvedBuildState> {
        let group_id = self.client.find_external_group(app_id, group_name).await?;
        self.client
            .add_build_to_group(&group_id, &build.build_id)
            .await?;
        Ok(build.with_group(group_id))
    }

    /// Step 7: submit the build for beta app review.
    pub async fn submit_for_review(&self, state: &ResolvedBuildState) -> Result<()> {
        self.client.submit_for_beta_review(&state.build_id).await
    }

    /// Run all seven steps in order, stopping at the first failure.
    pub async fn publish(&self, request: &PublishRequest) -> Result<PublishReport> {
        request.validate()?;

        let run_id = uuid::Uuid::new_v4().to_string();
        let span = publish_span(&run_id, &request.build.app_id, &request.build.version);
        self.publish_in_span(request).instrument(span).await
    }

    async fn publish_in_span(&self, request: &PublishRequest) -> Result<PublishReport> {
        emit_publish_started(
            &request.build.app_id,
            &request.build.version,
            &request.group_name,
            &request.whats_new,
        );

        let started = Instant::now();
        let mut steps = Vec::with_capacity(PublishStep::ALL.len());

        let state = match self.run_steps(request, &mut steps).await {
            Ok(state) => state,
            Err(err) => {
                let failed = PublishStep::ALL
                    .get(steps.len())
                    .copied()
                    .unwrap_or(PublishStep::SubmitForReview);
                emit_publish_failed(failed.as_str(), &err);
                return Err(err);
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        emit_publish_finished(state.build_id.as_str(), duration_ms);
        Ok(PublishReport {
            state,
            steps,
            duration_ms,
        })
    }

    async fn run_steps(
        &self,
        request: &PublishRequest,
        steps: &mut Vec<PublishStep>,
    ) -> Result<ResolvedBuildState> {
        let build = self.resolve_build(&request.build).await?;
        completed(steps, PublishStep::ResolveBuild);

        self.check_build_readiness(&build).await?;
        completed(steps, PublishStep::CheckReadiness);

        let build = self.resolve_localization(build).await?;
        completed(steps, PublishStep::ResolveLocalization);

        self.update_release_notes(&build, &request.whats_new).await?;
        completed(steps, PublishStep::UpdateReleaseNotes);

        self.enable_auto_notify(&build).await?;
        completed(steps, PublishStep::EnableAutoNotify);

        let state = self
            .add_to_group(build, &request.build.app_id, &request.group_name)
            .await?;
        completed(steps, PublishStep::AddToGroup);

        self.submit_for_review(&state).await?;
        completed(steps, PublishStep::SubmitForReview);

        Ok(state)
    }
}

fn completed(steps: &mut Vec<PublishStep>, step: PublishStep) {
    emit_step_completed(step.as_str(), step.seq());
    steps.push(step);
}

/// Publish the newest matching build to TestFlight over HTTP.
pub async fn publish_to_testflight(
    request: &PublishRequest,
    config: &ClientConfig,
) -> Result<PublishReport> {
    request.validate()?;
    let client = AppStoreConnectClient::new(request.credentials.clone(), config)?;
    TestFlightPublisher::new(&client).publish(request).await
}
