//! Structured observability hooks for publish runs.
//!
//! This module provides:
//! - A run-scoped tracing span via [`publish_span`]
//! - Emission functions for publish lifecycle events: start, step, finish, failure
//!
//! Events are emitted at `info!` level except failures, which use `error!`.

use tracing::{error, info, Span};

use crate::error::TestFlightError;

/// Span covering one publish run.
///
/// Attach it to the publish future with `tracing::Instrument` so every event
/// emitted during the run carries `run_id`, `app_id` and `version`.
///
/// # Example
///
/// ```ignore
/// publisher.run(request).instrument(publish_span("run-12345", "1234567890", "1.4.0")).await
/// ```
pub fn publish_span(run_id: &str, app_id: &str, version: &str) -> Span {
    tracing::info_span!(
        "testflight.publish",
        run_id = %run_id,
        app_id = %app_id,
        version = %version,
    )
}

/// Emit event: publish started.
pub fn emit_publish_started(app_id: &str, version: &str, group_name: &str, whats_new: &str) {
    info!(
        event = "publish.started",
        app_id = %app_id,
        version = %version,
        group = %group_name,
        whats_new = %whats_new,
        "Updating TestFlight"
    );
}

/// Emit event: one publish step completed.
pub fn emit_step_completed(step: &str, seq: u8) {
    info!(event = "publish.step_completed", step = %step, seq = seq);
}

/// Emit event: build submitted for beta review.
pub fn emit_publish_finished(build_id: &str, duration_ms: u64) {
    info!(
        event = "publish.finished",
        build_id = %build_id,
        duration_ms = duration_ms,
        "Submitted for beta review"
    );
}

/// Emit event: publish aborted at `step`.
pub fn emit_publish_failed(step: &str, error: &TestFlightError) {
    error!(
        event = "publish.failed",
        step = %step,
        kind = ?error.kind(),
        transient = error.is_transient(),
        error = %error,
    );
}
