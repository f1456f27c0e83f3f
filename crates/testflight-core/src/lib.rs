//! TestFlight Core: App Store Connect client and publish orchestration
//!
//! Publishes an already-uploaded build to TestFlight external testers:
//! resolve the build, check it finished processing, set release notes,
//! enable auto-notify, add it to a beta group, and submit it for beta review.

pub mod client;
pub mod config;
pub mod error;
pub mod fakes;
pub mod model;
pub mod obs;
pub mod publish;
pub mod readiness;
pub mod telemetry;
pub mod token;
pub mod transport;

pub use client::{AppStoreConnectClient, RequestOptions};
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use error::{ErrorKind, Result, TestFlightError};
pub use model::{
    BetaBuildState, BuildBetaDetails, BuildId, BuildReference, GroupId, LocalizationId,
    ResourceType,
};
pub use publish::{
    publish_to_testflight, LocalizedBuild, PublishReport, PublishRequest, PublishStep,
    ResolvedBuild, ResolvedBuildState, TestFlightPublisher,
};
pub use readiness::{evaluate_build_readiness, BuildReadiness};
pub use telemetry::init_tracing;
pub use token::{
    Clock, Credentials, Es256Signer, SystemClock, TokenManager, TokenSigner, AUDIENCE,
    TOKEN_VALIDITY_SECS,
};
pub use transport::{ApiRequest, HttpMethod, ReqwestTransport, Transport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
