//! Authenticated App Store Connect client.
//!
//! Every call goes through [`AppStoreConnectClient::request`], which attaches
//! the cached access token and wraps mutating payloads in the `{"data": ...}`
//! envelope the API requires. The typed operations below are the individual
//! remote steps of a TestFlight publish.

use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{Result, TestFlightError};
use crate::model::{
    AutoNotifyUpdate, BetaAppReviewSubmissionCreate, BetaBuildLocalizationAttributes,
    BetaGroupAttributes, BuildAttributes, BuildBetaDetailAttributes, BuildBetaDetails, BuildId,
    BuildReference, Document, GroupId, LocalizationId, Resource, ResourceIdentifier,
    ResourceType, ResourceUpdate, WhatsNewUpdate,
};
use crate::token::{Clock, Credentials, SystemClock, TokenManager};
use crate::transport::{ApiRequest, HttpMethod, ReqwestTransport, Transport};

/// Query parameters and payload for a single request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    /// Payload placed under `data`. Callers must not wrap it themselves.
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn query(pairs: &[(&str, &str)]) -> Self {
        RequestOptions {
            query: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: None,
        }
    }

    pub fn payload<T: Serialize>(payload: &T) -> Result<Self> {
        Ok(RequestOptions {
            query: Vec::new(),
            body: Some(serde_json::to_value(payload)?),
        })
    }
}

/// App Store Connect client scoped to one set of credentials.
pub struct AppStoreConnectClient {
    transport: Arc<dyn Transport>,
    tokens: Mutex<TokenManager>,
    clock: Arc<dyn Clock>,
}

impl AppStoreConnectClient {
    /// Client over HTTP, signing tokens with the credentials' ES256 key.
    pub fn new(credentials: Credentials, config: &ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config)?;
        let tokens = TokenManager::es256(credentials)?;
        Ok(Self::with_parts(
            Arc::new(transport),
            tokens,
            Arc::new(SystemClock),
        ))
    }

    /// Client assembled from explicit parts.
    pub fn with_parts(
        transport: Arc<dyn Transport>,
        tokens: TokenManager,
        clock: Arc<dyn Clock>,
    ) -> Self {
        AppStoreConnectClient {
            transport,
            tokens: Mutex::new(tokens),
            clock,
        }
    }

    /// Send an authenticated request and return the parsed JSON response.
    ///
    /// POST, PATCH and PUT always send `{"data": <payload>}`, with `null`
    /// standing in for an absent payload. Errors from signing or the
    /// transport are returned unchanged.
    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        options: RequestOptions,
    ) -> Result<Value> {
        let authorization = {
            let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
            tokens.authorization_at(self.clock.now())?
        };

        let body = if method.carries_body() {
            Some(json!({ "data": options.body.unwrap_or(Value::Null) }))
        } else {
            None
        };

        debug!(%method, path, "App Store Connect request");
        self.transport
            .execute(ApiRequest {
                method,
                path: path.to_string(),
                query: options.query,
                body,
                authorization,
            })
            .await
    }

    async fn get_document<D: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Document<D>> {
        let value = self.request(HttpMethod::Get, path, options).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Newest VALID, unexpired build matching `reference`.
    pub async fn find_latest_build(&self, reference: &BuildReference) -> Result<BuildId> {
        let doc: Document<Vec<Resource<BuildAttributes>>> = self
            .get_document(
                "builds",
                RequestOptions::query(&[
                    ("filter[app]", reference.app_id.as_str()),
                    ("filter[version]", reference.version.as_str()),
                    ("filter[expired]", "false"),
                    ("filter[processingState]", "VALID"),
                ]),
            )
            .await?;

        doc.data
            .into_iter()
            .next()
            .map(|build| BuildId(build.id))
            .ok_or_else(|| TestFlightError::NoMatchingBuild {
                app_id: reference.app_id.clone(),
                version: reference.version.clone(),
            })
    }

    pub async fn build_beta_details(&self, build_id: &BuildId) -> Result<BuildBetaDetails> {
        let doc: Document<Option<Resource<BuildBetaDetailAttributes>>> = self
            .get_document(
                &format!("buildBetaDetails/{}", build_id),
                RequestOptions::default(),
            )
            .await?;

        Ok(doc
            .data
            .and_then(|resource| resource.attributes)
            .map(BuildBetaDetails::from)
            .unwrap_or_default())
    }

    /// First beta localization attached to the build.
    pub async fn beta_build_localization_id(&self, build_id: &BuildId) -> Result<LocalizationId> {
        let doc: Document<Vec<Resource<BetaBuildLocalizationAttributes>>> = self
            .get_document(
                &format!("builds/{}/betaBuildLocalizations", build_id),
                RequestOptions::default(),
            )
            .await?;

        doc.data
            .into_iter()
            .next()
            .map(|localization| LocalizationId(localization.id))
            .ok_or_else(|| TestFlightError::NoLocalization {
                build_id: build_id.to_string(),
            })
    }

    /// Replace the "What to Test" notes of a localization.
    pub async fn update_whats_new(
        &self,
        localization_id: &LocalizationId,
        whats_new: &str,
    ) -> Result<()> {
        let update = ResourceUpdate {
            kind: ResourceType::BetaBuildLocalizations,
            id: localization_id.to_string(),
            attributes: WhatsNewUpdate {
                whats_new: whats_new.to_string(),
            },
        };
        self.request(
            HttpMethod::Patch,
            &format!("betaBuildLocalizations/{}", localization_id),
            RequestOptions::payload(&update)?,
        )
        .await?;
        Ok(())
    }

    pub async fn enable_auto_notify(&self, build_id: &BuildId) -> Result<()> {
        let update = ResourceUpdate {
            kind: ResourceType::BuildBetaDetails,
            id: build_id.to_string(),
            attributes: AutoNotifyUpdate {
                auto_notify_enabled: true,
            },
        };
        self.request(
            HttpMethod::Patch,
            &format!("buildBetaDetails/{}", build_id),
            RequestOptions::payload(&update)?,
        )
        .await?;
        Ok(())
    }

    /// External beta group of the app with the given name.
    pub async fn find_external_group(&self, app_id: &str, group_name: &str) -> Result<GroupId> {
        let doc: Document<Vec<Resource<BetaGroupAttributes>>> = self
            .get_document(
                "betaGroups",
                RequestOptions::query(&[
                    ("fields[apps]", "betaGroups"),
                    ("filter[app]", app_id),
                    ("filter[name]", group_name),
                    ("filter[isInternalGroup]", "false"),
                ]),
            )
            .await?;

        doc.data
            .into_iter()
            .next()
            .map(|group| GroupId(group.id))
            .ok_or_else(|| TestFlightError::NoMatchingGroup {
                app_id: app_id.to_string(),
                group_name: group_name.to_string(),
            })
    }

    pub async fn add_build_to_group(&self, group_id: &GroupId, build_id: &BuildId) -> Result<()> {
        let builds = vec![ResourceIdentifier::build(build_id)];
        self.request(
            HttpMethod::Post,
            &format!("betaGroups/{}/relationships/builds", group_id),
            RequestOptions::payload(&builds)?,
        )
        .await?;
        Ok(())
    }

    pub async fn submit_for_beta_review(&self, build_id: &BuildId) -> Result<()> {
        self.request(
            HttpMethod::Post,
            "betaAppReviewSubmissions",
            RequestOptions::payload(&BetaAppReviewSubmissionCreate::for_build(build_id))?,
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{CountingSigner, ManualClock, ScriptedTransport};
    use chrono::Duration;

    fn client() -> (AppStoreConnectClient, Arc<ScriptedTransport>, CountingSigner, Arc<ManualClock>) {
        let transport = Arc::new(ScriptedTransport::new());
        let signer = CountingSigner::new();
        let clock = Arc::new(ManualClock::default());
        let tokens = TokenManager::new(
            Credentials::new("issuer", "kid", "unused"),
            Box::new(signer.clone()),
        );
        let client = AppStoreConnectClient::with_parts(transport.clone(), tokens, clock.clone());
        (client, transport, signer, clock)
    }

    #[tokio::test]
    async fn test_mutating_request_wraps_payload() {
        let (client, transport, _, _) = client();
        let payload = json!({ "type": "builds", "id": "7" });
        client
            .request(
                HttpMethod::Patch,
                "builds/7",
                RequestOptions {
                    query: Vec::new(),
                    body: Some(payload.clone()),
                },
            )
            .await
            .unwrap();

        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body, Some(json!({ "data": payload })));
    }

    #[tokio::test]
    async fn test_absent_payload_still_enveloped() {
        let (client, transport, _, _) = client();
        client
            .request(HttpMethod::Post, "things", RequestOptions::default())
            .await
            .unwrap();
        assert_eq!(transport.requests()[0].body, Some(json!({ "data": null })));
    }

    #[tokio::test]
    async fn test_get_has_no_body_and_carries_token() {
        let (client, transport, signer, _) = client();
        client
            .request(
                HttpMethod::Get,
                "builds",
                RequestOptions::query(&[("filter[app]", "1")]),
            )
            .await
            .unwrap();

        let sent = &transport.requests()[0];
        assert!(sent.body.is_none());
        assert_eq!(sent.authorization, signer.token_for_call(1));
        assert!(!sent.authorization.starts_with("Bearer "));
        assert_eq!(
            sent.query,
            vec![("filter[app]".to_string(), "1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_two_requests_within_window_sign_once() {
        let (client, _, signer, clock) = client();
        client
            .request(HttpMethod::Get, "a", RequestOptions::default())
            .await
            .unwrap();
        clock.advance(Duration::seconds(120));
        client
            .request(HttpMethod::Get, "b", RequestOptions::default())
            .await
            .unwrap();
        assert_eq!(signer.calls(), 1);
    }

    #[tokio::test]
    async fn test_requests_spanning_window_sign_twice() {
        let (client, transport, signer, clock) = client();
        client
            .request(HttpMethod::Get, "a", RequestOptions::default())
            .await
            .unwrap();
        clock.advance(Duration::seconds(601));
        client
            .request(HttpMethod::Get, "b", RequestOptions::default())
            .await
            .unwrap();

        assert_eq!(signer.calls(), 2);
        let sent = transport.requests();
        assert_ne!(sent[0].authorization, sent[1].authorization);
    }

    #[tokio::test]
    async fn test_transport_error_propagates_unchanged() {
        let (client, transport, _, _) = client();
        transport.fail_with_status(HttpMethod::Get, "builds", 401, "NOT_AUTHORIZED");
        let err = client
            .request(HttpMethod::Get, "builds", RequestOptions::default())
            .await
            .unwrap_err();
        match err {
            TestFlightError::Http { status, body, .. } => {
                assert_eq!(status, 401);
                assert_eq!(body, "NOT_AUTHORIZED");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_beta_detail_attributes_read_as_unknown() {
        let (client, transport, _, _) = client();
        transport.respond(
            HttpMethod::Get,
            "buildBetaDetails/42",
            json!({ "data": { "type": "buildBetaDetails", "id": "42" } }),
        );
        let details = client.build_beta_details(&BuildId::from("42")).await.unwrap();
        assert!(details.external_build_state.is_none());
        assert!(details.internal_build_state.is_none());
    }
}
