//! HTTP transport seam.
//!
//! [`Transport`] executes a fully-prepared [`ApiRequest`] (auth header and
//! body envelope already applied) and returns the parsed JSON response.
//! [`ReqwestTransport`] is the production implementation; tests use
//! `fakes::ScriptedTransport`.

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{Result, TestFlightError};

/// HTTP methods used against App Store Connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Methods whose body is wrapped in the `{"data": ...}` envelope.
    pub fn carries_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Patch | HttpMethod::Put)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A request ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Path relative to the configured base URL, e.g. `builds/42`.
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Complete JSON body, envelope included.
    pub body: Option<Value>,
    /// `Authorization` header value.
    pub authorization: String,
}

/// Executes prepared requests against App Store Connect.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request. Non-2xx responses become [`TestFlightError::Http`].
    async fn execute(&self, request: ApiRequest) -> Result<Value>;
}

/// `reqwest`-backed transport.
pub struct ReqwestTransport {
    base_url: Url,
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| TestFlightError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()?;

        Ok(ReqwestTransport {
            base_url,
            http_client,
        })
    }

    fn url_for(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TestFlightError::InvalidUrl(format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Value> {
        let url = self.url_for(&request.path)?;
        debug!(method = %request.method, %url, "sending App Store Connect request");

        let mut builder = self
            .http_client
            .request(request.method.into(), url)
            .header(reqwest::header::AUTHORIZATION, &request.authorization)
            .header(reqwest::header::ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                method = %request.method,
                path = %request.path,
                "App Store Connect request failed"
            );
            return Err(TestFlightError::Http {
                status: status.as_u16(),
                method: request.method.to_string(),
                path: request.path,
                body: text,
            });
        }

        // 204 No Content on relationship updates
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_body_rules() {
        assert!(HttpMethod::Post.carries_body());
        assert!(HttpMethod::Patch.carries_body());
        assert!(HttpMethod::Put.carries_body());
        assert!(!HttpMethod::Get.carries_body());
        assert!(!HttpMethod::Delete.carries_body());
    }

    #[test]
    fn test_url_joins_relative_path() {
        let config = ClientConfig::default().with_base_url(crate::config::DEFAULT_BASE_URL);
        let transport = ReqwestTransport::new(&config).unwrap();
        let url = transport.url_for("builds/42/betaBuildLocalizations").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.appstoreconnect.apple.com/v1/builds/42/betaBuildLocalizations"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let config = ClientConfig::default().with_base_url("not a url");
        assert!(matches!(
            ReqwestTransport::new(&config),
            Err(TestFlightError::InvalidUrl(_))
        ));
    }
}
