//! In-memory fakes for the client seams (testing only)
//!
//! Provides `ScriptedTransport`, `CountingSigner`, `FailingSigner`, and
//! `ManualClock` so the publish flow can be exercised without network access
//! or a real signing key.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::Header;
use serde_json::Value;

use crate::error::{Result, TestFlightError};
use crate::token::{Claims, Clock, TokenSigner};
use crate::transport::{ApiRequest, HttpMethod, Transport};

// ---------------------------------------------------------------------------
// ScriptedTransport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Scripted {
    Respond(Value),
    Fail { status: u16, body: String },
}

/// Transport that records every request and replays queued responses.
///
/// Responses are keyed by `(method, path)` and consumed in FIFO order; the
/// last queued response for a key is reused once the queue would otherwise
/// run dry. Unscripted requests answer `null`.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<HashMap<(HttpMethod, String), VecDeque<Scripted>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful JSON response.
    pub fn respond(&self, method: HttpMethod, path: &str, body: Value) {
        self.push(method, path, Scripted::Respond(body));
    }

    /// Queue a non-2xx response.
    pub fn fail_with_status(&self, method: HttpMethod, path: &str, status: u16, body: &str) {
        self.push(
            method,
            path,
            Scripted::Fail {
                status,
                body: body.to_string(),
            },
        );
    }

    fn push(&self, method: HttpMethod, path: &str, entry: Scripted) {
        let mut script = self.script.lock().unwrap();
        script
            .entry((method, path.to_string()))
            .or_default()
            .push_back(entry);
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests received for `(method, path)`.
    pub fn calls_to(&self, method: HttpMethod, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    /// `"METHOD path"` for every request, in order.
    pub fn call_log(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Value> {
        self.requests.lock().unwrap().push(request.clone());

        let next = {
            let mut script = self.script.lock().unwrap();
            match script.get_mut(&(request.method, request.path.clone())) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match next {
            Some(Scripted::Respond(body)) => Ok(body),
            Some(Scripted::Fail { status, body }) => Err(TestFlightError::Http {
                status,
                method: request.method.to_string(),
                path: request.path,
                body,
            }),
            None => Ok(Value::Null),
        }
    }
}

// ---------------------------------------------------------------------------
// Signers
// ---------------------------------------------------------------------------

/// Signer that counts invocations and returns `token-<n>`.
#[derive(Debug, Clone, Default)]
pub struct CountingSigner {
    signed: Arc<Mutex<Vec<(Header, Claims)>>>,
}

impl CountingSigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.signed.lock().unwrap().len()
    }

    /// Header and claims of the most recent signature.
    pub fn last(&self) -> Option<(Header, Claims)> {
        self.signed.lock().unwrap().last().cloned()
    }

    /// Token value produced by the `n`th call (1-based).
    pub fn token_for_call(&self, n: usize) -> String {
        format!("token-{}", n)
    }
}

impl TokenSigner for CountingSigner {
    fn sign(&self, header: &Header, claims: &Claims) -> Result<String> {
        let mut signed = self.signed.lock().unwrap();
        signed.push((header.clone(), claims.clone()));
        Ok(self.token_for_call(signed.len()))
    }
}

/// Signer that always fails.
#[derive(Debug, Clone, Default)]
pub struct FailingSigner;

impl TokenSigner for FailingSigner {
    fn sign(&self, _header: &Header, _claims: &Claims) -> Result<String> {
        Err(TestFlightError::Signing("unsupported curve".to_string()))
    }
}

// ---------------------------------------------------------------------------
// ManualClock
// ---------------------------------------------------------------------------

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        ManualClock {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
