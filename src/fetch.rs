//! The HTTP fetch wrapper.
//!
//! A request is modelled the way a browser `XMLHttpRequest` reports it: a
//! ready-state change when the response completes, then a load event, or an
//! error event when the transport fails. Each callback may try to settle the
//! request; an [`Exchange`] keeps the first settlement and ignores the rest.
//!
//! ```text
//! send() ──► on_ready_state_change(Done, 401) ──┐
//!        ──► on_load(body) ─────────────────────┼──► OnceLock<Outcome>  (first wins)
//!        ──► on_error() ────────────────────────┘
//! ```

use std::sync::OnceLock;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::FetchError;

/// How the body of a completed response is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    /// Keep the body as a markup document (the activity feed).
    Document,
    /// Parse the body as JSON (the REST endpoints).
    Json,
}

/// The body of a successful request.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Document(String),
    /// The body was empty or could not be read as the requested type.
    Empty,
}

/// Exactly one of these is produced per request.
pub type Outcome = std::result::Result<Payload, FetchError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Opened,
    Loading,
    Done,
}

impl Payload {
    fn select(response_type: ResponseType, body: &[u8]) -> Self {
        if body.is_empty() {
            return Payload::Empty;
        }
        match response_type {
            ResponseType::Json => serde_json::from_slice(body)
                .map(Payload::Json)
                .unwrap_or(Payload::Empty),
            ResponseType::Document => Payload::Document(String::from_utf8_lossy(body).into_owned()),
        }
    }

    /// The first entry of a non-empty `errorMessages` array, if the payload
    /// carries one. Document bodies are sniffed as JSON since JIRA answers
    /// errors in JSON whatever was asked for.
    pub fn first_error_message(&self) -> Option<String> {
        match self {
            Payload::Json(value) => first_error_in(value),
            Payload::Document(body) => serde_json::from_str::<Value>(body)
                .ok()
                .as_ref()
                .and_then(first_error_in),
            Payload::Empty => None,
        }
    }
}

fn first_error_in(value: &Value) -> Option<String> {
    let first = value.get("errorMessages")?.as_array()?.first()?;
    Some(match first {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// One in-flight request and its single-assignment result cell.
#[derive(Debug)]
pub struct Exchange {
    response_type: ResponseType,
    settled: OnceLock<Outcome>,
}

impl Exchange {
    pub fn new(response_type: ResponseType) -> Self {
        Self {
            response_type,
            settled: OnceLock::new(),
        }
    }

    /// Settles as [`FetchError::Auth`] when the request is done with a 401.
    /// Returns whether this call settled the exchange.
    pub fn on_ready_state_change(&self, state: ReadyState, status: u16) -> bool {
        if state == ReadyState::Done && status == 401 {
            return self.settle(Err(FetchError::Auth));
        }
        false
    }

    pub fn on_load(&self, body: &[u8]) -> bool {
        let payload = Payload::select(self.response_type, body);
        let outcome = match payload.first_error_message() {
            Some(message) => Err(FetchError::Api(message)),
            None => Ok(payload),
        };
        self.settle(outcome)
    }

    pub fn on_error(&self) -> bool {
        self.settle(Err(FetchError::Network))
    }

    fn settle(&self, outcome: Outcome) -> bool {
        match self.settled.set(outcome) {
            Ok(()) => true,
            Err(late) => {
                debug!(?late, "exchange already settled, ignoring");
                false
            }
        }
    }

    /// Consumes the exchange. An exchange no callback ever settled counts as
    /// a transport failure.
    pub fn into_outcome(self) -> Outcome {
        self.settled
            .into_inner()
            .unwrap_or(Err(FetchError::Network))
    }
}

/// Build the shared HTTP client. The session cookie, when configured, rides
/// on every request the way a browser attaches its cookies.
pub fn build_client(session_cookie: Option<&str>) -> Result<Client> {
    let mut headers = HeaderMap::new();
    if let Some(cookie) = session_cookie.filter(|c| !c.is_empty()) {
        let value = HeaderValue::from_str(cookie).context("session cookie is not a valid header value")?;
        headers.insert(COOKIE, value);
    }
    Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .build()
        .context("building HTTP client")
}

/// Issue one GET and classify the result.
pub async fn fetch(client: &Client, url: &str, response_type: ResponseType) -> Outcome {
    debug!(url, ?response_type, "GET");
    let exchange = Exchange::new(response_type);
    exchange.on_ready_state_change(ReadyState::Opened, 0);

    match client.get(url).send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            exchange.on_ready_state_change(ReadyState::Loading, status);
            match response.bytes().await {
                Ok(body) => {
                    exchange.on_ready_state_change(ReadyState::Done, status);
                    exchange.on_load(&body);
                }
                Err(e) => {
                    warn!(url, error = %e, "reading response body failed");
                    exchange.on_error();
                }
            }
        }
        Err(e) => {
            warn!(url, error = %e, "request failed");
            exchange.on_error();
        }
    }

    let outcome = exchange.into_outcome();
    match &outcome {
        Ok(_) => debug!(url, "request succeeded"),
        Err(e) => warn!(url, error = %e, "request settled with an error"),
    }
    outcome
}
