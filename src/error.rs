//! Error types surfaced by the fetch and render stages.
//!
//! Every variant's `Display` is the text shown on the status line, so the
//! controller can flatten any failure with `format!("ERROR. {e}")`.

use thiserror::Error;

/// Message used when the session is missing or expired.
pub const AUTH_MESSAGE: &str = "You must be logged in to JIRA to see this project.";

/// Message used for transport-level failures.
pub const NETWORK_MESSAGE: &str = "Network Error";

/// Failure classes produced by [`crate::fetch`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The upstream API reported a domain error in its `errorMessages`.
    #[error("{0}")]
    Api(String),

    /// The request never produced a response (DNS, connection refused, …).
    #[error("{}", NETWORK_MESSAGE)]
    Network,

    /// The server answered 401.
    #[error("{}", AUTH_MESSAGE)]
    Auth,
}

/// The payload reached a renderer but did not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct RenderError(pub String);

impl RenderError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Anything that can end a user action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Render(#[from] RenderError),
}
