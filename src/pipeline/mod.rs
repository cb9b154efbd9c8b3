//! Query pipelines: build a URL, fetch it, render the payload.
//!
//! This module defines the [`Pipeline`] trait and the shared [`ResultView`]
//! type. The two concrete pipelines live in sub-modules: [`feed`] (the Atom
//! activity stream) and [`search`] (JQL issue search).
//!
//! ## For contributors — adding a new pipeline
//!
//! 1. Create a new file in this directory (e.g. `filters.rs`).
//! 2. Write a `build_*_url` function and a `render_*` function that turns a
//!    [`Payload`] into a [`ResultView`].
//! 3. Define a struct holding the built URL and implement [`Pipeline`].
//! 4. Bind it to a key in `input.rs`.
//!
//! The dispatcher, status line and result list are pipeline-agnostic.

pub mod feed;
pub mod search;
mod view;

pub use feed::FeedPipeline;
pub use search::SearchPipeline;
pub use view::{ActivityLine, IssueRow, ResultView};

use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::fetch::{Payload, ResponseType};

/// How user-supplied values are placed into request URLs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStyle {
    /// Percent-encode every interpolated value and substitute JQL values.
    #[default]
    Hardened,
    /// The browser popup's interpolation: the feed user is not encoded and
    /// the JQL placeholders are never substituted. Parameter order follows
    /// the hardened URLs.
    Legacy,
}

/// One user action: a fixed request plus the renderer for its answer.
///
/// Pipelines run on the async runtime, so implementations must be
/// [`Send`] + [`Sync`].
pub trait Pipeline: Send + Sync {
    /// The request URL, built once at construction.
    fn url(&self) -> &str;

    fn response_type(&self) -> ResponseType;

    /// Status line shown while the request is outstanding.
    fn pending_status(&self) -> String;

    /// Status line shown once the result has been rendered.
    fn done_status(&self) -> String;

    /// Turn a successful payload into something displayable.
    fn render(&self, payload: &Payload) -> Result<ResultView, RenderError>;
}

/// `https://host/` and `https://host` both yield `https://host`.
pub(crate) fn base(host: &str) -> &str {
    host.trim_end_matches('/')
}

/// Endpoint used to check that the session can see the project.
pub fn probe_url(host: &str, project_key: &str) -> String {
    format!("{}/rest/api/2/project/{}", base(host), urlencoding::encode(project_key))
}
