//! JQL issue search pipeline.

use serde::Deserialize;

use super::{base, IssueRow, Pipeline, QueryStyle, ResultView};
use crate::error::RenderError;
use crate::fetch::{Payload, ResponseType};

pub const SEARCH_FIELDS: &str = "id,status,key,assignee,summary";
pub const SEARCH_MAX_RESULTS: u32 = 100;

pub const NO_ISSUES: &str = "There are no search results.";

/// Build the search URL for issues of `project` that have sat in `status`
/// for more than `days_past` days.
///
/// [`QueryStyle::Legacy`] emits the JQL template with its `${…}` placeholders
/// left in, exactly as the browser popup sent it.
pub fn build_search_url(
    host: &str,
    project: &str,
    status: &str,
    days_past: &str,
    style: QueryStyle,
) -> String {
    let jql = match style {
        QueryStyle::Legacy => {
            "project=${project}+and+status=${status}+and+status+changed+to+${status}+before+-${inStatusFor}d"
                .to_string()
        }
        QueryStyle::Hardened => {
            let project = jql_string(project);
            let status = jql_string(status);
            let days = urlencoding::encode(days_past.trim());
            format!(
                "project={project}+and+status={status}+and+status+changed+to+{status}+before+-{days}d"
            )
        }
    };
    format!(
        "{}/rest/api/2/search?jql={jql}&fields={SEARCH_FIELDS}&maxresults={SEARCH_MAX_RESULTS}",
        base(host)
    )
}

/// A quoted JQL string literal, percent-encoded for the query string.
fn jql_string(value: &str) -> String {
    let quoted = format!("\"{}\"", value.trim().replace('\\', "\\\\").replace('"', "\\\""));
    urlencoding::encode(&quoted).into_owned()
}

// ---------------------------------------------------------------------------
// Response shape (`/rest/api/2/search`)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    issues: Option<Vec<RawIssue>>,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    #[serde(default)]
    id: String,
    key: String,
    #[serde(default)]
    fields: RawFields,
}

#[derive(Debug, Default, Deserialize)]
struct RawFields {
    status: Option<Named>,
    assignee: Option<Person>,
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Person {
    #[serde(rename = "displayName")]
    display_name: Option<String>,
    name: Option<String>,
}

impl From<RawIssue> for IssueRow {
    fn from(raw: RawIssue) -> Self {
        let RawFields { status, assignee, summary } = raw.fields;
        IssueRow {
            id: raw.id,
            key: raw.key,
            status: status.map(|s| s.name).unwrap_or_default(),
            assignee: assignee.and_then(|p| p.display_name.or(p.name)),
            summary: summary.unwrap_or_default(),
        }
    }
}

/// Turn a search response into issue rows. API-level errors never get here;
/// the fetch wrapper has already turned `errorMessages` into a failure.
pub fn render_search_results(payload: &Payload) -> Result<ResultView, RenderError> {
    let value = match payload {
        Payload::Json(value) => value,
        Payload::Document(_) | Payload::Empty => {
            return Err(RenderError::new("Search response was not JSON"))
        }
    };

    let response = SearchResponse::deserialize(value)
        .map_err(|e| RenderError::new(format!("Unexpected search response: {e}")))?;
    let issues = response
        .issues
        .ok_or_else(|| RenderError::new("Search response has no issues"))?;

    if issues.is_empty() {
        return Ok(ResultView::Empty(NO_ISSUES.into()));
    }
    Ok(ResultView::Issues(issues.into_iter().map(IssueRow::from).collect()))
}

/// A saved project/status filter.
pub struct SearchPipeline {
    url: String,
}

impl SearchPipeline {
    pub fn new(host: &str, project: &str, status: &str, days_past: &str, style: QueryStyle) -> Self {
        Self {
            url: build_search_url(host, project, status, days_past, style),
        }
    }
}

impl Pipeline for SearchPipeline {
    fn url(&self) -> &str {
        &self.url
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::Json
    }

    fn pending_status(&self) -> String {
        format!("Performing JIRA search for {}", self.url)
    }

    fn done_status(&self) -> String {
        format!("Query term: {}", self.url)
    }

    fn render(&self, payload: &Payload) -> Result<ResultView, RenderError> {
        render_search_results(payload)
    }
}
