//! The rendered result of a pipeline.
//!
//! A [`ResultView`] is plain data: the terminal adapter in `ui.rs` draws it
//! and [`ResultView::to_markup`] serializes it to the HTML fragment the
//! one-shot commands print. Renderers never touch the screen.

use html_escape::encode_text;

/// One activity feed entry, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityLine {
    /// `updated`, formatted for the reader's locale.
    pub when: String,
    /// Entry title as plain text (entities already decoded).
    pub title: String,
}

/// One issue from a JQL search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRow {
    pub id: String,
    pub key: String,
    pub status: String,
    /// `None` when the issue is unassigned.
    pub assignee: Option<String>,
    pub summary: String,
}

impl IssueRow {
    pub fn assignee_label(&self) -> &str {
        self.assignee.as_deref().unwrap_or("Unassigned")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultView {
    /// Non-empty activity feed, in document order.
    Activity(Vec<ActivityLine>),
    /// Non-empty search results, in response order.
    Issues(Vec<IssueRow>),
    /// Nothing matched; carries the message for the status line.
    Empty(String),
}

impl ResultView {
    pub fn len(&self) -> usize {
        match self {
            ResultView::Activity(lines) => lines.len(),
            ResultView::Issues(rows) => rows.len(),
            ResultView::Empty(_) => 0,
        }
    }

    /// The empty-state message, if this view has one.
    pub fn empty_message(&self) -> Option<&str> {
        match self {
            ResultView::Empty(msg) => Some(msg),
            _ => None,
        }
    }

    /// Serialize to an HTML fragment suitable for a results container.
    pub fn to_markup(&self) -> String {
        match self {
            ResultView::Activity(lines) => {
                let mut out = String::from("<ul>");
                for line in lines {
                    out.push_str("<li>");
                    out.push_str(&encode_text(&line.when));
                    out.push_str(" - ");
                    out.push_str(&encode_text(&line.title));
                    out.push_str("</li>");
                }
                out.push_str("</ul>");
                out
            }
            ResultView::Issues(rows) => {
                let mut out = String::from(
                    "<table><tr><th>Key</th><th>Status</th><th>Assignee</th><th>Summary</th></tr>",
                );
                for row in rows {
                    out.push_str(&format!(
                        "<tr data-id=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                        html_escape::encode_double_quoted_attribute(&row.id),
                        encode_text(&row.key),
                        encode_text(&row.status),
                        encode_text(row.assignee_label()),
                        encode_text(&row.summary),
                    ));
                }
                out.push_str("</table>");
                out
            }
            ResultView::Empty(msg) => format!("<p>{}</p>", encode_text(msg)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
