//! Activity feed pipeline.
//!
//! JIRA publishes a user's recent issue activity as an Atom document. This
//! module builds the stream URL for a user and renders the returned `<feed>`
//! into [`ActivityLine`]s.

use std::borrow::Cow;
use std::fmt::Display;

use atom_syndication::{Entry, Feed, Text, TextType};
use chrono::{DateTime, FixedOffset, Local, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{base, ActivityLine, Pipeline, QueryStyle, ResultView};
use crate::error::RenderError;
use crate::fetch::{Payload, ResponseType};

pub const FEED_MAX_RESULTS: u32 = 50;

pub const NO_ACTIVITY: &str = "There are no activity results.";

static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)</?[A-Za-z][^>]*>").expect("tag regex"));

/// Build the activity stream URL for `user`.
///
/// Returns `None` when there is no user to ask about, in which case no
/// request should be made. [`QueryStyle::Legacy`] only guards the missing
/// case and interpolates the user as-is, so reserved characters in the name
/// end up raw in the query string.
pub fn build_feed_url(host: &str, user: Option<&str>, style: QueryStyle) -> Option<String> {
    let user = user?;
    let user = match style {
        QueryStyle::Legacy => Cow::Borrowed(user),
        QueryStyle::Hardened => {
            let trimmed = user.trim();
            if trimmed.is_empty() {
                return None;
            }
            urlencoding::encode(trimmed)
        }
    };
    Some(format!(
        "{}/activity?streams=user+IS+{user}&providers=issues&maxResults={FEED_MAX_RESULTS}",
        base(host)
    ))
}

/// A single `<entry>` of the activity feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub updated: DateTime<FixedOffset>,
}

impl FeedEntry {
    fn from_atom(entry: &Entry) -> Self {
        Self {
            title: decode_title(entry.title()),
            updated: *entry.updated(),
        }
    }
}

/// Plain text of an Atom title. HTML and XHTML titles carry markup (JIRA
/// wraps user names in links), which is dropped before entities are decoded.
/// A `<` not followed by a letter opens no tag and stays as text.
fn decode_title(text: &Text) -> String {
    let plain = match text.r#type {
        TextType::Text => Cow::Borrowed(text.value.as_str()),
        TextType::Html | TextType::Xhtml => {
            let stripped = TAGS.replace_all(&text.value, "");
            Cow::Owned(html_escape::decode_html_entities(&stripped).into_owned())
        }
    };
    plain.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse the entries of an Atom document in document order.
pub fn parse_entries(xml: &str) -> Result<Vec<FeedEntry>, RenderError> {
    let feed = Feed::read_from(xml.as_bytes())
        .map_err(|e| RenderError::new(format!("Activity feed could not be read: {e}")))?;
    Ok(feed.entries().iter().map(FeedEntry::from_atom).collect())
}

/// Format a timestamp the way a browser's default `toLocaleString` does,
/// e.g. `1/1/2024, 12:00:00 AM`.
pub fn format_locale<Tz>(at: &DateTime<FixedOffset>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.with_timezone(tz).format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

/// Render a feed payload using the local time zone.
pub fn render_feed(payload: &Payload) -> Result<ResultView, RenderError> {
    render_feed_in(payload, &Local)
}

pub fn render_feed_in<Tz>(payload: &Payload, tz: &Tz) -> Result<ResultView, RenderError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let xml = match payload {
        Payload::Document(xml) => xml,
        Payload::Json(_) => return Err(RenderError::new("Activity feed was JSON, expected XML")),
        Payload::Empty => return Err(RenderError::new("Activity feed was empty")),
    };

    let lines: Vec<ActivityLine> = parse_entries(xml)?
        .into_iter()
        .map(|entry| ActivityLine {
            when: format_locale(&entry.updated, tz),
            title: entry.title,
        })
        .collect();

    if lines.is_empty() {
        return Ok(ResultView::Empty(NO_ACTIVITY.into()));
    }
    Ok(ResultView::Activity(lines))
}

/// The activity feed for one user.
pub struct FeedPipeline {
    url: String,
}

impl FeedPipeline {
    /// `None` when [`build_feed_url`] declines to build a request.
    pub fn new(host: &str, user: Option<&str>, style: QueryStyle) -> Option<Self> {
        build_feed_url(host, user, style).map(|url| Self { url })
    }
}

impl Pipeline for FeedPipeline {
    fn url(&self) -> &str {
        &self.url
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::Document
    }

    fn pending_status(&self) -> String {
        format!("Performing activity query for {}", self.url)
    }

    fn done_status(&self) -> String {
        format!("Activity query: {}", self.url)
    }

    fn render(&self, payload: &Payload) -> Result<ResultView, RenderError> {
        render_feed(payload)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const HOST: &str = "https://jira.secondlife.com";

    fn doc(xml: &str) -> Payload {
        Payload::Document(xml.to_string())
    }

    // -- URL building --------------------------------------------------------

    #[test]
    fn feed_url_contains_stream_for_user() {
        let url = build_feed_url(HOST, Some("nyx.linden"), QueryStyle::Legacy).unwrap();
        assert!(url.starts_with("https://jira.secondlife.com/activity?"));
        assert!(url.contains("streams=user+IS+nyx.linden&providers=issues&maxResults=50"));
        assert_eq!(url, build_feed_url(HOST, Some("nyx.linden"), QueryStyle::Hardened).unwrap());
    }

    #[test]
    fn missing_user_produces_no_url() {
        assert!(build_feed_url(HOST, None, QueryStyle::Legacy).is_none());
        assert!(build_feed_url(HOST, None, QueryStyle::Hardened).is_none());
        assert!(FeedPipeline::new(HOST, None, QueryStyle::Hardened).is_none());
    }

    #[test]
    fn legacy_only_guards_missing_user() {
        let url = build_feed_url(HOST, Some(""), QueryStyle::Legacy).unwrap();
        assert!(url.contains("streams=user+IS+&providers"));
        assert!(build_feed_url(HOST, Some("  "), QueryStyle::Hardened).is_none());
    }

    #[test]
    fn legacy_leaves_reserved_characters_raw() {
        // A '&' in the name splits the query string; kept for parity.
        let url = build_feed_url(HOST, Some("a&b c"), QueryStyle::Legacy).unwrap();
        assert!(url.contains("user+IS+a&b c&providers"));
    }

    #[test]
    fn hardened_percent_encodes_user() {
        let url = build_feed_url(HOST, Some("a&b c"), QueryStyle::Hardened).unwrap();
        assert!(url.contains("user+IS+a%26b%20c&providers"));
    }

    // -- title decoding ------------------------------------------------------

    #[test]
    fn html_title_drops_tags_and_decodes_entities() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title type="html">&lt;a href="https://jira.secondlife.com/users/nyx"&gt;Nyx Linden&lt;/a&gt;
      resolved SUN-12 &amp;amp; closed it</title>
    <updated>2024-01-01T00:00:00Z</updated>
  </entry>
</feed>"#;
        let entries = parse_entries(xml).unwrap();
        assert_eq!(entries[0].title, "Nyx Linden resolved SUN-12 & closed it");
    }

    #[test]
    fn html_title_keeps_bare_angle_brackets() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title type="html">Raise limit 1 &lt; 2 and 3 &gt; 2 for &lt;b&gt;SUN-7&lt;/b&gt;</title>
    <updated>2024-01-01T00:00:00Z</updated>
  </entry>
</feed>"#;
        assert_eq!(
            parse_entries(xml).unwrap()[0].title,
            "Raise limit 1 < 2 and 3 > 2 for SUN-7"
        );
    }

    #[test]
    fn text_title_keeps_angle_brackets() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry><title>a &lt; b</title><updated>2024-01-01T00:00:00Z</updated></entry>
</feed>"#;
        assert_eq!(parse_entries(xml).unwrap()[0].title, "a < b");
    }

    // -- rendering -----------------------------------------------------------

    #[test]
    fn renders_decoded_title_and_locale_date() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Activity Stream</title>
  <entry>
    <title>Fix &amp; Ship</title>
    <updated>2024-01-01T00:00:00Z</updated>
  </entry>
</feed>"#;
        let view = render_feed_in(&doc(xml), &Utc).unwrap();
        assert_eq!(
            view,
            ResultView::Activity(vec![ActivityLine {
                when: "1/1/2024, 12:00:00 AM".into(),
                title: "Fix & Ship".into(),
            }])
        );
        assert!(view.to_markup().contains("1/1/2024, 12:00:00 AM - Fix &amp; Ship"));
    }

    #[test]
    fn entries_keep_document_order() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry><title>older</title><updated>2023-05-01T10:00:00Z</updated></entry>
  <entry><title>newer</title><updated>2024-06-15T15:04:05Z</updated></entry>
</feed>"#;
        let ResultView::Activity(lines) = render_feed_in(&doc(xml), &Utc).unwrap() else {
            panic!("expected activity lines");
        };
        assert_eq!(lines[0].title, "older");
        assert_eq!(lines[1].title, "newer");
        assert_eq!(lines[1].when, "6/15/2024, 3:04:05 PM");
    }

    #[test]
    fn zero_entries_signals_empty_state() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>Activity Stream</title></feed>"#;
        assert_eq!(
            render_feed_in(&doc(xml), &Utc).unwrap(),
            ResultView::Empty(NO_ACTIVITY.into())
        );
    }

    #[test]
    fn missing_feed_root_is_a_render_error() {
        let xml = r#"<rss version="2.0"><channel><title>t</title></channel></rss>"#;
        let err = render_feed_in(&doc(xml), &Utc).unwrap_err();
        assert!(err.to_string().starts_with("Activity feed could not be read"));
    }

    #[test]
    fn non_document_payloads_are_render_errors() {
        assert!(render_feed(&Payload::Empty).is_err());
        assert!(render_feed(&Payload::Json(serde_json::json!({}))).is_err());
    }

    #[test]
    fn pipeline_statuses_mention_url() {
        let p = FeedPipeline::new(HOST, Some("nyx.linden"), QueryStyle::Hardened).unwrap();
        assert_eq!(p.response_type(), ResponseType::Document);
        assert_eq!(p.done_status(), format!("Activity query: {}", p.url()));
        assert!(p.pending_status().ends_with(p.url()));
    }
}
