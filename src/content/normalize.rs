//! Turns loosely-typed API documents into strict post shapes
//!
//! This is the only place where untrusted JSON is interpreted. Optional
//! fields fall back to defaults; required ones are rejected with
//! [`Error::MalformedDocument`].

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::post::{Banner, ContentSection, PaginatedPosts, Post, PostDetail};
use super::richtext::RichText;
use crate::client::{RawDocument, RawPage};
use crate::error::{Error, Result};

/// Normalize a listing document
pub fn normalize_post(doc: &RawDocument) -> Result<Post> {
    let first_publication_date = doc
        .first_publication_date
        .as_deref()
        .map(|raw| parse_publication_date(raw).map_err(|e| malformed(doc, &e)))
        .transpose()?;

    Ok(Post {
        id: doc.id.clone(),
        uid: doc.uid.clone(),
        first_publication_date,
        title: required_text(doc, "title")?,
        subtitle: text_field(doc.data.get("subtitle")).unwrap_or_default(),
        author: required_text(doc, "author")?,
    })
}

/// Normalize a document for its own page
pub fn normalize_post_detail(doc: &RawDocument) -> Result<PostDetail> {
    let post = normalize_post(doc)?;

    let banner = match doc.data.get("banner") {
        Some(Value::Object(banner)) => Banner {
            url: banner
                .get("url")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            alt: banner.get("alt").and_then(Value::as_str).map(str::to_string),
        },
        _ => Banner::default(),
    };

    let content = match doc.data.get("content") {
        Some(Value::Array(sections)) => sections
            .iter()
            .map(|section| normalize_section(doc, section))
            .collect::<Result<Vec<_>>>()?,
        _ => Vec::new(),
    };

    Ok(PostDetail {
        post,
        banner,
        content,
    })
}

/// Normalize every document of a page, keeping API order
pub fn normalize_page(page: &RawPage) -> Result<PaginatedPosts> {
    Ok(PaginatedPosts {
        next_page: page.next_page.clone(),
        results: page
            .results
            .iter()
            .map(normalize_post)
            .collect::<Result<Vec<_>>>()?,
    })
}

/// Parse a publication timestamp such as `2021-03-15T19:25:28+0000`
pub fn parse_publication_date(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|date| date.with_timezone(&Utc))
        .map_err(|e| format!("invalid publication date {:?}: {}", raw, e))
}

fn normalize_section(doc: &RawDocument, section: &Value) -> Result<ContentSection> {
    let heading = text_field(section.get("heading")).unwrap_or_default();
    let body = match section.get("body") {
        Some(body @ Value::Array(_)) => RichText::deserialize(body)
            .map_err(|e| malformed(doc, &format!("invalid body under {:?}: {}", heading, e)))?,
        _ => RichText::default(),
    };
    Ok(ContentSection { heading, body })
}

/// Accept plain strings, and rich-text fields flattened to their text
fn text_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Array(blocks) => {
            let parts: Vec<&str> = blocks
                .iter()
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" "))
            }
        }
        _ => None,
    }
}

fn required_text(doc: &RawDocument, field: &str) -> Result<String> {
    text_field(doc.data.get(field))
        .ok_or_else(|| malformed(doc, &format!("missing or non-text field {:?}", field)))
}

fn malformed(doc: &RawDocument, reason: &str) -> Error {
    let name = doc
        .uid
        .as_deref()
        .or(doc.id.as_deref())
        .unwrap_or("<unidentified>");
    Error::MalformedDocument(format!("{}: {}", name, reason))
}
