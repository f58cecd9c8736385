// src/models/note.rs

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// A keypoint note as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Note {
    /// Same as the title; empty in hand-written files, filled from the file stem on load.
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub title: String,

    pub department: Option<String>,

    pub subcategory: Option<String>,

    /// Markdown text.
    #[serde(default)]
    pub content: String,

    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Accepts RFC 3339 timestamps as well as the naive ISO-8601 form
/// (`2025-03-01T12:30:00.123456`) found in older files, read as UTC.
/// Anything unparseable is treated as absent.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Note as returned to clients, with its markdown rendered to safe HTML.
#[derive(Debug, Serialize)]
pub struct NoteView {
    #[serde(flatten)]
    pub note: Note,
    pub html: String,
}

/// DTO for creating or editing a note. On edit, a changed title renames the note.
#[derive(Debug, Deserialize, Validate)]
pub struct NoteRequest {
    #[validate(
        length(max = 200),
        custom(function = validate_not_blank, message = "Title & content required")
    )]
    pub title: String,
    #[validate(length(max = 100))]
    pub department: Option<String>,
    #[validate(length(max = 100))]
    pub subcategory: Option<String>,
    #[validate(custom(function = validate_not_blank, message = "Title & content required"))]
    pub content: String,
}

fn validate_not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}
