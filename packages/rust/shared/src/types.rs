//! Core domain records produced by a shelf sync.
//!
//! Field names serialize in camelCase so the JSON written by sinks keeps the
//! node shape static-site hosts expect (`reviewID`, `bookID`, `shelfNames`, ...).

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::BookshelfError;

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

/// A user's review of one book, as published on their shelf list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Feed-assigned review identifier (globally unique).
    #[serde(rename = "reviewID")]
    pub review_id: String,
    /// Star rating, `0` when unrated.
    pub rating: i64,
    pub votes: i64,
    pub spoiler_flag: String,
    pub spoilers_state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_added: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_updated: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<FixedOffset>>,
    /// Shelves this review is filed under.
    #[serde(default)]
    pub shelves: BTreeSet<String>,
}

// ---------------------------------------------------------------------------
// Book / Author
// ---------------------------------------------------------------------------

/// The reviewed book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(rename = "bookID")]
    pub book_id: String,
    /// Present only when the feed value is purely numeric.
    #[serde(default)]
    pub isbn: Option<String>,
    /// Present only when the feed value is purely numeric.
    #[serde(default)]
    pub isbn13: Option<String>,
    pub text_reviews_count: i64,
    pub uri: String,
    pub link: String,
    pub title: String,
    pub title_without_series: String,
    pub image_url: String,
    pub small_image_url: String,
    pub large_image_url: String,
    pub description: String,
    #[serde(default)]
    pub authors: Vec<Author>,
}

/// One author credited on a [`Book`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: String,
    pub link: String,
    pub image_url: String,
    pub small_image_url: String,
    pub average_rating: f64,
    pub ratings_count: i64,
    pub text_reviews_count: i64,
}

// ---------------------------------------------------------------------------
// NodeKind / FingerprintMode
// ---------------------------------------------------------------------------

/// Which record type a sync emits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Review-shelf record (`GoodreadsShelf`).
    #[default]
    Shelf,
    /// Full-book record (`GoodreadsBook`).
    Book,
}

impl NodeKind {
    /// Node type name used by the content-graph host.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Shelf => "GoodreadsShelf",
            Self::Book => "GoodreadsBook",
        }
    }

    /// Short lowercase name, also used as the run-constant fingerprint prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shelf => "shelf",
            Self::Book => "book",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = BookshelfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shelf" => Ok(Self::Shelf),
            "book" => Ok(Self::Book),
            other => Err(BookshelfError::config(format!(
                "unknown node kind '{other}': expected 'shelf' or 'book'"
            ))),
        }
    }
}

/// What the content fingerprint of a node is computed over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FingerprintMode {
    /// Digest of `"<kind><user id>"`: identical for every node of a run.
    #[default]
    RunConstant,
    /// Digest of the serialized record, so changed records get new fingerprints.
    Content,
}

impl fmt::Display for FingerprintMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunConstant => f.write_str("run-constant"),
            Self::Content => f.write_str("content"),
        }
    }
}

impl FromStr for FingerprintMode {
    type Err = BookshelfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "run-constant" => Ok(Self::RunConstant),
            "content" => Ok(Self::Content),
            other => Err(BookshelfError::config(format!(
                "unknown fingerprint mode '{other}': expected 'run-constant' or 'content'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// ContentNode
// ---------------------------------------------------------------------------

/// The unit committed to a node sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentNode {
    /// Stable identity, equal to [`Review::review_id`].
    pub id: String,
    /// Shelf names in feed order.
    pub shelf_names: Vec<String>,
    pub review: Review,
    pub book: Book,
    pub kind: NodeKind,
    /// Host node type, [`NodeKind::type_name`] of `kind`.
    #[serde(rename = "type")]
    pub node_type: String,
    /// Hex SHA-256 content digest.
    pub fingerprint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_review() -> Review {
        Review {
            review_id: "1001".into(),
            rating: 4,
            votes: 0,
            spoiler_flag: "false".into(),
            spoilers_state: "none".into(),
            date_added: DateTime::parse_from_rfc3339("2019-01-01T10:20:30-08:00").ok(),
            date_updated: None,
            started_at: None,
            read_at: None,
            shelves: BTreeSet::from(["read".to_string()]),
        }
    }

    #[test]
    fn review_serializes_camel_case() {
        let json = serde_json::to_value(sample_review()).expect("serialize");
        assert_eq!(json["reviewID"], "1001");
        assert_eq!(json["spoilerFlag"], "false");
        assert_eq!(json["dateAdded"], "2019-01-01T10:20:30-08:00");
        // Absent timestamps are omitted rather than written as null.
        assert!(json.get("readAt").is_none());
    }

    #[test]
    fn node_kind_parsing() {
        assert_eq!("shelf".parse::<NodeKind>().unwrap(), NodeKind::Shelf);
        assert_eq!("book".parse::<NodeKind>().unwrap(), NodeKind::Book);
        assert!("shelves".parse::<NodeKind>().is_err());
        assert_eq!(NodeKind::Book.type_name(), "GoodreadsBook");
    }

    #[test]
    fn fingerprint_mode_roundtrip() {
        for mode in [FingerprintMode::RunConstant, FingerprintMode::Content] {
            let parsed: FingerprintMode = mode.to_string().parse().unwrap();
            assert_eq!(parsed, mode);
        }
    }
}
