//! One page of the `review/list` feed.

use bookshelf_shared::{BookshelfError, Result};
use tracing::warn;

use crate::xml::{self, XmlDocument, XmlNode};

/// The decoded subtree of a single `<review>` element.
///
/// Only the normalizer looks inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    node: XmlNode,
}

impl RawEntry {
    pub fn new(node: XmlNode) -> Self {
        Self { node }
    }

    pub fn node(&self) -> &XmlNode {
        &self.node
    }

    /// The review id, if the entry carries one. Used for error context.
    pub fn review_id(&self) -> Option<String> {
        self.node
            .child_text("id")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from)
    }
}

/// Result of fetching and decoding one page.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    /// Entries in feed order.
    pub entries: Vec<RawEntry>,
    /// 1-based position of the first entry (`reviews@start`), 0 when absent.
    pub reported_start: u64,
    /// Cumulative number of entries through this page (`reviews@end`).
    pub reported_end: u64,
    /// Total number of entries on the shelf (`reviews@total`).
    pub reported_total: u64,
}

impl FeedPage {
    /// Decode a raw payload and read the page out of it.
    pub fn parse(payload: &str) -> Result<Self> {
        Self::from_document(xml::decode(payload)?)
    }

    /// Read the page out of an already decoded `GoodreadsResponse` document.
    pub fn from_document(doc: XmlDocument) -> Result<Self> {
        let mut root = doc.root;
        let mut reviews = root.take_all("reviews").into_iter();
        let Some(mut reviews) = reviews.next() else {
            return Err(BookshelfError::normalize(format!(
                "<{}> has no <reviews> element",
                doc.root_name
            )));
        };

        let reported_start = match reviews.attr("start") {
            Some(_) => counter(&reviews, "start")?,
            None => 0,
        };
        let reported_end = counter(&reviews, "end")?;
        let reported_total = counter(&reviews, "total")?;

        let entries: Vec<RawEntry> = reviews
            .take_all("review")
            .into_iter()
            .map(RawEntry::new)
            .collect();

        let expected = reported_end.saturating_sub(reported_start.saturating_sub(1));
        if entries.len() as u64 != expected {
            warn!(
                entries = entries.len(),
                start = reported_start,
                end = reported_end,
                "entry count disagrees with the reported range"
            );
        }

        Ok(Self {
            entries,
            reported_start,
            reported_end,
            reported_total,
        })
    }

    /// Whether this is the final page of the feed.
    pub fn is_last(&self) -> bool {
        self.reported_end >= self.reported_total
    }
}

fn counter(reviews: &XmlNode, name: &str) -> Result<u64> {
    let raw = reviews.attr(name).ok_or_else(|| {
        BookshelfError::normalize(format!("<reviews> is missing the `{name}` attribute"))
    })?;
    raw.trim().parse().map_err(|_| {
        BookshelfError::normalize(format!("<reviews {name}={raw:?}> is not a count"))
    })
}
