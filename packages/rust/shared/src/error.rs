//! Error types for Bookshelf.
//!
//! Library crates use [`BookshelfError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Bookshelf operations.
///
/// Every variant is fatal to a sync run. The `AtPage` / `AtEntry` wrappers
/// add location context without changing the underlying classification,
/// see [`BookshelfError::kind`].
#[derive(Debug, thiserror::Error)]
pub enum BookshelfError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Non-success HTTP status or transport failure while fetching a page.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Malformed XML payload.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A feed entry has an unexpected shape or an unparseable field.
    #[error("normalization error: {message}")]
    Normalize { message: String },

    /// A non-empty timestamp field could not be parsed.
    #[error("date parse error: field `{field}` has unparseable value {value:?}")]
    DateParse { field: String, value: String },

    /// The feed violated its pagination contract (e.g. a stalled `end` counter).
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// The node sink rejected a record.
    #[error("sink error: {0}")]
    Sink(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An error raised while processing a specific feed page.
    #[error("page {page}: {source}")]
    AtPage {
        page: u32,
        #[source]
        source: Box<BookshelfError>,
    },

    /// An error raised while normalizing a specific entry of a page.
    #[error("entry {index}{}: {source}", review_suffix(.review_id))]
    AtEntry {
        index: usize,
        review_id: Option<String>,
        #[source]
        source: Box<BookshelfError>,
    },
}

fn review_suffix(review_id: &Option<String>) -> String {
    review_id
        .as_deref()
        .map(|id| format!(" (review {id})"))
        .unwrap_or_default()
}

/// Classification of a [`BookshelfError`], ignoring location wrappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Fetch,
    Parse,
    Normalize,
    DateParse,
    Protocol,
    Sink,
    Io,
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BookshelfError>;

impl BookshelfError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a normalization error from any displayable message.
    pub fn normalize(msg: impl Into<String>) -> Self {
        Self::Normalize {
            message: msg.into(),
        }
    }

    /// Create a date parse error for `field` holding `value`.
    pub fn date_parse(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::DateParse {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a protocol error from any displayable message.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach the page number the error occurred on.
    pub fn at_page(self, page: u32) -> Self {
        Self::AtPage {
            page,
            source: Box::new(self),
        }
    }

    /// Attach the entry position (and review id, when known) the error occurred on.
    pub fn at_entry(self, index: usize, review_id: Option<String>) -> Self {
        Self::AtEntry {
            index,
            review_id,
            source: Box::new(self),
        }
    }

    /// The innermost error classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } => ErrorKind::Config,
            Self::Fetch(_) => ErrorKind::Fetch,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Normalize { .. } => ErrorKind::Normalize,
            Self::DateParse { .. } => ErrorKind::DateParse,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Sink(_) => ErrorKind::Sink,
            Self::Io { .. } => ErrorKind::Io,
            Self::AtPage { source, .. } | Self::AtEntry { source, .. } => source.kind(),
        }
    }
}
