//! Building content nodes and their fingerprints.

use bookshelf_feed::{NormalizedEntry, RawEntry, normalize_entry};
use bookshelf_shared::{
    Book, BookshelfError, ContentNode, FingerprintMode, NodeKind, Result, Review,
};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Computes node fingerprints for one sync run.
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    mode: FingerprintMode,
    run_digest: String,
}

/// The fields a content fingerprint covers.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FingerprintInput<'a> {
    shelf_names: &'a [String],
    review: &'a Review,
    book: &'a Book,
}

impl Fingerprinter {
    pub fn new(mode: FingerprintMode, kind: NodeKind, user_id: &str) -> Self {
        Self {
            mode,
            run_digest: sha256_hex(format!("{}{user_id}", kind.as_str()).as_bytes()),
        }
    }

    /// Fingerprint for one normalized entry.
    pub fn fingerprint(&self, entry: &NormalizedEntry) -> Result<String> {
        match self.mode {
            FingerprintMode::RunConstant => Ok(self.run_digest.clone()),
            FingerprintMode::Content => {
                let input = FingerprintInput {
                    shelf_names: &entry.shelf_names,
                    review: &entry.review,
                    book: &entry.book,
                };
                let bytes = serde_json::to_vec(&input).map_err(|e| {
                    BookshelfError::normalize(format!("cannot serialize record: {e}"))
                })?;
                Ok(sha256_hex(&bytes))
            }
        }
    }
}

/// Normalize one feed entry into a content node of the given kind.
pub fn build_node(
    entry: &RawEntry,
    kind: NodeKind,
    fingerprinter: &Fingerprinter,
) -> Result<ContentNode> {
    let normalized = normalize_entry(entry)?;
    let fingerprint = fingerprinter.fingerprint(&normalized)?;
    let NormalizedEntry {
        shelf_names,
        review,
        book,
    } = normalized;

    Ok(ContentNode {
        id: review.review_id.clone(),
        shelf_names,
        review,
        book,
        kind,
        node_type: kind.type_name().to_string(),
        fingerprint,
    })
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
