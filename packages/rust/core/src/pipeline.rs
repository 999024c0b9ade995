//! End-to-end `sync` pipeline: fetch page → decode → normalize → commit, until
//! the feed reports that every entry has been seen.

use std::time::{Duration, Instant};

use tracing::{Span, debug, info, instrument};

use bookshelf_feed::{FeedPage, FeedSource, PageRequest};
use bookshelf_shared::{BookshelfError, FingerprintMode, NodeKind, Result, SyncSettings};

use crate::node::{Fingerprinter, build_node};
use crate::sink::NodeSink;

/// Configuration for the `sync_shelf` pipeline.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Goodreads user id. Absent or blank makes the sync a no-op.
    pub user_id: Option<String>,
    /// Shelf filter passed to the feed.
    pub shelf: String,
    /// Developer key, possibly empty.
    pub api_key: String,
    /// Record type to emit.
    pub kind: NodeKind,
    /// Fingerprint strategy.
    pub fingerprint: FingerprintMode,
}

impl From<&SyncSettings> for SyncConfig {
    fn from(settings: &SyncSettings) -> Self {
        Self {
            user_id: settings.user_id.clone(),
            shelf: settings.shelf.clone(),
            api_key: settings.api_key.clone(),
            kind: settings.kind,
            fingerprint: settings.fingerprint,
        }
    }
}

/// Result of a completed sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncResult {
    /// Number of feed pages fetched.
    pub pages_fetched: u32,
    /// Number of nodes handed to the sink.
    pub nodes_committed: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after a page has been fetched and decoded.
    fn page_fetched(&self, page: u32, reported_end: u64, reported_total: u64);
    /// Called after each node is committed; `committed` counts the run so far.
    fn node_committed(&self, id: &str, committed: usize);
    /// Called when the pipeline completes successfully.
    fn done(&self, result: &SyncResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_fetched(&self, _page: u32, _reported_end: u64, _reported_total: u64) {}
    fn node_committed(&self, _id: &str, _committed: usize) {}
    fn done(&self, _result: &SyncResult) {}
}

/// Run the full sync.
///
/// Pages are fetched strictly one after another; every entry of a page is
/// committed before the next page is requested. The first error of any kind
/// aborts the run. Nodes committed before the failure stay committed.
#[instrument(skip_all, fields(user_id = tracing::field::Empty, shelf = %config.shelf, kind = %config.kind))]
pub async fn sync_shelf<S, K>(
    config: &SyncConfig,
    source: &S,
    sink: &mut K,
    progress: &dyn ProgressReporter,
) -> Result<SyncResult>
where
    S: FeedSource,
    K: NodeSink + ?Sized,
{
    let start = Instant::now();

    let Some(user_id) = config
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
    else {
        info!("no Goodreads user id configured, nothing to sync");
        let result = SyncResult {
            elapsed: start.elapsed(),
            ..SyncResult::default()
        };
        progress.done(&result);
        return Ok(result);
    };
    Span::current().record("user_id", user_id);

    info!(fingerprint = %config.fingerprint, "starting shelf sync");
    progress.phase("Fetching Goodreads shelf");

    let fingerprinter = Fingerprinter::new(config.fingerprint, config.kind, user_id);
    let mut page_number: u32 = 1;
    let mut previous_end: u64 = 0;
    let mut nodes_committed: usize = 0;

    loop {
        let request = PageRequest {
            user_id,
            shelf: &config.shelf,
            api_key: &config.api_key,
            page: page_number,
        };

        let payload = source
            .fetch_page(&request)
            .await
            .map_err(|e| e.at_page(page_number))?;
        let page = FeedPage::parse(&payload).map_err(|e| e.at_page(page_number))?;

        info!(
            page = page_number,
            entries = page.entries.len(),
            end = page.reported_end,
            total = page.reported_total,
            "page fetched"
        );
        progress.page_fetched(page_number, page.reported_end, page.reported_total);

        for (index, entry) in page.entries.iter().enumerate() {
            let node = build_node(entry, config.kind, &fingerprinter)
                .map_err(|e| e.at_entry(index, entry.review_id()).at_page(page_number))?;
            let id = node.id.clone();

            sink.commit(node)
                .map_err(|e| e.at_entry(index, Some(id.clone())).at_page(page_number))?;
            nodes_committed += 1;

            debug!(%id, committed = nodes_committed, "node committed");
            progress.node_committed(&id, nodes_committed);
        }

        if page.is_last() {
            break;
        }

        // Without this the loop never ends on a feed whose `end` stops moving.
        if page.reported_end <= previous_end {
            return Err(BookshelfError::protocol(format!(
                "reported end {} did not advance past {previous_end} (total {})",
                page.reported_end, page.reported_total
            ))
            .at_page(page_number));
        }

        previous_end = page.reported_end;
        page_number += 1;
    }

    let result = SyncResult {
        pages_fetched: page_number,
        nodes_committed,
        elapsed: start.elapsed(),
    };

    info!(
        pages = result.pages_fetched,
        nodes = result.nodes_committed,
        duration_ms = result.elapsed.as_millis(),
        "shelf sync completed"
    );
    progress.done(&result);

    Ok(result)
}
