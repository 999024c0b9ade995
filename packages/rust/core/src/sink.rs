//! Node sinks: where normalized content nodes end up.
//!
//! A sink is idempotent on `(kind, id)`: committing a node whose key was
//! already committed replaces the earlier record.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bookshelf_shared::{BookshelfError, ContentNode, NodeKind, Result};
use tracing::debug;

/// Receiver of committed content nodes.
pub trait NodeSink {
    /// Commit one node, replacing any previous node with the same kind and id.
    fn commit(&mut self, node: ContentNode) -> Result<()>;
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// In-memory sink preserving first-commit order.
#[derive(Debug, Default)]
pub struct MemorySink {
    nodes: Vec<ContentNode>,
    index: HashMap<(NodeKind, String), usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed nodes, in the order their keys were first seen.
    pub fn nodes(&self) -> &[ContentNode] {
        &self.nodes
    }

    pub fn get(&self, kind: NodeKind, id: &str) -> Option<&ContentNode> {
        self.index
            .get(&(kind, id.to_string()))
            .map(|&i| &self.nodes[i])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl NodeSink for MemorySink {
    fn commit(&mut self, node: ContentNode) -> Result<()> {
        let key = (node.kind, node.id.clone());
        match self.index.get(&key) {
            Some(&i) => self.nodes[i] = node,
            None => {
                self.index.insert(key, self.nodes.len());
                self.nodes.push(node);
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DirectorySink
// ---------------------------------------------------------------------------

/// Writes each node to `<root>/<kind>/<id>.json`.
///
/// Files are written to a temporary name and renamed into place, so a
/// re-run replaces records without leaving partial files behind.
#[derive(Debug)]
pub struct DirectorySink {
    root: PathBuf,
    written: usize,
}

impl DirectorySink {
    /// Create the sink, creating `root` if needed.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| BookshelfError::io(&root, e))?;
        Ok(Self { root, written: 0 })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of files written by this sink.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Path a node with this kind and id is stored at.
    pub fn node_path(&self, kind: NodeKind, id: &str) -> Result<PathBuf> {
        if id.is_empty()
            || !id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(BookshelfError::Sink(format!(
                "node id {id:?} is not usable as a file name"
            )));
        }
        Ok(self.root.join(kind.as_str()).join(format!("{id}.json")))
    }
}

impl NodeSink for DirectorySink {
    fn commit(&mut self, node: ContentNode) -> Result<()> {
        let target = self.node_path(node.kind, &node.id)?;
        let dir = self.root.join(node.kind.as_str());
        std::fs::create_dir_all(&dir).map_err(|e| BookshelfError::io(&dir, e))?;

        let json = serde_json::to_string_pretty(&node)
            .map_err(|e| BookshelfError::Sink(format!("JSON serialization failed: {e}")))?;

        let temp = dir.join(format!(".{}.json.tmp", node.id));
        std::fs::write(&temp, &json).map_err(|e| BookshelfError::io(&temp, e))?;
        if let Err(e) = std::fs::rename(&temp, &target) {
            let _ = std::fs::remove_file(&temp);
            return Err(BookshelfError::io(&target, e));
        }

        self.written += 1;
        debug!(path = %target.display(), size = json.len(), "wrote node");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::tests::sample_node;
    use bookshelf_shared::ErrorKind;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("bookshelf-sink-test-{}", uuid::Uuid::now_v7()))
    }

    #[test]
    fn memory_sink_replaces_same_identity() {
        let mut sink = MemorySink::new();
        sink.commit(sample_node("1", NodeKind::Shelf)).unwrap();
        sink.commit(sample_node("2", NodeKind::Shelf)).unwrap();

        let mut updated = sample_node("1", NodeKind::Shelf);
        updated.review.rating = 1;
        sink.commit(updated).unwrap();

        assert_eq!(sink.len(), 2);
        let ids: Vec<&str> = sink.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(sink.get(NodeKind::Shelf, "1").unwrap().review.rating, 1);
    }

    #[test]
    fn memory_sink_keys_on_kind() {
        let mut sink = MemorySink::new();
        sink.commit(sample_node("1", NodeKind::Shelf)).unwrap();
        sink.commit(sample_node("1", NodeKind::Book)).unwrap();
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn directory_sink_writes_and_replaces() {
        let tmp = temp_dir();
        let mut sink = DirectorySink::create(&tmp).unwrap();

        sink.commit(sample_node("1001", NodeKind::Shelf)).unwrap();
        let mut updated = sample_node("1001", NodeKind::Shelf);
        updated.book.title = "Second Edition".into();
        sink.commit(updated).unwrap();

        let path = tmp.join("shelf/1001.json");
        let stored: ContentNode =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(stored.book.title, "Second Edition");
        assert_eq!(stored.node_type, "GoodreadsShelf");
        assert_eq!(sink.written(), 2);

        // No temp files left behind
        for entry in std::fs::read_dir(tmp.join("shelf")).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().to_string();
            assert!(!name.ends_with(".tmp"), "leftover temp file: {name}");
        }

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn directory_sink_cleans_up_temp_file_when_rename_fails() {
        let tmp = temp_dir();
        let mut sink = DirectorySink::create(&tmp).unwrap();
        // A directory squatting on the target path makes the rename fail.
        std::fs::create_dir_all(tmp.join("shelf/42.json/occupied")).unwrap();

        let err = sink.commit(sample_node("42", NodeKind::Shelf)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(sink.written(), 0);

        let mut names: Vec<String> = std::fs::read_dir(tmp.join("shelf"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["42.json"]);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn directory_sink_rejects_path_like_ids() {
        let tmp = temp_dir();
        let mut sink = DirectorySink::create(&tmp).unwrap();

        let err = sink
            .commit(sample_node("../escape", NodeKind::Book))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Sink);

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
