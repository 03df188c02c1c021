//! The node's local node-info directory watcher: the collaborator the
//! updater polls for locally-authored node info files that have not yet
//! been published, and that it uses to persist a freshly-published node
//! info back to disk.
//!
//! Kept as a trait so the polling loop in [`crate::updater`] is testable
//! against an in-memory fake without touching a filesystem.
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use snafu::{ResultExt, Snafu};

use crate::model::NodeInfo;

#[derive(Debug, Snafu)]
pub enum WatcherError {
    #[snafu(display("failed to read node info directory {path:?}"))]
    ReadDir { source: std::io::Error, path: PathBuf },

    #[snafu(display("failed to read node info file {path:?}"))]
    ReadFile { source: std::io::Error, path: PathBuf },

    #[snafu(display("failed to parse node info file {path:?}"))]
    ParseFile { source: serde_json::Error, path: PathBuf },

    #[snafu(display("failed to write node info file {path:?}"))]
    WriteFile { source: std::io::Error, path: PathBuf },

    #[snafu(display("failed to serialize node info"))]
    SerializeNode { source: serde_json::Error },
}

pub type Result<T, E = WatcherError> = std::result::Result<T, E>;

/// Discovers locally-authored node info updates and records which ones the
/// caller has already processed (`nodeInfoUpdates`, `processedNodeInfoHashes`,
/// `saveToFile`).
pub trait FileWatcher: Send + Sync {
    /// Returns every node info found in the watched location whose hash is
    /// not already in `processed`.
    fn node_info_updates(&self, processed: &BTreeSet<String>) -> Result<Vec<NodeInfo>>;

    /// Persists `node` to the watched location under a name derived from
    /// its hash, so a restart can recover what was already published.
    fn save_to_file(&self, node: &NodeInfo) -> Result<()>;
}

/// A [`FileWatcher`] backed by a directory of `*.json` node info files.
pub struct DirectoryWatcher {
    directory: PathBuf,
    processed: Mutex<BTreeSet<String>>,
}

impl DirectoryWatcher {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            processed: Mutex::new(BTreeSet::new()),
        }
    }

    fn entries(&self) -> Result<Vec<PathBuf>> {
        std::fs::read_dir(&self.directory)
            .context(ReadDirSnafu {
                path: self.directory.clone(),
            })?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .map(Ok)
            .collect()
    }
}

impl FileWatcher for DirectoryWatcher {
    fn node_info_updates(&self, processed: &BTreeSet<String>) -> Result<Vec<NodeInfo>> {
        let mut found = Vec::new();

        for path in self.entries()? {
            let contents = std::fs::read_to_string(&path).context(ReadFileSnafu { path: path.clone() })?;
            let node: NodeInfo =
                serde_json::from_str(&contents).context(ParseFileSnafu { path: path.clone() })?;

            if !processed.contains(&node.hash()) {
                found.push(node);
            }
        }

        Ok(found)
    }

    fn save_to_file(&self, node: &NodeInfo) -> Result<()> {
        let hash = node.hash();
        let path = file_path_for(&self.directory, &hash);
        let contents = serde_json::to_string_pretty(node).context(SerializeNodeSnafu)?;
        std::fs::write(&path, contents).context(WriteFileSnafu { path })?;

        self.processed.lock().expect("watcher lock poisoned").insert(hash);
        Ok(())
    }
}

fn file_path_for(directory: &Path, hash: &str) -> PathBuf {
    directory.join(format!("{hash}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn node() -> NodeInfo {
        NodeInfo {
            legal_identity: "O=Dana,L=Rome,C=IT".to_owned(),
            addresses: vec!["10.0.0.5:10000".to_owned()],
            platform_version: 7,
            serial: 1,
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn saved_node_info_is_discoverable_as_an_unprocessed_update() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let watcher = DirectoryWatcher::new(dir.path());
        let node = node();

        watcher.save_to_file(&node).expect("failed to save node info");

        let updates = watcher
            .node_info_updates(&BTreeSet::new())
            .expect("failed to list updates");
        assert_eq!(updates, vec![node]);
    }

    #[test]
    fn already_processed_hashes_are_excluded() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let watcher = DirectoryWatcher::new(dir.path());
        let node = node();
        watcher.save_to_file(&node).expect("failed to save node info");

        let mut processed = BTreeSet::new();
        processed.insert(node.hash());

        let updates = watcher
            .node_info_updates(&processed)
            .expect("failed to list updates");
        assert!(updates.is_empty());
    }
}
