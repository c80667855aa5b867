use super::{ContentStore, DirectoryEntry, build_file_url};
use crate::config::PROJECT_FILES_PATH;
use crate::error::FetchError;
use crate::path::{normalize, relativize};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory [`ContentStore`] holding a fixed project tree.
///
/// Listings behave like the gateway: a file node lists as empty, a missing
/// path lists as `None`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: BTreeMap<String, String>,
    dirs: BTreeSet<String>,
    failing: BTreeSet<String>,
    untyped_links: bool,
    requests: AtomicUsize,
}

impl MemoryStore {
    pub const ORIGIN: &'static str = "http://memory.test";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, contents: &str) -> Self {
        self.files.insert(Self::key(path), contents.to_string());
        self
    }

    pub fn with_dir(mut self, path: &str) -> Self {
        self.dirs.insert(Self::key(path));
        self
    }

    /// Listed but every fetch of `path` answers HTTP 500.
    pub fn with_failing_file(mut self, path: &str) -> Self {
        let key = Self::key(path);
        self.files.insert(key.clone(), String::new());
        self.failing.insert(key);
        self
    }

    /// Drops the `Type` marker from listed links, as most gateways do.
    pub fn without_type_markers(mut self) -> Self {
        self.untyped_links = true;
        self
    }

    /// Number of listing requests served so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn key(path: &str) -> String {
        let relative = relativize(path, PROJECT_FILES_PATH);
        normalize(&format!("/{}", relative))
            .trim_end_matches('/')
            .to_string()
    }

    fn is_dir(&self, key: &str) -> bool {
        key.is_empty()
            || self.dirs.contains(key)
            || self
                .files
                .keys()
                .chain(self.dirs.iter())
                .any(|p| p.starts_with(&format!("{}/", key)))
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    fn file_url(&self, path: &str) -> String {
        build_file_url(Self::ORIGIN, PROJECT_FILES_PATH, path)
    }

    async fn list_directory(&self, path: &str) -> Option<Vec<DirectoryEntry>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let key = Self::key(path);

        if self.files.contains_key(&key) {
            return Some(Vec::new());
        }
        if !self.is_dir(&key) {
            return None;
        }

        let prefix = format!("{}/", key);
        let mut children: BTreeMap<String, DirectoryEntry> = BTreeMap::new();
        for (child_path, is_file) in self
            .files
            .keys()
            .map(|p| (p, true))
            .chain(self.dirs.iter().map(|p| (p, false)))
        {
            let Some(rest) = child_path.strip_prefix(&prefix) else {
                continue;
            };
            let (name, nested) = match rest.split_once('/') {
                Some((name, _)) => (name, true),
                None => (rest, false),
            };
            if name.is_empty() {
                continue;
            }
            let is_directory = nested || !is_file;
            let size = if is_directory {
                None
            } else {
                self.files.get(child_path).map(|c| c.len() as u64)
            };
            children.entry(name.to_string()).or_insert_with(|| DirectoryEntry {
                name: name.to_string(),
                is_directory: is_directory && !self.untyped_links,
                content_hash: format!("mem:{}{}", prefix, name),
                size,
            });
        }
        Some(children.into_values().collect())
    }

    async fn fetch_file_contents(&self, path: &str) -> Result<String, FetchError> {
        let key = Self::key(path);
        if self.failing.contains(&key) {
            return Err(FetchError::Http {
                status: 500,
                path: path.to_string(),
            });
        }
        self.files.get(&key).cloned().ok_or_else(|| FetchError::Http {
            status: 404,
            path: path.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn lists_like_a_gateway() {
        let store = MemoryStore::new()
            .with_file("/ReadMe.md", "# Hi")
            .with_file("/src/lib.rs", "")
            .with_dir("/empty");

        let names: Vec<(String, bool)> = store
            .list_directory("/")
            .await
            .unwrap()
            .into_iter()
            .map(|e| (e.name, e.is_directory))
            .collect();
        assert_eq!(
            names,
            vec![
                ("ReadMe.md".to_string(), false),
                ("empty".to_string(), true),
                ("src".to_string(), true),
            ]
        );
        assert_eq!(store.list_directory("/ReadMe.md").await, Some(Vec::new()));
        assert_eq!(store.list_directory("/empty").await, Some(Vec::new()));
        assert_eq!(store.list_directory("/nope").await, None);
        assert_eq!(
            store.fetch_file_contents("/nope.md").await,
            Err(FetchError::Http {
                status: 404,
                path: "/nope.md".to_string()
            })
        );
    }
}
