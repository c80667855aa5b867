//! Access to project files served by a content-addressed storage gateway.

use crate::config::PROJECT_FILES_PATH;
use crate::error::{AppError, FetchError, Result};
use crate::path::{encode_for_url, normalize, relativize, split_parent};
use async_trait::async_trait;
use log;
use reqwest::header::ACCEPT;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

#[cfg(any(test, feature = "mock"))]
pub mod memory;

/// Payload the gateway stores in a UnixFS directory node's `Data` field.
pub const DIRECTORY_MARKER: &str = "CAE";
pub const DAG_JSON_MEDIA_TYPE: &str = "application/vnd.ipld.dag-json";
pub const GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

/// One child link of a listed directory node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub is_directory: bool,
    pub content_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Read access to the published project tree.
///
/// Absence is data: a missing directory lists as `None` and a missing file
/// reports `false` from [`ContentStore::resource_exists`]. Only file fetches
/// fail with an error. Nothing is cached or retried.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Base path under which project files are served.
    fn mount_point(&self) -> &str {
        PROJECT_FILES_PATH
    }

    fn file_url(&self, path: &str) -> String;

    /// `None` on transport or decode failure, `Some(vec![])` for an empty
    /// directory or a file node.
    async fn list_directory(&self, path: &str) -> Option<Vec<DirectoryEntry>>;

    async fn fetch_file_contents(&self, path: &str) -> Result<String, FetchError>;

    /// Looks `path` up in its parent's listing. Always hits the backend.
    async fn resource_exists(&self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }
        let relative = relativize(path, self.mount_point());
        let (parent, leaf) = split_parent(&relative);
        match self.list_directory(parent).await {
            Some(entries) => entries.iter().any(|entry| entry.name == leaf),
            None => {
                log::debug!("Existence check for {} failed: parent not listable", path);
                false
            }
        }
    }
}

/// URL of `path` below `mount` on `origin`.
pub fn build_file_url(origin: &str, mount: &str, path: &str) -> String {
    let safe_path = encode_for_url(&relativize(path, mount));
    let full_path = normalize(&format!("/{}/{}", mount, safe_path));
    format!("{}{}", origin, full_path)
}

/// Decodes a DAG-JSON directory node into its entries.
///
/// Only a node whose `Data` carries [`DIRECTORY_MARKER`] lists its links.
/// Every other node, including one without `Data`, is a file and lists as
/// empty.
pub fn decode_listing(body: &str) -> Option<Vec<DirectoryEntry>> {
    let node: Value = match serde_json::from_str(body) {
        Ok(node) => node,
        Err(e) => {
            log::debug!("Listing is not valid JSON: {}", e);
            return None;
        }
    };
    let node = node.as_object()?;

    let marker = node
        .get("Data")
        .and_then(|data| data.get("/"))
        .and_then(|d| d.get("bytes"))
        .and_then(Value::as_str);
    if marker != Some(DIRECTORY_MARKER) {
        log::trace!("Node carries no directory marker, treating as file");
        return Some(Vec::new());
    }

    let links = match node.get("Links") {
        Some(Value::Array(links)) => links,
        Some(Value::Null) | None => return Some(Vec::new()),
        Some(other) => {
            log::debug!("Unexpected Links value: {}", other);
            return None;
        }
    };

    Some(links.iter().filter_map(decode_link).collect())
}

fn decode_link(link: &Value) -> Option<DirectoryEntry> {
    let name = link.get("Name").and_then(Value::as_str).unwrap_or_default();
    if matches!(name, "" | "." | "/") {
        return None;
    }

    let content_hash = match link.get("Hash") {
        Some(Value::String(cid)) => cid.clone(),
        Some(hash) => hash
            .get("/")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_default(),
        None => String::new(),
    };

    let size = ["Size", "Tsize"]
        .iter()
        .find_map(|key| link.get(*key).and_then(as_size));

    let is_directory = match link.get("Type") {
        Some(Value::Number(n)) => n.as_u64() == Some(1),
        Some(Value::String(s)) => matches!(s.to_ascii_lowercase().as_str(), "dir" | "directory"),
        _ => false,
    };

    Some(DirectoryEntry {
        name: name.to_string(),
        is_directory,
        content_hash,
        size,
    })
}

fn as_size(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// HTTP gateway client.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    origin: String,
    mount: String,
}

impl GatewayClient {
    /// `origin` is the gateway base, e.g. `http://localhost:8080/ipfs/<cid>`.
    pub fn new(origin: &str) -> Result<Self> {
        let parsed = url::Url::parse(origin).map_err(|e| AppError::InvalidUrl {
            url: origin.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::InvalidUrl {
                url: origin.to_string(),
                reason: "expected an http(s) base URL".to_string(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(GATEWAY_TIMEOUT)
            .build()?;
        log::debug!("Gateway client created for {}", origin);

        Ok(Self {
            http,
            origin: origin.trim_end_matches('/').to_string(),
            mount: PROJECT_FILES_PATH.to_string(),
        })
    }

    pub fn with_mount_point(mut self, mount: &str) -> Self {
        self.mount = mount.to_string();
        self
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}

#[async_trait]
impl ContentStore for GatewayClient {
    fn mount_point(&self) -> &str {
        &self.mount
    }

    fn file_url(&self, path: &str) -> String {
        build_file_url(&self.origin, &self.mount, path)
    }

    async fn list_directory(&self, path: &str) -> Option<Vec<DirectoryEntry>> {
        let url = format!("{}?format=dag-json", self.file_url(path));
        log::trace!("Listing {}", url);

        let response = match self.http.get(&url).header(ACCEPT, DAG_JSON_MEDIA_TYPE).send().await {
            Ok(response) => response,
            Err(e) => {
                log::debug!("Listing request for {} failed: {}", url, e);
                return None;
            }
        };
        if !response.status().is_success() {
            log::debug!("Listing {} returned HTTP {}", url, response.status());
            return None;
        }
        match response.text().await {
            Ok(body) => decode_listing(&body),
            Err(e) => {
                log::debug!("Failed to read listing body for {}: {}", url, e);
                None
            }
        }
    }

    async fn fetch_file_contents(&self, path: &str) -> Result<String, FetchError> {
        let url = self.file_url(path);
        log::trace!("Fetching {}", url);

        let response = self.http.get(&url).send().await.map_err(|e| FetchError::Transport {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }
        response.text().await.map_err(|e| FetchError::Transport {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}
