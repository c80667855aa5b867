//! Publishing a project directory to IPFS through a Kubo RPC endpoint.

use crate::config::{DEFAULT_API_VERSION, FilterMode, ProjectConfig, record_published_cid};
use crate::error::{AppError, Result};
use crate::filter::{INDEX_FILE, RESERVED_DIR};
use crate::gather::gather_project_paths;
use crate::path::encode_for_url;
use async_trait::async_trait;
use log;
use rayon::prelude::*;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:5001";
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);
const DIRECTORY_MIME: &str = "application/x-directory";
const FILE_MIME: &str = "application/octet-stream";

/// One item of a directory upload, path relative to the uploaded root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEntry {
    Directory(String),
    File { path: String, contents: Vec<u8> },
}

impl UploadEntry {
    pub fn path(&self) -> &str {
        match self {
            UploadEntry::Directory(path) => path,
            UploadEntry::File { path, .. } => path,
        }
    }
}

/// Orders entries so every directory precedes its children.
pub fn ordered_entries(mut entries: Vec<UploadEntry>) -> Vec<UploadEntry> {
    entries.sort_by(|a, b| {
        let a_parts: Vec<&str> = a.path().split('/').collect();
        let b_parts: Vec<&str> = b.path().split('/').collect();
        a_parts.cmp(&b_parts)
    });
    entries
}

/// Storage node API used for publishing.
#[async_trait]
pub trait StorageApi: Send + Sync {
    /// Version string of the node; doubles as a connectivity check.
    async fn version(&self) -> Result<String>;

    /// Uploads and pins a directory, returning the root CID.
    async fn add_directory(&self, entries: Vec<UploadEntry>) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    #[serde(rename = "Version")]
    version: String,
}

#[derive(Debug, Deserialize)]
struct AddedEntry {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Hash")]
    hash: Option<String>,
}

/// Root CID from a streamed `add` response: the entry with an empty name, or
/// the last entry carrying a hash.
pub fn parse_add_response(body: &str) -> Result<String> {
    let mut last = None;
    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let entry: AddedEntry = serde_json::from_str(line)?;
        let Some(hash) = entry.hash else {
            continue;
        };
        if entry.name.is_empty() {
            return Ok(hash);
        }
        last = Some(hash);
    }
    last.ok_or_else(|| AppError::Storage("No CID returned for directory".to_string()))
}

/// Kubo RPC client (`/api/v0`).
#[derive(Debug, Clone)]
pub struct KuboClient {
    http: reqwest::Client,
    api_base: String,
}

impl KuboClient {
    pub fn new(api_url: &str) -> Result<Self> {
        let parsed = url::Url::parse(api_url).map_err(|e| AppError::InvalidUrl {
            url: api_url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::InvalidUrl {
                url: api_url.to_string(),
                reason: "expected an http(s) base URL".to_string(),
            });
        }
        let trimmed = api_url.trim_end_matches('/');
        let api_base = trimmed.strip_suffix("/api/v0").unwrap_or(trimmed);

        let http = reqwest::Client::builder().timeout(UPLOAD_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_base: format!("{}/api/{}", api_base, DEFAULT_API_VERSION),
        })
    }

    fn endpoint(&self, command: &str) -> String {
        format!("{}/{}", self.api_base, command)
    }
}

#[async_trait]
impl StorageApi for KuboClient {
    async fn version(&self) -> Result<String> {
        let response = self.http.post(self.endpoint("version")).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Storage(format!("version request failed: HTTP {}", status)));
        }
        let version: VersionResponse = response.json().await?;
        Ok(version.version)
    }

    async fn add_directory(&self, entries: Vec<UploadEntry>) -> Result<String> {
        let mut form = Form::new();
        for entry in ordered_entries(entries) {
            let file_name = encode_for_url(entry.path());
            let part = match entry {
                UploadEntry::Directory(_) => Part::bytes(Vec::new()).mime_str(DIRECTORY_MIME)?,
                UploadEntry::File { contents, .. } => Part::bytes(contents).mime_str(FILE_MIME)?,
            };
            form = form.part("file", part.file_name(file_name));
        }

        let url = format!(
            "{}?pin=true&wrap-with-directory=true&recursive=true",
            self.endpoint("add")
        );
        log::debug!("Uploading to {}", url);
        let response = self.http.post(url).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AppError::Storage(format!(
                "add request failed: HTTP {}: {}",
                status,
                body.trim()
            )));
        }
        parse_add_response(&body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub cid: String,
    pub api_version: String,
    pub node_version: String,
    pub files: usize,
    pub directories: usize,
    pub total_bytes: u64,
}

/// Whether the viewer assets are present in `project_root`.
pub fn is_installed(project_root: &Path) -> bool {
    project_root.join(RESERVED_DIR).is_dir() && project_root.join(INDEX_FILE).is_file()
}

/// Uploads the publishable part of `project_root` and records the root CID
/// in `hanuki.toml`. Nothing is written unless the upload succeeds.
pub async fn publish_project<A>(api: &A, project_root: &Path) -> Result<PublishReport>
where
    A: StorageApi + ?Sized,
{
    if !is_installed(project_root) {
        return Err(AppError::NotInstalled(project_root.to_path_buf()));
    }
    let config = ProjectConfig::load_or_default(project_root);
    let gathered = gather_project_paths(project_root, &config, FilterMode::IpfsPublishing)?;

    log::info!("Reading {} publishable paths...", gathered.len());
    let entries: Vec<UploadEntry> = gathered
        .into_par_iter()
        .map(|gathered_path| {
            if gathered_path.is_dir {
                return Ok(UploadEntry::Directory(gathered_path.relative));
            }
            let absolute = project_root.join(&gathered_path.relative);
            let contents = fs::read(&absolute).map_err(|e| AppError::FileRead {
                path: absolute.clone(),
                source: e,
            })?;
            Ok(UploadEntry::File {
                path: gathered_path.relative,
                contents,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let (files, directories, total_bytes) =
        entries.iter().fold((0, 0, 0u64), |(f, d, b), entry| match entry {
            UploadEntry::Directory(_) => (f, d + 1, b),
            UploadEntry::File { contents, .. } => (f + 1, d, b + contents.len() as u64),
        });

    let node_version = api.version().await?;
    log::info!("Connected to IPFS version: {}", node_version);

    let cid = api.add_directory(entries).await?;
    log::info!("Directory added to IPFS with CID: {}", cid);

    record_published_cid(project_root, &cid)?;
    let api_version = ProjectConfig::load_or_default(project_root).ipfs.api_version;

    Ok(PublishReport {
        cid,
        api_version,
        node_version,
        files,
        directories,
        total_bytes,
    })
}
