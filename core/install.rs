//! Installing the browser viewer assets into a project directory.

use crate::config::{CONFIG_FILENAME, parse_config_text, set_ipfs_cid, write_table_atomically};
use crate::error::{AppError, Result};
use crate::filter::{INDEX_FILE, RESERVED_DIR};
use log;
use rust_embed::RustEmbed;
use std::fs;
use std::path::Path;

#[derive(RustEmbed)]
#[folder = "../data/site/"]
struct SiteAssets;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed { files: Vec<String> },
    AlreadyInstalled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated { files: Vec<String> },
    NotInstalled,
}

/// Names of the embedded assets, sorted.
pub fn asset_names() -> Vec<String> {
    let mut names: Vec<String> = SiteAssets::iter().map(|name| name.to_string()).collect();
    names.sort();
    names
}

fn asset_bytes(name: &str) -> Result<Vec<u8>> {
    SiteAssets::get(name)
        .map(|asset| asset.data.into_owned())
        .ok_or_else(|| AppError::Asset(format!("Embedded asset not found: {}", name)))
}

fn write_asset(target: &Path, name: &str) -> Result<()> {
    let destination = target.join(name);
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| AppError::DirCreation {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let bytes = asset_bytes(name)?;
    fs::write(&destination, bytes).map_err(|e| AppError::FileWrite {
        path: destination.clone(),
        source: e,
    })?;
    log::debug!("Wrote {}", destination.display());
    Ok(())
}

fn write_viewer_assets(target: &Path) -> Result<Vec<String>> {
    let mut written = Vec::new();
    for name in asset_names() {
        if name == CONFIG_FILENAME {
            continue;
        }
        write_asset(target, &name)?;
        written.push(name);
    }
    Ok(written)
}

/// Copies the viewer into `target` and creates `hanuki.toml` with an empty
/// CID. Does nothing if any installed file is already there.
pub fn init_project(target: &Path) -> Result<InstallOutcome> {
    let already = [RESERVED_DIR, INDEX_FILE, CONFIG_FILENAME]
        .iter()
        .any(|name| target.join(name).exists());
    if already {
        log::info!("Hanuki already installed in {}", target.display());
        return Ok(InstallOutcome::AlreadyInstalled);
    }

    log::info!("Installing Hanuki in {}", target.display());
    let mut files = write_viewer_assets(target)?;

    let template = asset_bytes(CONFIG_FILENAME)?;
    let template = String::from_utf8(template)
        .map_err(|e| AppError::Asset(format!("Config template is not UTF-8: {}", e)))?;
    let mut table = parse_config_text(&template)?;
    set_ipfs_cid(&mut table, "");
    write_table_atomically(&target.join(CONFIG_FILENAME), &table)?;
    files.push(CONFIG_FILENAME.to_string());
    files.sort();

    Ok(InstallOutcome::Installed { files })
}

/// Replaces `_hanuki/` and `index.html`. An existing `hanuki.toml` is kept
/// as is.
pub fn update_project(target: &Path) -> Result<UpdateOutcome> {
    let assets_dir = target.join(RESERVED_DIR);
    if !assets_dir.exists() && !target.join(INDEX_FILE).exists() {
        log::info!("Hanuki is not installed in {}", target.display());
        return Ok(UpdateOutcome::NotInstalled);
    }

    log::info!("Updating Hanuki in {}", target.display());
    if assets_dir.exists() {
        fs::remove_dir_all(&assets_dir).map_err(|e| AppError::FileWrite {
            path: assets_dir.clone(),
            source: e,
        })?;
    }
    let files = write_viewer_assets(target)?;
    Ok(UpdateOutcome::Updated { files })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProjectConfig, record_published_cid};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn embeds_the_viewer() {
        let names = asset_names();
        for expected in [
            "_hanuki/TreeSidebar.html",
            "_hanuki/css/hanuki.css",
            "_hanuki/js/config.js",
            "_hanuki/js/filesystem.js",
            "_hanuki/js/filter.js",
            "_hanuki/js/main.js",
            "_hanuki/js/markdown.js",
            "hanuki.toml",
            "index.html",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
    }

    fn asset_text(name: &str) -> String {
        String::from_utf8(asset_bytes(name).unwrap()).unwrap()
    }

    #[test]
    fn installed_viewer_follows_the_navigation_rules() {
        let index = asset_text("index.html");
        assert!(index.contains(r#"<script type="module" src="_hanuki/js/main.js">"#));
        for id in ["site-icon", "repository-button", "download-button", "errors"] {
            assert!(index.contains(&format!(r#"id="{}""#, id)), "index.html lacks #{}", id);
        }

        let main = asset_text("_hanuki/js/main.js");
        assert!(main.contains("export const DEFAULT_PAGE = '/ReadMe.md';"));
        assert!(main.contains("${FILE_PARAM}=${encoded}"));
        assert!(!main.contains("URLSearchParams"));
        assert!(main.contains("target.includes('=')"));
        assert!(main.contains("`${fullPath}.md`"));
        for ext in ["md", "htm", "webp", "mov", "flac"] {
            assert!(main.contains(&format!("['{}', ", ext)), "no renderer for .{}", ext);
        }
        assert!(main.find("['ogg', 'video']") < main.find("['ogg', 'audio']"));

        let filesystem = asset_text("_hanuki/js/filesystem.js");
        assert!(filesystem.contains("split('/').map(encodeURIComponent).join('/')"));
        assert!(filesystem.contains("if (marker !== DIRECTORY_MARKER) return [];"));

        let sidebar = asset_text("_hanuki/TreeSidebar.html");
        assert!(sidebar.contains("new DirectoryFilter(config, TREE_VIEW, gitignore)"));
        assert!(sidebar.contains("filter.filterEntries(entries, prefix)"));

        let filter = asset_text("_hanuki/js/filter.js");
        assert!(filter.contains("export const RESERVED_DIR = '_hanuki';"));
        assert!(filter.contains("export const RESERVED_FILES = ['index.html', 'hanuki.toml'];"));
    }

    #[test]
    fn init_installs_once() {
        let dir = tempdir().unwrap();
        let outcome = init_project(dir.path()).unwrap();
        let InstallOutcome::Installed { files } = outcome else {
            panic!("expected a fresh install");
        };
        assert!(files.contains(&"index.html".to_string()));
        assert!(dir.path().join("_hanuki/TreeSidebar.html").is_file());

        let config = ProjectConfig::load_or_default(dir.path());
        assert_eq!(config.ipfs.cid, None);
        assert_eq!(config.ipfs.api_version, "v0");

        assert_eq!(init_project(dir.path()).unwrap(), InstallOutcome::AlreadyInstalled);
    }

    #[test]
    fn init_refuses_when_only_config_exists() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "[project]\nname = \"Mine\"\n").unwrap();
        assert_eq!(init_project(dir.path()).unwrap(), InstallOutcome::AlreadyInstalled);
        assert!(!dir.path().join(INDEX_FILE).exists());
    }

    #[test]
    fn update_keeps_config_and_replaces_assets() {
        let dir = tempdir().unwrap();
        assert_eq!(update_project(dir.path()).unwrap(), UpdateOutcome::NotInstalled);

        init_project(dir.path()).unwrap();
        record_published_cid(dir.path(), "bafykeep").unwrap();
        let stale = dir.path().join("_hanuki/old.js");
        fs::write(&stale, "old").unwrap();

        let outcome = update_project(dir.path()).unwrap();
        assert!(matches!(outcome, UpdateOutcome::Updated { .. }));
        assert!(!stale.exists());
        assert!(dir.path().join("_hanuki/css/hanuki.css").is_file());
        let config = ProjectConfig::load_or_default(dir.path());
        assert_eq!(config.ipfs.cid.as_deref(), Some("bafykeep"));
    }
}
