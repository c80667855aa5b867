//! Visibility rules for the folder tree and for publishing.
//!
//! Decision order for a path: reserved installed files, include patterns,
//! ignore patterns, then the root `.gitignore` when enabled. No match means
//! visible.

use crate::config::{FilterMode, ProjectConfig};
use crate::path::match_form;
use crate::store::{ContentStore, DirectoryEntry};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use log;
use std::path::Path;

/// Installed viewer assets, relative to the project root.
pub const RESERVED_DIR: &str = "_hanuki";
pub const INDEX_FILE: &str = "index.html";
pub const RESERVED_FILES: &[&str] = &[INDEX_FILE, crate::config::CONFIG_FILENAME];

/// Returns true for Hanuki's own installed files.
pub fn is_reserved(path: &str) -> bool {
    let relative = match_form(path);
    let relative = relative.trim_end_matches('/');
    relative == RESERVED_DIR
        || relative.starts_with(&format!("{}/", RESERVED_DIR))
        || RESERVED_FILES.contains(&relative)
}

/// Compiled filter for one [`FilterMode`].
#[derive(Debug, Clone)]
pub struct DirectoryFilter {
    mode: FilterMode,
    include: GlobSet,
    ignore: GlobSet,
    gitignore: Option<Gitignore>,
}

impl DirectoryFilter {
    pub fn new(config: &ProjectConfig, mode: FilterMode) -> Self {
        let (include, ignore) = config.effective_patterns(mode);
        log::debug!(
            "Building {:?} filter ({} include, {} ignore patterns)",
            mode,
            include.len(),
            ignore.len()
        );
        Self {
            mode,
            include: build_glob_set_from_vec(&include),
            ignore: build_glob_set_from_vec(&ignore),
            gitignore: None,
        }
    }

    /// Attaches a root `.gitignore` matcher, used only when the mode's
    /// `use_gitignore` flag is set in `config`.
    pub fn with_gitignore(mut self, config: &ProjectConfig, gitignore: Option<Gitignore>) -> Self {
        if config.uses_gitignore(self.mode) {
            self.gitignore = gitignore;
        } else {
            log::trace!("Gitignore disabled for {:?}", self.mode);
        }
        self
    }

    /// Builds the filter for a remote project, fetching the root
    /// `.gitignore` from `store` when the mode uses it.
    pub async fn from_store<S>(store: &S, config: &ProjectConfig, mode: FilterMode) -> Self
    where
        S: ContentStore + ?Sized,
    {
        let gitignore = if config.uses_gitignore(mode) {
            match store.fetch_file_contents("/.gitignore").await {
                Ok(text) => gitignore_from_text(&text),
                Err(e) => {
                    log::debug!("No usable .gitignore: {}", e);
                    None
                }
            }
        } else {
            None
        };
        Self::new(config, mode).with_gitignore(config, gitignore)
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn should_ignore(&self, path: &str) -> bool {
        self.should_ignore_entry(path, false)
    }

    pub fn should_ignore_entry(&self, path: &str, is_dir: bool) -> bool {
        if is_reserved(path) {
            let ignored = self.mode == FilterMode::TreeView;
            log::trace!("Reserved path {} (ignored: {})", path, ignored);
            return ignored;
        }

        let relative = match_form(path);
        let relative = relative.trim_end_matches('/');

        if self.include.is_match(relative) {
            log::trace!("Path included by pattern: {}", relative);
            return false;
        }
        if self.ignore.is_match(relative) {
            log::trace!("Path ignored by pattern: {}", relative);
            return true;
        }
        if let Some(gitignore) = &self.gitignore {
            if !relative.is_empty()
                && gitignore
                    .matched_path_or_any_parents(relative, is_dir)
                    .is_ignore()
            {
                log::trace!("Path ignored by .gitignore: {}", relative);
                return true;
            }
        }
        false
    }

    /// Keeps the entries of `dir_path` that this filter does not ignore.
    pub fn filter_entries(&self, entries: Vec<DirectoryEntry>, dir_path: &str) -> Vec<DirectoryEntry> {
        entries
            .into_iter()
            .filter(|entry| {
                let full_path = format!("{}/{}", dir_path, entry.name);
                !self.should_ignore_entry(&full_path, entry.is_directory)
            })
            .collect()
    }
}

pub fn should_ignore(path: &str, config: &ProjectConfig, mode: FilterMode) -> bool {
    DirectoryFilter::new(config, mode).should_ignore(path)
}

pub fn filter_entries(
    entries: Vec<DirectoryEntry>,
    dir_path: &str,
    config: &ProjectConfig,
    mode: FilterMode,
) -> Vec<DirectoryEntry> {
    DirectoryFilter::new(config, mode).filter_entries(entries, dir_path)
}

/// Builds a root-level `.gitignore` matcher from text fetched remotely.
pub fn gitignore_from_text(text: &str) -> Option<Gitignore> {
    let mut builder = GitignoreBuilder::new("");
    for line in text.lines() {
        if let Err(e) = builder.add_line(None, line) {
            log::warn!("Skipping invalid .gitignore line \"{}\": {}", line, e);
        }
    }
    match builder.build() {
        Ok(gitignore) => Some(gitignore),
        Err(e) => {
            log::warn!("Failed to build .gitignore matcher: {}", e);
            None
        }
    }
}

/// Builds a matcher from `<project_root>/.gitignore`, if the file exists.
pub fn gitignore_from_file(project_root: &Path) -> Option<Gitignore> {
    let path = project_root.join(".gitignore");
    if !path.is_file() {
        return None;
    }
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("Failed to read {}: {}", path.display(), e);
            return None;
        }
    };
    gitignore_from_text(&text)
}

/// Compiles filter patterns. Invalid patterns are skipped.
fn build_glob_set_from_vec(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern_str in patterns {
        for processed_pattern in expand_pattern(pattern_str) {
            let glob = GlobBuilder::new(&processed_pattern)
                .literal_separator(false)
                .backslash_escape(true)
                .build();
            match glob {
                Ok(glob) => {
                    log::trace!(
                        "Adding glob pattern: {} (processed as {})",
                        pattern_str,
                        processed_pattern
                    );
                    builder.add(glob);
                }
                Err(e) => {
                    log::warn!("Skipping invalid glob pattern \"{}\": {}", pattern_str, e);
                }
            }
        }
    }
    builder.build().unwrap_or_else(|e| {
        log::warn!("Error building glob set, ignoring patterns: {}", e);
        GlobSet::empty()
    })
}

/// `dir/**` and `dir/` match the directory itself and everything below it.
fn expand_pattern(pattern: &str) -> Vec<String> {
    let trimmed = pattern.trim();
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    let trimmed = trimmed.trim_start_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }

    let base = trimmed
        .strip_suffix("/**")
        .or_else(|| trimmed.strip_suffix('/'));
    match base {
        Some(base) if !base.is_empty() => vec![base.to_string(), format!("{}/**", base)],
        _ => vec![trimmed.to_string()],
    }
}
