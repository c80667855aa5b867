use crate::config::{FilterMode, ProjectConfig};
use crate::error::{AppError, Result};
use crate::filter::{DirectoryFilter, gitignore_from_file};
use ignore::WalkBuilder;
use log;
use serde::Serialize;
use std::env;
use std::path::{Component, Path, PathBuf};

pub const PROJECT_ROOT_ENV: &str = "HANUKI_PROJECT_ROOT";

/// A walked path relative to the project root, with `/` separators.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct GatheredPath {
    pub relative: String,
    pub is_dir: bool,
}

/// CLI flag, then `HANUKI_PROJECT_ROOT`, then the working directory.
pub fn determine_project_root(cli_project_root: Option<&PathBuf>) -> Result<PathBuf> {
    let path_str_opt = cli_project_root
        .map(|p| p.to_string_lossy().to_string())
        .or_else(|| env::var(PROJECT_ROOT_ENV).ok().filter(|s| !s.is_empty()));

    let path_to_resolve = match path_str_opt {
        Some(p_str) => PathBuf::from(shellexpand::tilde(&p_str).as_ref()),
        None => env::current_dir().map_err(AppError::Io)?,
    };

    path_to_resolve.canonicalize().map_err(|e| {
        AppError::Io(std::io::Error::new(
            e.kind(),
            format!(
                "Failed to canonicalize project root '{}': {}",
                path_to_resolve.display(),
                e
            ),
        ))
    })
}

/// Builds the filter for `mode`, including the root `.gitignore` when the
/// mode uses it.
pub fn local_filter(project_root: &Path, config: &ProjectConfig, mode: FilterMode) -> DirectoryFilter {
    let gitignore = if config.uses_gitignore(mode) {
        gitignore_from_file(project_root)
    } else {
        None
    };
    DirectoryFilter::new(config, mode).with_gitignore(config, gitignore)
}

/// Walks `project_root` and returns every path visible under `mode`, sorted.
///
/// Hidden files are walked, `.git` never is. Ignored directories are pruned
/// unless the mode has include patterns that could reach inside them.
pub fn gather_project_paths(
    project_root: &Path,
    config: &ProjectConfig,
    mode: FilterMode,
) -> Result<Vec<GatheredPath>> {
    let filter = local_filter(project_root, config, mode);
    let (include, _) = config.effective_patterns(mode);
    let can_prune = include.is_empty();

    let mut builder = WalkBuilder::new(project_root);
    builder
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .require_git(false)
        .follow_links(false);

    let prune_filter = filter.clone();
    let prune_root = project_root.to_path_buf();
    builder.filter_entry(move |entry| {
        let Some(relative) = relative_project_path(entry.path(), &prune_root) else {
            return true;
        };
        if relative == ".git" || relative.starts_with(".git/") {
            return false;
        }
        let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
        !(can_prune && is_dir && prune_filter.should_ignore_entry(&relative, true))
    });

    log::info!("Walking project directory: {} ({:?})", project_root.display(), mode);
    let mut gathered = Vec::new();
    for entry_result in builder.build() {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Error walking directory: {}", e);
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        let Some(relative) = relative_project_path(entry.path(), project_root) else {
            log::warn!("Could not get relative path for: {}", entry.path().display());
            continue;
        };
        let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
        if filter.should_ignore_entry(&relative, is_dir) {
            log::trace!("Excluding: {}", relative);
            continue;
        }
        log::trace!("Including: {}", relative);
        gathered.push(GatheredPath { relative, is_dir });
    }

    gathered.sort();
    log::info!("Gathered {} paths for {:?}", gathered.len(), mode);
    Ok(gathered)
}

fn relative_project_path(path: &Path, project_root: &Path) -> Option<String> {
    let relative = pathdiff::diff_paths(path, project_root)?;
    let segments: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}
