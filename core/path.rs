//! Project path helpers.
//!
//! Project paths are plain strings with forward slashes. A leading slash marks
//! an absolute project path (`/docs/index.md`); without it the path is
//! fetch-relative (`docs/index.md`). These functions never decide that for the
//! caller, except where noted.

use std::borrow::Cow;

/// Collapses every run of two or more `/` into a single `/`.
pub fn normalize(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len());
    let mut previous_slash = false;
    for ch in path.chars() {
        if ch == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        normalized.push(ch);
    }
    normalized
}

/// Percent-encodes each path segment independently, keeping the separators.
///
/// Callers holding an optional path map through this function, so absence
/// stays absence: `path.map(encode_for_url)`.
pub fn encode_for_url(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment))
        .collect::<Vec<Cow<'_, str>>>()
        .join("/")
}

/// Inverse of [`encode_for_url`].
///
/// Malformed escapes are kept literally and invalid UTF-8 is replaced, so the
/// function is total.
pub fn decode_from_url(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            let bytes = urlencoding::decode_binary(segment.as_bytes());
            String::from_utf8_lossy(&bytes).into_owned()
        })
        .collect::<Vec<String>>()
        .join("/")
}

/// Strips the project root prefix from `full_path` if it is there.
///
/// A missing prefix is not an error: the path is already relative and is
/// returned normalized.
pub fn relativize(full_path: &str, project_root: &str) -> String {
    let normalized_full = normalize(full_path);
    let prefix = format!("{}/", normalize(project_root));

    match normalized_full.strip_prefix(&prefix) {
        Some(relative) => relative.to_string(),
        None => normalized_full,
    }
}

/// Resolves `path` against `current_dir` unless it is already rooted.
///
/// `.` segments are dropped and `..` pops the previous segment (never above
/// the root), so a markdown link `./foo` seen from `/docs` lands on
/// `/docs/foo`.
pub fn resolve_absolute(path: &str, current_dir: &str) -> String {
    let joined = if path.starts_with('/') {
        normalize(path)
    } else {
        normalize(&format!("{}/{}", current_dir, path))
    };
    remove_dot_segments(&joined)
}

fn remove_dot_segments(path: &str) -> String {
    if !path.split('/').any(|segment| segment == "." || segment == "..") {
        return path.to_string();
    }

    let rooted = path.starts_with('/');
    let trailing = path.len() > 1 && (path.ends_with('/') || path.ends_with("/.") || path.ends_with("/.."));
    let mut stack: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }

    let mut resolved = stack.join("/");
    if rooted {
        resolved.insert(0, '/');
    }
    if trailing && !resolved.ends_with('/') {
        resolved.push('/');
    }
    resolved
}

/// Returns the text after the final `.` of the last segment.
///
/// Empty when the segment has no `.` or only a leading one (`.gitignore`).
/// The result keeps its case; consumers lower-case it themselves.
pub fn extension(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => "",
        Some(index) => &name[index + 1..],
    }
}

/// Splits a path into its parent directory and its last segment.
///
/// `"/docs/a.md"` gives `("/docs", "a.md")`, `"/a.md"` gives `("", "a.md")`
/// and `"a.md"` gives `("", "a.md")`.
pub fn split_parent(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(index) => (&path[..index], &path[index + 1..]),
        None => ("", path),
    }
}

/// Directory containing `path`; `"/"` for top-level absolute paths.
pub fn parent_dir(path: &str) -> String {
    let (parent, _) = split_parent(path);
    if parent.is_empty() && path.starts_with('/') {
        "/".to_string()
    } else {
        parent.to_string()
    }
}

/// Last segment up to its first `.`, used as a default page name.
pub fn display_name(path: &str) -> &str {
    let (_, name) = split_parent(path);
    name.split('.').next().unwrap_or(name)
}

/// Project-relative form used for pattern matching: normalized, without a
/// leading `/` or `./`.
pub fn match_form(path: &str) -> String {
    let normalized = normalize(path);
    let trimmed = normalized.trim_start_matches("./");
    trimmed.trim_start_matches('/').to_string()
}
