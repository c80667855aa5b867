//! Markdown rendering and link interception for the markdown view.

use crate::path::relativize;
use crate::store::ContentStore;
use comrak::{Options, markdown_to_html};
use serde::Serialize;

/// A rendered markdown file plus what the sub-document needs to resolve its
/// relative resources.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkdownDocument {
    /// Absolute URL of the project files mount point.
    pub base_path: String,
    /// Path of the file relative to the mount point.
    pub homepage: String,
    pub source: String,
    pub html: String,
}

impl MarkdownDocument {
    pub fn new<S>(store: &S, path: &str, source: String) -> Self
    where
        S: ContentStore + ?Sized,
    {
        let mount = store.mount_point();
        let html = render_markdown(&source);
        Self {
            base_path: store.file_url(mount).trim_end_matches('/').to_string(),
            homepage: relativize(path, mount),
            source,
            html,
        }
    }

    /// Standalone HTML page for the markdown frame.
    ///
    /// Link clicks are posted to the parent window as `markdown-link-click`
    /// messages instead of navigating the frame.
    pub fn to_page(&self) -> String {
        let base = escape_html(&self.base_path);
        let title = escape_html(&self.homepage);
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<base href="{base}/">
<link rel="stylesheet" href="{base}/_hanuki/css/hanuki.css">
</head>
<body class="markdown-body">
<article id="app">
{body}</article>
<script>
document.addEventListener('click', function (e) {{
  var a = e.target.closest('a');
  if (!a || !a.getAttribute('href')) return;
  var href = a.getAttribute('href');
  if (/^[a-zA-Z][a-zA-Z0-9+.-]*:/.test(href) || href.startsWith('http')) return;
  e.preventDefault();
  window.parent.postMessage({{ type: 'markdown-link-click', path: href }}, '*');
}});
</script>
</body>
</html>
"#,
            title = title,
            base = base,
            body = self.html,
        )
    }
}

pub fn render_markdown(text: &str) -> String {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    markdown_to_html(text, &options)
}

/// Translates a clicked link into a project path, or `None` for links the
/// frame should handle itself.
///
/// - `http…` and any other `scheme:` link is external.
/// - `#/./guide.md` is a file under the current directory: `./guide.md`.
/// - `#guide.md` is a bare fragment naming a path: `guide.md`.
/// - anything else is already a path.
pub fn link_target(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("http") || has_scheme(href) {
        return None;
    }
    let target = if let Some(rest) = href.strip_prefix("#/.") {
        format!(".{}", rest)
    } else if let Some(rest) = href.strip_prefix('#') {
        rest.to_string()
    } else {
        href.to_string()
    };
    if target.is_empty() { None } else { Some(target) }
}

fn has_scheme(href: &str) -> bool {
    let Some((scheme, _)) = href.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn link_forms() {
        assert_eq!(link_target("./foo"), Some("./foo".to_string()));
        assert_eq!(link_target("docs/guide.md"), Some("docs/guide.md".to_string()));
        assert_eq!(link_target("#/./guide.md"), Some("./guide.md".to_string()));
        assert_eq!(link_target("#notes.md"), Some("notes.md".to_string()));
        assert_eq!(link_target("https://example.com"), None);
        assert_eq!(link_target("http://example.com/a.md"), None);
        assert_eq!(link_target("mailto:me@example.com"), None);
        assert_eq!(link_target("#"), None);
    }

    #[test]
    fn renders_tables_and_text() {
        let html = render_markdown(indoc! {"
            # Title

            | a | b |
            |---|---|
            | 1 | 2 |
        "});
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<table>"));
    }

    #[test]
    fn document_knows_its_base() {
        let store = MemoryStore::new();
        let doc = MarkdownDocument::new(&store, "/docs/a.md", "[x](./b.md)".to_string());
        assert_eq!(doc.base_path, "http://memory.test");
        assert_eq!(doc.homepage, "/docs/a.md");
        assert!(doc.html.contains(r#"href="./b.md""#));

        let page = doc.to_page();
        assert!(page.contains("<title>/docs/a.md</title>"));
        assert!(page.contains("markdown-link-click"));
    }
}
