use crate::error::FetchError;
use crate::markdown::MarkdownDocument;
use crate::path::extension;
use crate::store::ContentStore;
use log;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    Code,
    Markdown,
    Html,
    Image,
    Video,
    Audio,
}

impl RendererKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RendererKind::Code => "code",
            RendererKind::Markdown => "markdown",
            RendererKind::Html => "html",
            RendererKind::Image => "image",
            RendererKind::Video => "video",
            RendererKind::Audio => "audio",
        }
    }
}

impl fmt::Display for RendererKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const CLASSIFICATION_TABLE: &[(&str, RendererKind)] = &[
    ("md", RendererKind::Markdown),
    ("html", RendererKind::Html),
    ("htm", RendererKind::Html),
    ("jpg", RendererKind::Image),
    ("jpeg", RendererKind::Image),
    ("png", RendererKind::Image),
    ("gif", RendererKind::Image),
    ("svg", RendererKind::Image),
    ("webp", RendererKind::Image),
    ("mp4", RendererKind::Video),
    ("webm", RendererKind::Video),
    ("ogg", RendererKind::Video),
    ("mov", RendererKind::Video),
    ("mp3", RendererKind::Audio),
    ("wav", RendererKind::Audio),
    ("ogg", RendererKind::Audio),
    ("flac", RendererKind::Audio),
];

// Earlier rows win, so `ogg` stays a video.
static RENDERER_BY_EXTENSION: Lazy<HashMap<&'static str, RendererKind>> = Lazy::new(|| {
    let mut table = HashMap::new();
    for (ext, kind) in CLASSIFICATION_TABLE {
        table.entry(*ext).or_insert(*kind);
    }
    table
});

/// Picks the renderer for `path` by its lower-cased extension.
pub fn classify(path: &str) -> RendererKind {
    let ext = extension(path).to_ascii_lowercase();
    RENDERER_BY_EXTENSION
        .get(ext.as_str())
        .copied()
        .unwrap_or(RendererKind::Code)
}

/// Content of the visible view. Each variant holds only what it renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum View {
    Code { source: String, language: String },
    Markdown(MarkdownDocument),
    Html { url: String },
    Image { url: String },
    Video { url: String, controls: bool },
    Audio { url: String, controls: bool },
}

impl View {
    pub fn kind(&self) -> RendererKind {
        match self {
            View::Code { .. } => RendererKind::Code,
            View::Markdown(_) => RendererKind::Markdown,
            View::Html { .. } => RendererKind::Html,
            View::Image { .. } => RendererKind::Image,
            View::Video { .. } => RendererKind::Video,
            View::Audio { .. } => RendererKind::Audio,
        }
    }
}

/// Builds the view for `path` with the renderer `kind`.
///
/// Code and markdown fetch the file; media and HTML views only reference
/// its URL.
pub async fn load_view<S>(store: &S, path: &str, kind: RendererKind) -> Result<View, FetchError>
where
    S: ContentStore + ?Sized,
{
    log::debug!("Loading {} as {}", path, kind);
    let view = match kind {
        RendererKind::Code => {
            let source = store.fetch_file_contents(path).await?;
            View::Code {
                source,
                language: extension(path).to_ascii_lowercase(),
            }
        }
        RendererKind::Markdown => {
            let source = store.fetch_file_contents(path).await?;
            View::Markdown(MarkdownDocument::new(store, path, source))
        }
        RendererKind::Html => View::Html {
            url: store.file_url(path),
        },
        RendererKind::Image => View::Image {
            url: store.file_url(path),
        },
        RendererKind::Video => View::Video {
            url: store.file_url(path),
            controls: true,
        },
        RendererKind::Audio => View::Audio {
            url: store.file_url(path),
            controls: true,
        },
    };
    Ok(view)
}

/// Inline, dismissible error shown in the content area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBlock {
    pub loader: RendererKind,
    pub message: String,
}

impl ErrorBlock {
    pub fn new(loader: RendererKind, error: &FetchError) -> Self {
        let label = match loader {
            RendererKind::Code | RendererKind::Markdown => "file",
            RendererKind::Html => "HTML file",
            RendererKind::Image => "image file",
            RendererKind::Video => "video file",
            RendererKind::Audio => "audio file",
        };
        Self {
            loader,
            message: format!("Error loading {}: {}", label, error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use pretty_assertions::assert_eq;

    #[test]
    fn classification_is_total() {
        assert_eq!(classify("/ReadMe.md"), RendererKind::Markdown);
        assert_eq!(classify("/ReadMe.MD"), RendererKind::Markdown);
        assert_eq!(classify("/site/page.htm"), RendererKind::Html);
        assert_eq!(classify("/img/logo.SVG"), RendererKind::Image);
        assert_eq!(classify("/media/clip.ogg"), RendererKind::Video);
        assert_eq!(classify("/media/song.flac"), RendererKind::Audio);
        assert_eq!(classify("/src/main.rs"), RendererKind::Code);
        assert_eq!(classify("/Makefile"), RendererKind::Code);
        assert_eq!(classify("/.gitignore"), RendererKind::Code);
        assert_eq!(classify(""), RendererKind::Code);
    }

    #[tokio::test]
    async fn loads_each_kind() {
        let store = MemoryStore::new()
            .with_file("/src/main.RS", "fn main() {}")
            .with_file("/img/a b.png", "");

        let code = load_view(&store, "/src/main.RS", RendererKind::Code).await.unwrap();
        assert_eq!(
            code,
            View::Code {
                source: "fn main() {}".to_string(),
                language: "rs".to_string(),
            }
        );

        let image = load_view(&store, "/img/a b.png", RendererKind::Image).await.unwrap();
        assert_eq!(
            image,
            View::Image {
                url: "http://memory.test/img/a%20b.png".to_string()
            }
        );
        assert_eq!(image.kind(), RendererKind::Image);

        let audio = load_view(&store, "/x.mp3", RendererKind::Audio).await.unwrap();
        assert!(matches!(audio, View::Audio { controls: true, .. }));
    }

    #[tokio::test]
    async fn missing_code_file_is_an_error() {
        let store = MemoryStore::new();
        let err = load_view(&store, "/gone.rs", RendererKind::Code).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        let block = ErrorBlock::new(RendererKind::Code, &err);
        assert_eq!(block.message, "Error loading file: Failed to load /gone.rs: HTTP 404");
    }
}
