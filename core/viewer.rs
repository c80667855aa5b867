//! Navigation controller for the project viewer.
//!
//! [`Viewer`] owns everything the browser page used to keep in globals: the
//! configuration, the tree-view filter, the visible view and the page URL. All
//! state changes go through `&mut self`.

use crate::config::{DEFAULT_PAGE, FilterMode, PROJECT_FILES_PATH, ProjectConfig};
use crate::error::{AppError, FetchError, Result};
use crate::filter::DirectoryFilter;
use crate::markdown::link_target;
use crate::path::{decode_from_url, display_name, encode_for_url, normalize, parent_dir, resolve_absolute};
use crate::render::{self, ErrorBlock, RendererKind, View, classify};
use crate::store::{ContentStore, DirectoryEntry};
use log;
use serde::Serialize;
use url::Url;
use url::form_urlencoded;

/// Query parameter carrying the displayed file.
pub const FILE_PARAM: &str = "file";

/// Receives navigation notifications, like a host page embedding the viewer.
pub trait NavigationListener {
    fn on_site_sub_page_changed(&mut self, path: &str, name: &str);
}

/// Messages a host or the markdown frame can send to the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    Navigate { path: String, name: Option<String> },
    MarkdownLinkClick { href: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub current_path: String,
    /// `None` until the first successful navigation.
    pub active: Option<RendererKind>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            current_path: "/".to_string(),
            active: None,
        }
    }
}

/// A navigation that has started but not yet been committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub generation: u64,
    pub path: String,
    pub kind: RendererKind,
}

impl Navigation {
    pub async fn load<S>(&self, store: &S) -> Result<View, FetchError>
    where
        S: ContentStore + ?Sized,
    {
        render::load_view(store, &self.path, self.kind).await
    }
}

pub struct Viewer<S: ContentStore> {
    store: S,
    config: ProjectConfig,
    tree_filter: DirectoryFilter,
    state: ViewState,
    view: Option<View>,
    errors: Vec<ErrorBlock>,
    page_url: Url,
    page_title: String,
    generation: u64,
    listener: Option<Box<dyn NavigationListener>>,
}

impl<S: ContentStore> Viewer<S> {
    /// Loads the configuration and the tree filter from the store, then
    /// renders the page named by `page_url`.
    pub async fn initialize(store: S, page_url: &str) -> Result<Self> {
        let page_url = parse_page_url(page_url)?;
        let config = ProjectConfig::load_from_store(&store).await;
        log::info!("Viewer configured for project '{}'", config.project.name);
        let tree_filter = DirectoryFilter::from_store(&store, &config, FilterMode::TreeView).await;

        let mut viewer = Self {
            store,
            config,
            tree_filter,
            state: ViewState::default(),
            view: None,
            errors: Vec::new(),
            page_url,
            page_title: String::new(),
            generation: 0,
            listener: None,
        };
        viewer.render_project_page().await;
        Ok(viewer)
    }

    pub fn set_listener(&mut self, listener: Box<dyn NavigationListener>) {
        self.listener = Some(listener);
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn tree_filter(&self) -> &DirectoryFilter {
        &self.tree_filter
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    pub fn errors(&self) -> &[ErrorBlock] {
        &self.errors
    }

    pub fn page_url(&self) -> &Url {
        &self.page_url
    }

    pub fn page_title(&self) -> &str {
        &self.page_title
    }

    pub fn site_title(&self) -> &str {
        &self.config.project.name
    }

    /// Gateway URL of `project.icon`, when one is configured.
    pub fn icon_url(&self) -> Option<String> {
        let icon = self.config.project.icon.as_str();
        (!icon.is_empty()).then(|| self.store.file_url(icon))
    }

    /// Target of the repository button; hidden when unset.
    pub fn repository_url(&self) -> Option<&str> {
        let repository = self.config.project.urls.repository.as_str();
        (!repository.is_empty()).then_some(repository)
    }

    /// File name offered for the source download, e.g. `My_Site.zip`.
    pub fn source_archive_name(&self) -> String {
        let safe: String = self
            .config
            .project
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!("{}.zip", safe)
    }

    /// Shows the file named in the page URL, or [`DEFAULT_PAGE`] when it is
    /// absent or does not exist.
    ///
    /// The URL value is always taken relative to the project root, never to
    /// the page currently shown.
    pub async fn render_project_page(&mut self) -> bool {
        let requested = self
            .url_file()
            .map(|path| resolve_absolute(&path, PROJECT_FILES_PATH));
        let exists = match &requested {
            Some(path) => self.store.resource_exists(path).await,
            None => false,
        };
        let file = match requested {
            Some(path) if exists => path,
            other => {
                log::debug!("Requested page {:?} not found, showing {}", other, DEFAULT_PAGE);
                DEFAULT_PAGE.to_string()
            }
        };

        self.push_url(&file);
        let loaded = self.load_project_page(&file).await;
        self.page_title = file;
        loaded
    }

    /// Reproduces the view described by `url` alone.
    pub async fn restore_from_url(&mut self, url: &str) -> Result<bool> {
        self.page_url = parse_page_url(url)?;
        Ok(self.render_project_page().await)
    }

    /// Resolves `path` against the current directory, loads it and records
    /// it in the page URL. Returns whether the load succeeded.
    pub async fn load_project_page(&mut self, path: &str) -> bool {
        let navigation = self.begin_navigation(path);
        let result = navigation.load(&self.store).await;
        self.commit_navigation(navigation, result)
    }

    pub fn begin_navigation(&mut self, path: &str) -> Navigation {
        let current_dir = parent_dir(&self.state.current_path);
        let resolved = resolve_absolute(path, &current_dir);
        self.generation += 1;
        let navigation = Navigation {
            generation: self.generation,
            kind: classify(&resolved),
            path: resolved,
        };
        log::debug!(
            "Navigation #{} to {} ({})",
            navigation.generation,
            navigation.path,
            navigation.kind
        );
        navigation
    }

    /// Applies a finished navigation. Results of superseded navigations are
    /// dropped.
    pub fn commit_navigation(&mut self, navigation: Navigation, result: Result<View, FetchError>) -> bool {
        if navigation.generation != self.generation {
            log::debug!(
                "Discarding stale navigation #{} to {} (latest is #{})",
                navigation.generation,
                navigation.path,
                self.generation
            );
            return false;
        }

        let loaded = match result {
            Ok(view) => {
                self.errors.clear();
                self.state.current_path = navigation.path.clone();
                self.state.active = Some(navigation.kind);
                self.view = Some(view);
                true
            }
            Err(e) => {
                log::warn!("{}", e);
                self.errors.retain(|block| block.loader != navigation.kind);
                self.errors.push(ErrorBlock::new(navigation.kind, &e));
                false
            }
        };
        self.push_url(&navigation.path);
        loaded
    }

    /// Follows a link clicked inside a rendered markdown document.
    ///
    /// A target that does not exist but has a `.md` sibling navigates to the
    /// sibling.
    pub async fn follow_markdown_link(&mut self, href: &str) -> bool {
        let Some(target) = link_target(href) else {
            log::trace!("Leaving external link alone: {}", href);
            return false;
        };
        if target.contains('=') {
            log::debug!("Ignoring renderer query link: {}", target);
            return false;
        }
        let decoded = decode_from_url(&target);

        let current_dir = parent_dir(&self.state.current_path);
        let mut full_path = resolve_absolute(&decoded, &current_dir);
        if !self.store.resource_exists(&full_path).await {
            let with_extension = format!("{}.md", full_path);
            if self.store.resource_exists(&with_extension).await {
                full_path = with_extension;
            }
        }
        log::info!("Markdown link clicked: {}, navigating to: {}", href, full_path);

        self.push_url(&full_path);
        self.load_project_page(&full_path).await
    }

    /// Switches to `file` (relative to the project root) and notifies the
    /// listener. `name` defaults to the file name without extensions.
    pub async fn change_site_subpage(&mut self, file: &str, name: Option<&str>) -> bool {
        let name = match name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => display_name(file).to_string(),
        };
        let path = normalize(&format!("/{}", file));
        log::info!("Changing site page to: {}", path);

        let loaded = self.load_project_page(&path).await;
        self.push_url(&path);
        self.page_title = path.clone();

        if let Some(listener) = self.listener.as_mut() {
            listener.on_site_sub_page_changed(&path, &name);
        }
        loaded
    }

    pub async fn handle_event(&mut self, event: NavigationEvent) -> bool {
        match event {
            NavigationEvent::Navigate { path, name } => {
                self.change_site_subpage(&path, name.as_deref()).await
            }
            NavigationEvent::MarkdownLinkClick { href } => self.follow_markdown_link(&href).await,
        }
    }

    /// Lists `dir` with the tree-view policy applied.
    pub async fn list_tree_dir(&self, dir: &str) -> Option<Vec<DirectoryEntry>> {
        let entries = self.store.list_directory(dir).await?;
        Some(self.tree_filter.filter_entries(entries, dir))
    }

    pub fn dismiss_error(&mut self, index: usize) -> Option<ErrorBlock> {
        if index < self.errors.len() {
            Some(self.errors.remove(index))
        } else {
            None
        }
    }

    /// Decoded `file` query value of the page URL. A `+` is read as a space,
    /// as browsers write it; a literal plus arrives as `%2B`.
    fn url_file(&self) -> Option<String> {
        self.page_url.query().and_then(|query| {
            query
                .split('&')
                .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
                .find(|(key, _)| *key == FILE_PARAM)
                .map(|(_, value)| decode_from_url(&value.replace('+', " ")))
                .filter(|value| !value.is_empty())
        })
    }

    /// Writes `path` into the `file` parameter, keeping the others.
    fn push_url(&mut self, path: &str) {
        let encoded = encode_for_url(path);
        let mut parts = Vec::new();
        let mut replaced = false;

        for (key, value) in self.page_url.query_pairs() {
            if key == FILE_PARAM {
                if !replaced {
                    parts.push(format!("{}={}", FILE_PARAM, encoded));
                    replaced = true;
                }
                continue;
            }
            parts.push(
                form_urlencoded::Serializer::new(String::new())
                    .append_pair(&key, &value)
                    .finish(),
            );
        }
        if !replaced {
            parts.push(format!("{}={}", FILE_PARAM, encoded));
        }

        self.page_url.set_query(Some(&parts.join("&")));
        log::trace!("Page URL is now {}", self.page_url);
    }
}

fn parse_page_url(page_url: &str) -> Result<Url> {
    Url::parse(page_url).map_err(|e| AppError::InvalidUrl {
        url: page_url.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    const PAGE: &str = "http://site.test/index.html";

    fn project() -> MemoryStore {
        MemoryStore::new()
            .with_file("/ReadMe.md", "# Demo\n\nSee [docs](./docs/index.md).")
            .with_file("/src/main.rs", "fn main() {}")
            .with_file("/docs/index.md", "[foo](./foo)")
            .with_file("/docs/foo.md", "# Foo")
            .with_file("/media/clip.ogg", "")
    }

    fn file_param(viewer: &Viewer<MemoryStore>) -> Option<String> {
        viewer.page_url().query().and_then(|q| {
            q.split('&')
                .find_map(|pair| pair.strip_prefix("file=").map(str::to_string))
        })
    }

    #[tokio::test]
    async fn missing_page_falls_back_to_readme() {
        let store = MemoryStore::new()
            .with_file("/ReadMe.md", "# Hello")
            .with_dir("/src");
        let viewer = Viewer::initialize(store, &format!("{}?file=/missing.txt", PAGE))
            .await
            .unwrap();

        assert_eq!(viewer.config().project.name, "Unnamed Project");
        assert_eq!(viewer.state().current_path, "/ReadMe.md");
        assert_eq!(viewer.state().active, Some(RendererKind::Markdown));
        assert_eq!(file_param(&viewer).as_deref(), Some("/ReadMe.md"));
        assert_eq!(viewer.page_title(), "/ReadMe.md");
        assert!(matches!(viewer.view(), Some(View::Markdown(_))));
    }

    #[tokio::test]
    async fn restores_existing_page_from_url() {
        let viewer = Viewer::initialize(project(), &format!("{}?lang=en&file=/src/main.rs", PAGE))
            .await
            .unwrap();
        assert_eq!(viewer.state().active, Some(RendererKind::Code));
        assert_eq!(
            viewer.page_url().as_str(),
            "http://site.test/index.html?lang=en&file=/src/main.rs"
        );
    }

    #[tokio::test]
    async fn project_header_comes_from_config() {
        let store = project().with_file(
            "/hanuki.toml",
            indoc! {r#"
                [project]
                name = "Déjà vu: notes/2024"
                icon = "assets/logo.png"

                [project.urls]
                repository = "https://example.com/repo"
            "#},
        );
        let viewer = Viewer::initialize(store, PAGE).await.unwrap();
        assert_eq!(
            viewer.icon_url().as_deref(),
            Some("http://memory.test/assets/logo.png")
        );
        assert_eq!(viewer.repository_url(), Some("https://example.com/repo"));
        assert_eq!(viewer.source_archive_name(), "D_j__vu__notes_2024.zip");

        let plain = Viewer::initialize(project(), PAGE).await.unwrap();
        assert_eq!(plain.icon_url(), None);
        assert_eq!(plain.repository_url(), None);
        assert_eq!(plain.source_archive_name(), "Unnamed_Project.zip");
    }

    #[tokio::test]
    async fn url_file_is_relative_to_the_project_root() {
        let store = project().with_file("/docs/a.md", "# A");
        let mut viewer = Viewer::initialize(store, PAGE).await.unwrap();
        assert!(viewer.load_project_page("/docs/index.md").await);

        let loaded = viewer
            .restore_from_url(&format!("{}?file=docs/a.md", PAGE))
            .await
            .unwrap();
        assert!(loaded);
        assert_eq!(viewer.state().current_path, "/docs/a.md");
        assert_eq!(file_param(&viewer).as_deref(), Some("/docs/a.md"));
        assert!(viewer.errors().is_empty());

        let loaded = viewer
            .restore_from_url(&format!("{}?file=foo.md", PAGE))
            .await
            .unwrap();
        assert!(loaded);
        assert_eq!(viewer.state().current_path, "/ReadMe.md");
        assert_eq!(file_param(&viewer).as_deref(), Some("/ReadMe.md"));
    }

    #[tokio::test]
    async fn browser_written_urls_restore() {
        let store = project().with_file("/My Notes.md", "# Notes").with_file("/a+b.md", "# Plus");
        let mut viewer = Viewer::initialize(store, &format!("{}?file=/My+Notes.md", PAGE))
            .await
            .unwrap();
        assert_eq!(viewer.state().current_path, "/My Notes.md");
        assert_eq!(file_param(&viewer).as_deref(), Some("/My%20Notes.md"));

        viewer
            .restore_from_url(&format!("{}?file=%2Fa%2Bb.md", PAGE))
            .await
            .unwrap();
        assert_eq!(viewer.state().current_path, "/a+b.md");
    }

    #[tokio::test]
    async fn markdown_links_resolve_against_current_directory() {
        let mut viewer = Viewer::initialize(project(), PAGE).await.unwrap();
        assert!(viewer.change_site_subpage("docs/index.md", None).await);
        assert_eq!(viewer.state().current_path, "/docs/index.md");

        assert!(viewer.follow_markdown_link("./foo").await);
        assert_eq!(viewer.state().current_path, "/docs/foo.md");
        assert_eq!(viewer.state().active, Some(RendererKind::Markdown));
        assert_eq!(file_param(&viewer).as_deref(), Some("/docs/foo.md"));

        assert!(!viewer.follow_markdown_link("https://example.com").await);
        assert!(!viewer.follow_markdown_link("?lang=de").await);
        assert_eq!(viewer.state().current_path, "/docs/foo.md");
    }

    #[tokio::test]
    async fn existing_target_is_not_given_an_extension() {
        let store = project().with_file("/docs/foo", "plain text");
        let mut viewer = Viewer::initialize(store, PAGE).await.unwrap();
        viewer.change_site_subpage("/docs/index.md", None).await;
        assert!(viewer.follow_markdown_link("#/./foo").await);
        assert_eq!(viewer.state().current_path, "/docs/foo");
        assert_eq!(viewer.state().active, Some(RendererKind::Code));
    }

    #[tokio::test]
    async fn loading_twice_is_idempotent() {
        let mut viewer = Viewer::initialize(project(), PAGE).await.unwrap();
        viewer.load_project_page("/docs/index.md").await;
        let state = viewer.state().clone();
        let url = viewer.page_url().clone();

        viewer.load_project_page("/docs/index.md").await;
        assert_eq!(viewer.state(), &state);
        assert_eq!(viewer.page_url(), &url);
    }

    #[tokio::test]
    async fn stale_navigation_is_discarded() {
        let mut viewer = Viewer::initialize(project(), PAGE).await.unwrap();

        let slow = viewer.begin_navigation("/src/main.rs");
        let fast = viewer.begin_navigation("/docs/foo.md");

        let fast_result = fast.load(viewer.store()).await;
        assert!(viewer.commit_navigation(fast, fast_result));

        let slow_result = slow.load(viewer.store()).await;
        assert!(!viewer.commit_navigation(slow, slow_result));

        assert_eq!(viewer.state().current_path, "/docs/foo.md");
        assert_eq!(file_param(&viewer).as_deref(), Some("/docs/foo.md"));
    }

    #[tokio::test]
    async fn failed_loads_keep_the_view_and_replace_their_own_errors() {
        let store = project()
            .with_failing_file("/broken.rs")
            .with_failing_file("/also-broken.rs");
        let mut viewer = Viewer::initialize(store, PAGE).await.unwrap();

        assert!(!viewer.load_project_page("/broken.rs").await);
        assert!(!viewer.load_project_page("/also-broken.rs").await);
        assert_eq!(viewer.errors().len(), 1);
        assert_eq!(viewer.errors()[0].loader, RendererKind::Code);
        assert!(viewer.errors()[0].message.contains("HTTP 500"));
        assert_eq!(viewer.state().current_path, "/ReadMe.md");
        assert_eq!(viewer.state().active, Some(RendererKind::Markdown));
        assert_eq!(file_param(&viewer).as_deref(), Some("/also-broken.rs"));

        assert!(viewer.dismiss_error(0).is_some());
        assert!(viewer.errors().is_empty());

        viewer.load_project_page("/broken.rs").await;
        assert!(viewer.load_project_page("/media/clip.ogg").await);
        assert!(viewer.errors().is_empty());
        assert_eq!(viewer.state().active, Some(RendererKind::Video));
    }

    struct Recorder(Arc<Mutex<Vec<(String, String)>>>);

    impl NavigationListener for Recorder {
        fn on_site_sub_page_changed(&mut self, path: &str, name: &str) {
            if let Ok(mut calls) = self.0.lock() {
                calls.push((path.to_string(), name.to_string()));
            }
        }
    }

    #[tokio::test]
    async fn navigate_events_notify_the_listener() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut viewer = Viewer::initialize(project(), PAGE).await.unwrap();
        viewer.set_listener(Box::new(Recorder(calls.clone())));

        viewer
            .handle_event(NavigationEvent::Navigate {
                path: "//src//main.rs".to_string(),
                name: None,
            })
            .await;
        viewer
            .handle_event(NavigationEvent::Navigate {
                path: "docs/foo.md".to_string(),
                name: Some("Foo page".to_string()),
            })
            .await;
        viewer
            .handle_event(NavigationEvent::MarkdownLinkClick {
                href: "#/./index.md".to_string(),
            })
            .await;

        assert_eq!(viewer.state().current_path, "/docs/index.md");
        assert_eq!(viewer.page_title(), "/docs/foo.md");
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                ("/src/main.rs".to_string(), "main".to_string()),
                ("/docs/foo.md".to_string(), "Foo page".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn tree_listing_uses_config_and_gitignore() {
        let store = project()
            .with_file("/index.html", "<html></html>")
            .with_file("/_hanuki/css/hanuki.css", "")
            .with_file("/.gitignore", "*.log\n")
            .with_file("/debug.log", "")
            .with_file("/notes.tmp", "")
            .with_file(
                "/hanuki.toml",
                indoc! {r#"
                    [project]
                    name = "Demo"

                    [tree-view]
                    ignore = ["*.tmp", "media/"]
                "#},
            );
        let viewer = Viewer::initialize(store, PAGE).await.unwrap();
        assert_eq!(viewer.site_title(), "Demo");

        let names: Vec<String> = viewer
            .list_tree_dir("/")
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(names, vec![".gitignore", "ReadMe.md", "docs", "src"]);
        assert_eq!(viewer.list_tree_dir("/nowhere").await, None);
    }

    #[tokio::test]
    async fn rejects_bad_page_urls() {
        assert!(Viewer::initialize(project(), "not a url").await.is_err());
    }
}
