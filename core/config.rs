use crate::error::{AppError, Result};
use crate::store::ContentStore;
use log;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use toml::{Table, Value};

pub const CONFIG_FILENAME: &str = "hanuki.toml";
pub const DEFAULT_PAGE: &str = "/ReadMe.md";
pub const PROJECT_FILES_PATH: &str = "/";
pub const DEFAULT_API_VERSION: &str = "v0";
pub const DEFAULT_PROJECT_NAME: &str = "Unnamed Project";
pub const DEFAULT_PROJECT_VERSION: &str = "0.1.0";

/// Effective project configuration, built once from `hanuki.toml`.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ProjectConfig {
    pub project: ProjectInfo,
    pub ipfs: IpfsConfig,
    pub tree_view: TreeViewConfig,
    pub ipfs_publishing: IpfsPublishingConfig,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ProjectInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub authors: Vec<String>,
    pub license: String,
    pub keywords: Vec<String>,
    pub icon: String,
    pub urls: ProjectUrls,
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct ProjectUrls {
    pub repository: String,
    pub documentation: String,
    pub homepage: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct IpfsConfig {
    pub cid: Option<String>,
    pub api_version: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct TreeViewConfig {
    pub use_gitignore: bool,
    pub include: Vec<String>,
    pub ignore: Vec<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct IpfsPublishingConfig {
    pub use_treeview_ignore: bool,
    pub use_gitignore: bool,
    pub include: Vec<String>,
    pub ignore: Vec<String>,
}

/// Which consumer a filter decision is made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterMode {
    TreeView,
    IpfsPublishing,
}

fn default_true() -> bool {
    true
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            project: ProjectInfo::default(),
            ipfs: IpfsConfig::default(),
            tree_view: TreeViewConfig::default(),
            ipfs_publishing: IpfsPublishingConfig::default(),
        }
    }
}
impl Default for ProjectInfo {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROJECT_NAME.to_string(),
            version: DEFAULT_PROJECT_VERSION.to_string(),
            description: String::new(),
            authors: Vec::new(),
            license: String::new(),
            keywords: Vec::new(),
            urls: ProjectUrls::default(),
            icon: String::new(),
        }
    }
}
impl Default for IpfsConfig {
    fn default() -> Self {
        Self {
            cid: None,
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}
impl Default for TreeViewConfig {
    fn default() -> Self {
        Self {
            use_gitignore: default_true(),
            include: Vec::new(),
            ignore: Vec::new(),
        }
    }
}
impl Default for IpfsPublishingConfig {
    fn default() -> Self {
        Self {
            use_treeview_ignore: default_true(),
            use_gitignore: default_true(),
            include: Vec::new(),
            ignore: Vec::new(),
        }
    }
}

impl ProjectConfig {
    /// Builds a configuration from `hanuki.toml` text.
    ///
    /// Values are taken leniently: an empty string or a value of the wrong
    /// type keeps the default for that field. Syntax errors are reported.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let table = parse_config_text(text)?;
        Ok(Self::from_table(&table))
    }

    /// Parses `text`, falling back to the default record with a warning.
    pub fn from_toml_str_or_default(text: &str) -> Self {
        match Self::from_toml_str(text) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to parse {}, using defaults: {}", CONFIG_FILENAME, e);
                Self::default()
            }
        }
    }

    pub fn from_table(table: &Table) -> Self {
        let mut config = Self::default();

        if let Some(project) = section(table, &["project"]) {
            let info = &mut config.project;
            set_string(&mut info.name, project.get("name"));
            set_string(&mut info.version, project.get("version"));
            set_string(&mut info.description, project.get("description"));
            set_string_list(&mut info.authors, project.get("authors"));
            set_string(&mut info.license, project.get("license"));
            set_string_list(&mut info.keywords, project.get("keywords"));
            set_string(&mut info.icon, project.get("icon"));

            if let Some(urls) = project.get("urls").and_then(Value::as_table) {
                set_string(&mut info.urls.repository, urls.get("github"));
                set_string(&mut info.urls.repository, urls.get("repository"));
                set_string(&mut info.urls.documentation, urls.get("documentation"));
                set_string(&mut info.urls.homepage, urls.get("homepage"));
            }
        }

        if let Some(ipfs) = section(table, &["ipfs"]) {
            if let Some(cid) = non_empty_str(ipfs.get("cid")) {
                config.ipfs.cid = Some(cid.to_string());
            }
            set_string(&mut config.ipfs.api_version, ipfs.get("api_version"));
        }

        if let Some(tree) = section(table, &["tree-view", "TreeView"]) {
            let tree_view = &mut config.tree_view;
            set_bool(&mut tree_view.use_gitignore, tree.get("use_gitignore"));
            set_string_list(&mut tree_view.include, tree.get("include"));
            set_string_list(&mut tree_view.ignore, tree.get("ignore"));
        }

        if let Some(publishing) = section(table, &["ipfs-publishing", "IpfsPublishing"]) {
            let ipfs_publishing = &mut config.ipfs_publishing;
            set_bool(
                &mut ipfs_publishing.use_treeview_ignore,
                publishing.get("use_treeview_ignore"),
            );
            set_bool(&mut ipfs_publishing.use_gitignore, publishing.get("use_gitignore"));
            set_string_list(&mut ipfs_publishing.include, publishing.get("include"));
            set_string_list(&mut ipfs_publishing.ignore, publishing.get("ignore"));
        }

        config
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&toml_content).map_err(|e| {
            AppError::TomlParse(format!(
                "Error parsing config file '{}': {}",
                config_path.display(),
                e
            ))
        })
    }

    /// Fetches `/hanuki.toml` from `store`, or the defaults when it cannot be
    /// fetched or parsed.
    pub async fn load_from_store<S>(store: &S) -> Self
    where
        S: ContentStore + ?Sized,
    {
        match store.fetch_file_contents(&format!("/{}", CONFIG_FILENAME)).await {
            Ok(text) => Self::from_toml_str_or_default(&text),
            Err(e) => {
                log::warn!("Could not load {}: {}. Using default configuration.", CONFIG_FILENAME, e);
                Self::default()
            }
        }
    }

    /// Loads `<project_root>/hanuki.toml`, or the defaults when it is missing
    /// or broken.
    pub fn load_or_default(project_root: &Path) -> Self {
        let config_path = project_root.join(CONFIG_FILENAME);
        if !config_path.is_file() {
            log::debug!(
                "No {} found at {}, using defaults",
                CONFIG_FILENAME,
                config_path.display()
            );
            return Self::default();
        }
        match Self::load_from_path(&config_path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("{}. Using default configuration.", e);
                Self::default()
            }
        }
    }

    /// Include and ignore lists that apply to `mode`, in evaluation order.
    pub fn effective_patterns(&self, mode: FilterMode) -> (Vec<String>, Vec<String>) {
        match mode {
            FilterMode::TreeView => (self.tree_view.include.clone(), self.tree_view.ignore.clone()),
            FilterMode::IpfsPublishing => {
                let publishing = &self.ipfs_publishing;
                if publishing.use_treeview_ignore {
                    let include = self
                        .tree_view
                        .include
                        .iter()
                        .chain(&publishing.include)
                        .cloned()
                        .collect();
                    let ignore = self
                        .tree_view
                        .ignore
                        .iter()
                        .chain(&publishing.ignore)
                        .cloned()
                        .collect();
                    (include, ignore)
                } else {
                    (publishing.include.clone(), publishing.ignore.clone())
                }
            }
        }
    }

    pub fn uses_gitignore(&self, mode: FilterMode) -> bool {
        match mode {
            FilterMode::TreeView => self.tree_view.use_gitignore,
            FilterMode::IpfsPublishing => self.ipfs_publishing.use_gitignore,
        }
    }
}

/// Parses configuration text into a raw TOML table.
pub fn parse_config_text(text: &str) -> Result<Table> {
    toml::from_str::<Table>(text).map_err(|e| AppError::TomlParse(e.to_string()))
}

/// Fetches the first present section among `names`.
fn section<'a>(table: &'a Table, names: &[&str]) -> Option<&'a Table> {
    names
        .iter()
        .find_map(|name| table.get(*name).and_then(Value::as_table))
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn set_string(target: &mut String, value: Option<&Value>) {
    if let Some(s) = non_empty_str(value) {
        *target = s.to_string();
    }
}

fn set_bool(target: &mut bool, value: Option<&Value>) {
    if let Some(b) = value.and_then(Value::as_bool) {
        *target = b;
    }
}

fn set_string_list(target: &mut Vec<String>, value: Option<&Value>) {
    if let Some(items) = value.and_then(Value::as_array) {
        *target = items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Integer(i) => Some(i.to_string()),
                Value::Float(f) => Some(f.to_string()),
                Value::Boolean(b) => Some(b.to_string()),
                _ => None,
            })
            .collect();
    }
}

/// Records a published root CID in `<project_root>/hanuki.toml`.
///
/// Other keys are kept. `ipfs.api_version` is set to the default when absent.
/// The file is replaced atomically.
pub fn record_published_cid(project_root: &Path, cid: &str) -> Result<()> {
    let config_path = project_root.join(CONFIG_FILENAME);
    let mut table = if config_path.is_file() {
        let text = fs::read_to_string(&config_path).map_err(|e| AppError::FileRead {
            path: config_path.clone(),
            source: e,
        })?;
        parse_config_text(&text)?
    } else {
        Table::new()
    };

    set_ipfs_cid(&mut table, cid);
    write_table_atomically(&config_path, &table)?;
    log::info!("Recorded CID {} in {}", cid, config_path.display());
    Ok(())
}

pub(crate) fn set_ipfs_cid(table: &mut Table, cid: &str) {
    let ipfs = table
        .entry("ipfs")
        .or_insert_with(|| Value::Table(Table::new()));
    if !ipfs.is_table() {
        *ipfs = Value::Table(Table::new());
    }
    if let Value::Table(ipfs) = ipfs {
        ipfs.insert("cid".to_string(), Value::String(cid.to_string()));
        if !ipfs.get("api_version").is_some_and(Value::is_str) {
            ipfs.insert(
                "api_version".to_string(),
                Value::String(DEFAULT_API_VERSION.to_string()),
            );
        }
    }
}

pub(crate) fn write_table_atomically(path: &Path, table: &Table) -> Result<()> {
    let rendered = toml::to_string_pretty(table)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| CONFIG_FILENAME.to_string());
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

    {
        let mut file = fs::File::create(&tmp_path).map_err(|e| AppError::FileWrite {
            path: tmp_path.clone(),
            source: e,
        })?;
        file.write_all(rendered.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| AppError::FileWrite {
                path: tmp_path.clone(),
                source: e,
            })?;
    }

    fs::rename(&tmp_path, path).map_err(|e| AppError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[tokio::test]
    async fn loads_from_store_or_defaults() {
        use crate::store::memory::MemoryStore;

        let store = MemoryStore::new().with_file("/hanuki.toml", "[project]\nname = \"Remote\"\n");
        assert_eq!(ProjectConfig::load_from_store(&store).await.project.name, "Remote");

        let broken = MemoryStore::new().with_file("/hanuki.toml", "name = = x");
        assert_eq!(ProjectConfig::load_from_store(&broken).await, ProjectConfig::default());
        assert_eq!(
            ProjectConfig::load_from_store(&MemoryStore::new()).await,
            ProjectConfig::default()
        );
    }

    #[test]
    fn missing_or_broken_text_falls_back_to_defaults() {
        let config = ProjectConfig::from_toml_str_or_default("this is = = not toml");
        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.project.name, "Unnamed Project");
        assert_eq!(config.project.version, "0.1.0");
        assert_eq!(config.ipfs.cid, None);
        assert_eq!(config.ipfs.api_version, "v0");
        assert!(config.tree_view.use_gitignore);
        assert!(config.ipfs_publishing.use_treeview_ignore);
        assert!(config.ipfs_publishing.use_gitignore);

        let dir = tempdir().unwrap();
        assert_eq!(ProjectConfig::load_or_default(dir.path()), ProjectConfig::default());
    }

    #[test]
    fn maps_all_sections() {
        let text = indoc! {r#"
            [project]
            name = "Demo"
            version = ""
            authors = ["Ada", "Grace"]
            keywords = "not-an-array"

            [project.urls]
            github = "https://github.com/demo/demo"
            homepage = "https://demo.example"

            [ipfs]
            cid = "bafyroot"

            [tree-view]
            use_gitignore = false
            ignore = ["*.log", "build/"]

            [TreeView]
            ignore = ["never-used"]

            [IpfsPublishing]
            use_treeview_ignore = false
            include = ["build/keep.txt"]
        "#};
        let config = ProjectConfig::from_toml_str(text).unwrap();

        assert_eq!(config.project.name, "Demo");
        assert_eq!(config.project.version, "0.1.0");
        assert_eq!(config.project.authors, vec!["Ada", "Grace"]);
        assert!(config.project.keywords.is_empty());
        assert_eq!(config.project.urls.repository, "https://github.com/demo/demo");
        assert_eq!(config.project.urls.homepage, "https://demo.example");
        assert_eq!(config.ipfs.cid.as_deref(), Some("bafyroot"));
        assert_eq!(config.ipfs.api_version, "v0");
        assert!(!config.tree_view.use_gitignore);
        assert_eq!(config.tree_view.ignore, vec!["*.log", "build/"]);
        assert!(!config.ipfs_publishing.use_treeview_ignore);
        assert!(config.ipfs_publishing.use_gitignore);
        assert_eq!(config.ipfs_publishing.include, vec!["build/keep.txt"]);
    }

    #[test]
    fn publishing_patterns_extend_tree_view_patterns() {
        let text = indoc! {r#"
            [tree-view]
            ignore = ["*.log"]

            [ipfs-publishing]
            ignore = ["drafts/**"]
        "#};
        let config = ProjectConfig::from_toml_str(text).unwrap();
        let (_, ignore) = config.effective_patterns(FilterMode::IpfsPublishing);
        assert_eq!(ignore, vec!["*.log", "drafts/**"]);

        let (_, tree_ignore) = config.effective_patterns(FilterMode::TreeView);
        assert_eq!(tree_ignore, vec!["*.log"]);
    }

    #[test]
    fn empty_cid_is_absent() {
        let config = ProjectConfig::from_toml_str("[ipfs]\ncid = \"\"\n").unwrap();
        assert_eq!(config.ipfs.cid, None);
    }

    #[test]
    fn record_published_cid_keeps_other_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(
            &path,
            indoc! {r#"
                [project]
                name = "Demo"

                [ipfs]
                cid = ""
            "#},
        )
        .unwrap();

        record_published_cid(dir.path(), "bafynew").unwrap();

        let config = ProjectConfig::load_from_path(&path).unwrap();
        assert_eq!(config.project.name, "Demo");
        assert_eq!(config.ipfs.cid.as_deref(), Some("bafynew"));
        assert_eq!(config.ipfs.api_version, "v0");
        assert!(!dir.path().join(".hanuki.toml.tmp").exists());
    }

    #[test]
    fn record_published_cid_creates_missing_file() {
        let dir = tempdir().unwrap();
        record_published_cid(dir.path(), "bafyfresh").unwrap();
        let config = ProjectConfig::load_or_default(dir.path());
        assert_eq!(config.ipfs.cid.as_deref(), Some("bafyfresh"));
    }
}
