pub mod config;
pub mod error;
pub mod filter;
pub mod gather;
pub mod install;
pub mod markdown;
pub mod path;
pub mod publish;
pub mod render;
pub mod store;
pub mod tree;
pub mod viewer;

pub use config::{FilterMode, IpfsConfig, ProjectConfig, record_published_cid};
pub use error::{AppError, FetchError, Result};
pub use filter::{DirectoryFilter, filter_entries, should_ignore};
pub use gather::{GatheredPath, determine_project_root, gather_project_paths};
pub use install::{InstallOutcome, UpdateOutcome, init_project, update_project};
pub use markdown::MarkdownDocument;
pub use publish::{KuboClient, PublishReport, StorageApi, UploadEntry, publish_project};
pub use render::{ErrorBlock, RendererKind, View, classify};
pub use store::{ContentStore, DirectoryEntry, GatewayClient};
pub use tree::{NodeType, TreeNode, build_tree_from_paths, load_tree, render_text_tree};
pub use viewer::{NavigationEvent, NavigationListener, ViewState, Viewer};
