use crate::cli_args::TreeArgs;
use crate::output::print_data_or_text;
use anyhow::{Context, Result};
use hanuki_core::config::PROJECT_FILES_PATH;
use hanuki_core::{
    DirectoryFilter, FilterMode, GatewayClient, ProjectConfig, TreeNode,
    build_tree_from_paths, determine_project_root, gather_project_paths, load_tree,
    render_text_tree,
};
use log;

pub async fn handle_tree_command(args: &TreeArgs) -> Result<()> {
    let nodes = if args.local {
        local_tree(args)?
    } else {
        remote_tree(args).await?
    };
    let text = render_text_tree(&nodes);
    print_data_or_text(&nodes, Some(text), &args.format_output, "text")
}

fn local_tree(args: &TreeArgs) -> Result<Vec<TreeNode>> {
    let project_root = determine_project_root(args.project.project_root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());

    let config = ProjectConfig::load_or_default(&project_root);
    let gathered = gather_project_paths(&project_root, &config, FilterMode::TreeView)
        .context("Failed to walk project directory")?;
    let paths: Vec<(String, bool)> = gathered
        .into_iter()
        .filter(|p| {
            args.depth
                .is_none_or(|max| p.relative.split('/').count() <= max)
        })
        .map(|p| (p.relative, p.is_dir))
        .collect();
    Ok(build_tree_from_paths(&paths)?)
}

async fn remote_tree(args: &TreeArgs) -> Result<Vec<TreeNode>> {
    let store = GatewayClient::new(&args.gateway.origin)?.with_mount_point(&args.gateway.mount);

    let config = ProjectConfig::load_from_store(&store).await;
    let filter = DirectoryFilter::from_store(&store, &config, FilterMode::TreeView).await;

    load_tree(&store, &filter, PROJECT_FILES_PATH, args.depth)
        .await
        .with_context(|| format!("No directory listing available at {}", store.origin()))
}
