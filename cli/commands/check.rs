use crate::cli_args::CheckArgs;
use crate::output::{print_data_or_text, print_path_list, print_section_header};
use anyhow::{Context, Result};
use colored::*;
use hanuki_core::publish::is_installed;
use hanuki_core::{FilterMode, GatheredPath, ProjectConfig, determine_project_root, gather_project_paths};
use log;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct CheckInfo<'a> {
    installed: bool,
    effective_config: &'a ProjectConfig,
    tree_view_paths: Vec<String>,
    publishing_paths: Vec<String>,
}

pub fn handle_check_command(args: &CheckArgs) -> Result<()> {
    let project_root = determine_project_root(args.project.project_root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());

    let config = ProjectConfig::load_or_default(&project_root);
    let tree_view = gather_project_paths(&project_root, &config, FilterMode::TreeView)
        .context("Failed to gather tree-view paths")?;
    let publishing = gather_project_paths(&project_root, &config, FilterMode::IpfsPublishing)
        .context("Failed to gather publishing paths")?;

    let info = CheckInfo {
        installed: is_installed(&project_root),
        effective_config: &config,
        tree_view_paths: display_paths(&tree_view),
        publishing_paths: display_paths(&publishing),
    };

    if args.format_output.format.as_deref().unwrap_or("text") == "text" {
        print_check_info_pretty(&info)
    } else {
        print_data_or_text(&info, None, &args.format_output, "json")
    }
}

fn display_paths(paths: &[GatheredPath]) -> Vec<String> {
    paths
        .iter()
        .map(|p| {
            if p.is_dir {
                format!("{}/", p.relative)
            } else {
                p.relative.clone()
            }
        })
        .collect()
}

fn print_check_info_pretty(info: &CheckInfo) -> Result<()> {
    print_section_header("Installation");
    if info.installed {
        println!("  {}", "Viewer installed".green());
    } else {
        println!("  {} (run {})", "Viewer not installed".yellow(), "hanuki init".bold());
    }

    print_section_header("Effective Configuration");
    let config_toml = toml::to_string_pretty(info.effective_config)
        .context("Failed to serialize effective config to TOML")?;
    println!("{}", config_toml);

    print_path_list("Tree View", &info.tree_view_paths);
    print_path_list("IPFS Publishing", &info.publishing_paths);
    println!();
    Ok(())
}
