use crate::cli_args::UpdateArgs;
use anyhow::{Context, Result};
use colored::*;
use hanuki_core::{AppError, UpdateOutcome, determine_project_root, update_project};
use log;

pub fn handle_update_command(args: &UpdateArgs, quiet: bool) -> Result<()> {
    let project_root = determine_project_root(args.project.project_root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());

    match update_project(&project_root)? {
        UpdateOutcome::NotInstalled => {
            anyhow::bail!(AppError::NotInstalled(project_root));
        }
        UpdateOutcome::Updated { files } => {
            if !quiet {
                println!(
                    "{} Updated {} viewer files in {} (hanuki.toml kept)",
                    "✅".green(),
                    files.len().to_string().cyan(),
                    project_root.display().to_string().blue()
                );
            }
        }
    }
    Ok(())
}
