use crate::cli_args::InitArgs;
use anyhow::{Context, Result};
use colored::*;
use hanuki_core::{InstallOutcome, determine_project_root, init_project};
use log;

pub fn handle_init_command(args: &InitArgs, quiet: bool) -> Result<()> {
    let project_root = determine_project_root(args.project.project_root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());

    let outcome = init_project(&project_root)
        .with_context(|| format!("Failed to install Hanuki in {}", project_root.display()))?;

    if quiet {
        return Ok(());
    }
    match outcome {
        InstallOutcome::AlreadyInstalled => {
            println!(
                "{} Hanuki is already installed in {}. Use {} to refresh the viewer files.",
                "ℹ️".blue(),
                project_root.display().to_string().cyan(),
                "hanuki update".bold()
            );
        }
        InstallOutcome::Installed { files } => {
            for file in &files {
                println!("  {} {}", "+".green(), file.dimmed());
            }
            println!(
                "{} Hanuki installed in {}",
                "✅".green(),
                project_root.display().to_string().blue()
            );
        }
    }
    Ok(())
}
