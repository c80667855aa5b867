mod cli_args;
mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use hanuki_core::AppError;
use log;
use std::process;

use cli_args::{Cli, Commands};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = match e.downcast_ref::<AppError>() {
                Some(AppError::TomlParse(_)) => 1,
                Some(AppError::TomlSerialize(_)) => 1,
                Some(AppError::Io(_)) => 2,
                Some(AppError::FileRead { .. }) => 2,
                Some(AppError::FileWrite { .. }) => 2,
                Some(AppError::DirCreation { .. }) => 2,
                Some(AppError::Asset(_)) => 2,
                Some(AppError::NotInstalled(_)) => 3,
                Some(AppError::Http(_)) => 4,
                Some(AppError::Storage(_)) => 4,
                Some(AppError::InvalidUrl { .. }) => 5,
                Some(AppError::InvalidArgument(_)) => 5,
                Some(AppError::JsonSerialize(_)) => 6,
                Some(_) => 1,
                None => 1,
            };

            if !quiet || exit_code == 1 || exit_code == 5 {
                eprintln!("{} {:#}\n", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }

            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    match command {
        Commands::Init(args) => {
            log::debug!("Executing 'init' command...");
            commands::init::handle_init_command(&args, quiet)?;
        }
        Commands::Update(args) => {
            log::debug!("Executing 'update' command...");
            commands::update::handle_update_command(&args, quiet)?;
        }
        Commands::Publish(args) => {
            log::debug!("Executing 'publish' command...");
            runtime.block_on(commands::publish::handle_publish_command(&args, quiet))?;
        }
        Commands::Tree(args) => {
            log::debug!("Executing 'tree' command...");
            runtime.block_on(commands::tree::handle_tree_command(&args))?;
        }
        Commands::Open(args) => {
            log::debug!("Executing 'open' command...");
            runtime.block_on(commands::open::handle_open_command(&args, quiet))?;
        }
        Commands::Check(args) => {
            log::debug!("Executing 'check' command...");
            commands::check::handle_check_command(&args)?;
        }
        Commands::Completion(args) => {
            log::debug!("Executing 'completion' command...");
            commands::completion::handle_completion_command(&args, quiet)?;
        }
    }
    Ok(())
}
