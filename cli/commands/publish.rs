use crate::cli_args::PublishArgs;
use crate::output::{print_data_or_text, print_publish_report_table};
use anyhow::{Context, Result};
use hanuki_core::{KuboClient, PublishReport, determine_project_root, publish_project};
use log;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct PublishOutput<'a> {
    #[serde(flatten)]
    report: &'a PublishReport,
    site_url: String,
}

pub async fn handle_publish_command(args: &PublishArgs, quiet: bool) -> Result<()> {
    let project_root = determine_project_root(args.project.project_root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());

    let client = KuboClient::new(&args.api)
        .with_context(|| format!("Invalid IPFS API URL '{}'", args.api))?;
    let report = publish_project(&client, &project_root)
        .await
        .context("Failed to publish project to IPFS")?;

    let site_url = format!("{}/ipfs/{}/", args.gateway.trim_end_matches('/'), report.cid);
    let is_text = args.format_output.format.as_deref().unwrap_or("text") == "text";
    if is_text {
        if !quiet {
            print_publish_report_table(&report, &site_url)?;
        } else {
            println!("{}", report.cid);
        }
        return Ok(());
    }

    let output = PublishOutput {
        report: &report,
        site_url,
    };
    print_data_or_text(&output, None, &args.format_output, "json")
}
