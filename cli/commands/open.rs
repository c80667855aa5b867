use crate::cli_args::OpenArgs;
use crate::output::{serialize_json, write_to_stdout};
use anyhow::{Context, Result};
use colored::*;
use hanuki_core::filter::INDEX_FILE;
use hanuki_core::markdown::escape_html as escape;
use hanuki_core::{ErrorBlock, GatewayClient, NavigationEvent, View, ViewState, Viewer};
use log;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct OpenOutput<'a> {
    site_title: &'a str,
    page_title: &'a str,
    page_url: &'a str,
    icon_url: Option<String>,
    repository_url: Option<&'a str>,
    source_archive_name: String,
    state: &'a ViewState,
    view: Option<&'a View>,
    errors: &'a [ErrorBlock],
}

pub async fn handle_open_command(args: &OpenArgs, quiet: bool) -> Result<()> {
    let store = GatewayClient::new(&args.gateway.origin)?.with_mount_point(&args.gateway.mount);
    let page_url = match &args.page_url {
        Some(url) => url.clone(),
        None => format!("{}/{}", store.origin(), INDEX_FILE),
    };
    log::info!("Opening viewer page {}", page_url);

    let mut viewer = Viewer::initialize(store, &page_url)
        .await
        .context("Failed to initialize viewer")?;

    if let Some(file) = &args.file {
        viewer
            .handle_event(NavigationEvent::Navigate {
                path: file.clone(),
                name: None,
            })
            .await;
    }

    match args.format.as_str() {
        "json" => {
            let output = OpenOutput {
                site_title: viewer.site_title(),
                page_title: viewer.page_title(),
                page_url: viewer.page_url().as_str(),
                icon_url: viewer.icon_url(),
                repository_url: viewer.repository_url(),
                source_archive_name: viewer.source_archive_name(),
                state: viewer.state(),
                view: viewer.view(),
                errors: viewer.errors(),
            };
            write_to_stdout(&serialize_json(&output, true)?)
        }
        "html" => {
            print_errors(viewer.errors(), quiet);
            write_to_stdout(&view_html(viewer.view()))
        }
        _ => {
            print_errors(viewer.errors(), quiet);
            if !quiet {
                eprintln!(
                    "{} {} {}",
                    viewer.site_title().bold(),
                    "›".dimmed(),
                    viewer.page_title().cyan()
                );
            }
            write_to_stdout(&view_text(viewer.view()))
        }
    }
}

fn print_errors(errors: &[ErrorBlock], quiet: bool) {
    if quiet {
        return;
    }
    for block in errors {
        eprintln!("{} [{}] {}", "⚠️".yellow(), block.loader, block.message.red());
    }
}

fn view_text(view: Option<&View>) -> String {
    match view {
        None => String::new(),
        Some(View::Code { source, .. }) => source.clone(),
        Some(View::Markdown(document)) => document.source.clone(),
        Some(View::Html { url }) | Some(View::Image { url }) => url.clone(),
        Some(View::Video { url, .. }) | Some(View::Audio { url, .. }) => url.clone(),
    }
}

fn view_html(view: Option<&View>) -> String {
    match view {
        None => String::new(),
        Some(View::Markdown(document)) => document.to_page(),
        Some(View::Code { source, language }) => format!(
            "<pre><code class=\"language-{}\">{}</code></pre>",
            language,
            escape(source)
        ),
        Some(View::Html { url }) => format!("<iframe src=\"{}\"></iframe>", escape(url)),
        Some(View::Image { url }) => format!("<img src=\"{}\" alt=\"\">", escape(url)),
        Some(View::Video { url, controls }) => media_tag("video", url, *controls),
        Some(View::Audio { url, controls }) => media_tag("audio", url, *controls),
    }
}

fn media_tag(tag: &str, url: &str, controls: bool) -> String {
    let controls = if controls { " controls" } else { "" };
    format!("<{tag} src=\"{}\"{controls}></{tag}>", escape(url))
}
