use anyhow::{Context, Result};
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use hanuki_core::PublishReport;
use serde::Serialize;
use std::io::{self, Write};

use crate::cli_args::FormatOutputOpts;

/// Prints `plain_text` for the text format, JSON otherwise.
pub fn print_data_or_text<T: Serialize>(
    data: &T,
    plain_text: Option<String>,
    format_opts: &FormatOutputOpts,
    default_format: &str,
) -> Result<()> {
    let format = format_opts
        .format
        .as_deref()
        .unwrap_or(default_format)
        .to_lowercase();

    match (format.as_str(), plain_text) {
        ("text", Some(text)) => write_to_stdout(&text),
        ("text", None) => write_to_stdout(&serialize_json(data, true)?),
        _ => write_to_stdout(&serialize_json(data, format_opts.pretty)?),
    }
}

pub fn serialize_json<T: Serialize>(data: &T, pretty: bool) -> Result<String> {
    let content = if pretty {
        serde_json::to_string_pretty(data)
    } else {
        serde_json::to_string(data)
    };
    content.context("Failed to serialize output to JSON")
}

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

pub fn print_section_header(title: &str) {
    println!("{}", format!("\n--- {} ---", title).green().bold().underline());
}

pub fn print_path_list(title: &str, paths: &[String]) {
    print_section_header(title);
    if paths.is_empty() {
        println!("{}", "(None)".dimmed());
    } else {
        for p in paths {
            println!("  {}", p.cyan());
        }
    }
}

pub fn print_publish_report_table(report: &PublishReport, site_url: &str) -> Result<()> {
    println!();
    println!("{}", " Published to IPFS ".green().bold().underline());
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Field").fg(Color::Green),
        Cell::new("Value").fg(Color::Green),
    ]);
    let rows = [
        ("CID", report.cid.clone()),
        ("IPFS version", report.node_version.clone()),
        ("API version", report.api_version.clone()),
        ("Files", report.files.to_string()),
        ("Directories", report.directories.to_string()),
        ("Bytes", report.total_bytes.to_string()),
        ("Site", site_url.to_string()),
    ];
    for (field, value) in rows {
        table.add_row(vec![
            Cell::new(field).fg(Color::Cyan),
            Cell::new(value).set_alignment(CellAlignment::Left),
        ]);
    }
    println!("{table}");
    println!();
    Ok(())
}
