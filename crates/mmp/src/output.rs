use std::fmt::Write as _;
use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use mmp_boot::{Operation, Progress};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// Print a single record: `value` as JSON, or `fields` as a two-column table
/// or an indented listing under `title`.
pub fn print_record<T: Serialize>(
    title: &str,
    value: &T,
    fields: &[(&str, String)],
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (name, value) in fields {
                table.add_row(vec![name.to_string(), value.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{title}:");
            let width = fields.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
            for (name, value) in fields {
                println!("  {:<width$}  {value}", format!("{name}:"), width = width + 1);
            }
        }
    }
}

/// Print a list of rows: one JSON object per line, a table, or one
/// space-separated line per row.
pub fn print_rows<T: Serialize>(
    header: &[&str],
    values: &[T],
    rows: Vec<Vec<String>>,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            for value in values {
                print_json(value);
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(header.to_vec());
            for row in rows {
                table.add_row(row);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in rows {
                println!("{}", row.join("  "));
            }
        }
    }
}

/// Payload as text when it is printable UTF-8, otherwise as hex.
pub fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) if !text.chars().any(|c| c.is_control() && c != '\t') => text.to_string(),
        _ => hex(payload),
    }
}

pub fn hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3);
    for (i, byte) in data.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Renders bootloader page progress on stderr, one bar per operation.
pub struct PageProgress {
    bar: ProgressBar,
}

impl PageProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }

    /// Observer to hand to `Bootloader::with_progress`.
    pub fn observer(&self) -> impl FnMut(&Progress) + 'static {
        let bar = self.bar.clone();
        let mut current: Option<Operation> = None;
        move |progress: &Progress| {
            if current != Some(progress.op) {
                current = Some(progress.op);
                bar.reset();
                bar.set_length(progress.total as u64);
                bar.set_message(format!("{} {}", progress.op.name(), progress.region));
            }
            bar.set_position(progress.done as u64);
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for PageProgress {
    fn default() -> Self {
        Self::new()
    }
}
