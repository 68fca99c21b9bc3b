use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use diagmux_payload::DiagValue;
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per event.
    Json,
    /// Diagnostic fields as a table.
    Table,
    /// Indented JSON for diagnostics.
    Pretty,
    /// Bare lines and compact JSON values.
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct LogOutput<'a> {
    kind: &'static str,
    line: &'a str,
    timestamp: String,
}

#[derive(Serialize)]
struct DiagnosticOutput<'a> {
    kind: &'static str,
    payload_size: usize,
    value: &'a DiagValue,
    timestamp: String,
}

pub fn print_line(line: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = LogOutput {
                kind: "log",
                line,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty | OutputFormat::Raw => {
            println!("{line}");
        }
    }
}

pub fn print_diagnostic(value: &DiagValue, payload_size: usize, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = DiagnosticOutput {
                kind: "diagnostic",
                payload_size,
                value,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (path, leaf) in flatten(value) {
                table.add_row(vec![path, leaf]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{}",
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            );
        }
        OutputFormat::Raw => {
            println!("{value}");
        }
    }
}

/// Flatten nested values into `(path, rendered leaf)` rows.
///
/// Paths use `a.b` for mapping keys and `a[0]` for sequence items; the root
/// scalar gets the path `value`.
pub fn flatten(value: &DiagValue) -> Vec<(String, String)> {
    let mut rows = Vec::new();
    flatten_into(value, String::new(), &mut rows);
    rows
}

fn flatten_into(value: &DiagValue, path: String, rows: &mut Vec<(String, String)>) {
    match value {
        DiagValue::Mapping(entries) if !entries.is_empty() => {
            for (key, child) in entries {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                flatten_into(child, child_path, rows);
            }
        }
        DiagValue::Sequence(items) if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                let base: &str = if path.is_empty() { "value" } else { path.as_str() };
                flatten_into(child, format!("{base}[{index}]"), rows);
            }
        }
        leaf => {
            let path = if path.is_empty() {
                "value".to_string()
            } else {
                path
            };
            let rendered = match leaf {
                DiagValue::String(text) => text.clone(),
                other => other.to_string(),
            };
            rows.push((path, rendered));
        }
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
