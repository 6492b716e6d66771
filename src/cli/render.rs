use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Row as ComfyRow, Table};
use serde::Serialize;
use serde_json::Value;
use terminal_size::{Width as TermWidth, terminal_size};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::error::CheckError;
use crate::executor::ExecutionResult;

use super::{Cli, OutputFormat};

const SUCCESS_TAG: &str = "SUCCESS";
const ERROR_TAG: &str = "ERROR";
const MAX_CELL_WIDTH: usize = 60;

#[derive(Debug, Clone, Serialize)]
pub(super) struct FieldRow {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub(super) struct ErrorRow {
    pub message: String,
    pub locations: String,
    pub path: String,
}

pub(super) trait TableRow {
    const HEADERS: &'static [&'static str];
    fn cells(&self) -> Vec<Cell>;
}

impl TableRow for FieldRow {
    const HEADERS: &'static [&'static str] = &["field", "value"];

    fn cells(&self) -> Vec<Cell> {
        vec![Cell::new(&self.field), Cell::new(&self.value)]
    }
}

impl TableRow for ErrorRow {
    const HEADERS: &'static [&'static str] = &["message", "locations", "path"];

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::new(&self.message),
            Cell::new(&self.locations),
            Cell::new(&self.path),
        ]
    }
}

impl ErrorRow {
    fn from_entry(entry: &Value) -> Self {
        let message = match entry.get("message") {
            Some(Value::String(s)) => s.clone(),
            _ => entry.to_string(),
        };
        let locations = entry
            .get("locations")
            .and_then(Value::as_array)
            .map(|locs| {
                locs.iter()
                    .map(|l| format!("{}:{}", l["line"], l["column"]))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        let path = entry
            .get("path")
            .and_then(Value::as_array)
            .map(|segments| {
                segments
                    .iter()
                    .map(|s| match s {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".")
            })
            .unwrap_or_default();
        Self {
            message,
            locations,
            path,
        }
    }
}

/// Prints the outcome of a validation run and returns its exit code.
pub(super) fn report_outcome(
    cli: &Cli,
    outcome: Result<ExecutionResult, CheckError>,
) -> anyhow::Result<i32> {
    match outcome {
        Ok(result) => {
            let rows = field_rows(result.data());
            emit(cli, SUCCESS_TAG, None, &result.response, rows)?;
            Ok(0)
        }
        Err(err) => report_failure(cli, &err),
    }
}

pub(super) fn report_failure(cli: &Cli, err: &CheckError) -> anyhow::Result<i32> {
    tracing::debug!(kind = ?err.kind(), "run failed");
    let rows = err
        .error_entries()
        .iter()
        .map(ErrorRow::from_entry)
        .collect();
    emit(cli, ERROR_TAG, Some(err.to_string()), &err.payload(), rows)?;
    Ok(1)
}

fn field_rows(data: Option<&Value>) -> Vec<FieldRow> {
    let Some(Value::Object(fields)) = data else {
        return Vec::new();
    };
    fields
        .iter()
        .map(|(field, value)| FieldRow {
            field: field.clone(),
            value: truncate_for_table(&value.to_string(), MAX_CELL_WIDTH),
        })
        .collect()
}

fn emit<T: TableRow>(
    cli: &Cli,
    tag: &str,
    summary: Option<String>,
    payload: &Value,
    rows: Vec<T>,
) -> anyhow::Result<()> {
    match cli.output {
        OutputFormat::Json => {
            println!("{tag} {}", serde_json::to_string(payload)?);
        }
        OutputFormat::Pretty => {
            println!("{tag}");
            println!("{}", serde_json::to_string_pretty(payload)?);
        }
        OutputFormat::Table => {
            match summary {
                Some(s) => println!("{tag} {s}"),
                None => println!("{tag}"),
            }
            if !rows.is_empty() {
                println!("{}", render_table(cli, rows));
            }
        }
    }
    Ok(())
}

fn render_table<T: TableRow>(cli: &Cli, rows: Vec<T>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth);

    if let Some(w) = terminal_width() {
        table.set_width(w);
    }

    table.set_header(ComfyRow::from(
        T::HEADERS
            .iter()
            .map(|h| header_cell(cli, h))
            .collect::<Vec<_>>(),
    ));
    for row in rows {
        table.add_row(ComfyRow::from(row.cells()));
    }
    table
}

pub(super) fn terminal_width() -> Option<u16> {
    if let Ok(cols) = std::env::var("COLUMNS")
        && let Ok(v) = cols.parse::<u16>()
    {
        return Some(v);
    }
    terminal_size().map(|(TermWidth(w), _)| w)
}

/// Cuts `text` to at most `max` display columns, marking the cut with `…`.
pub(super) fn truncate_for_table(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}

fn header_cell(cli: &Cli, text: &str) -> Cell {
    if super::should_color(cli) {
        Cell::new(text)
            .add_attribute(Attribute::Bold)
            .fg(Color::Cyan)
    } else {
        Cell::new(text)
    }
}
