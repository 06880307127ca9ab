// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use rust_xlsxwriter::{Color, DocProperties, Format, FormatAlign, FormatBorder, Workbook};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use time::Date;
use time::macros::format_description;
use tracing::{info, warn};

pub const SHEET_NAME: &str = "Patients";
pub const FILE_STEM: &str = "patient-list";
const PLACEHOLDER: &str = "-";
const MIN_COLUMN_WIDTH: usize = 10;
const HEADER_FILL: u32 = 0xE0E0E0;

pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub data: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Excel,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub success: bool,
    pub path: PathBuf,
    pub format: ExportFormat,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub recovered: bool,
}

/// Rejects empty exports and non-object rows; replaces `null` and strings
/// carrying `NaN`/`undefined` with `-`.
pub fn clean_rows(rows: &[Value]) -> Result<Vec<Row>> {
    if rows.is_empty() {
        bail!("no rows to export -- load a patient list first");
    }

    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let object = row
                .as_object()
                .ok_or_else(|| anyhow!("export row {index} is not an object"))?;
            Ok(object
                .iter()
                .map(|(key, value)| (key.clone(), clean_value(value)))
                .collect())
        })
        .collect()
}

fn clean_value(value: &Value) -> Value {
    match value {
        Value::Null => Value::String(PLACEHOLDER.to_owned()),
        Value::String(text) if text.contains("NaN") || text.contains("undefined") => {
            Value::String(PLACEHOLDER.to_owned())
        }
        other => other.clone(),
    }
}

/// Column order is the key order of the first row.
pub fn headers(rows: &[Row]) -> Vec<String> {
    rows.first()
        .map(|row| row.keys().cloned().collect())
        .unwrap_or_default()
}

pub fn default_file_name(date: Date, extension: &str) -> Result<String> {
    let stamp = date
        .format(format_description!("[year][month][day]"))
        .context("format export date")?;
    Ok(format!("{FILE_STEM}_{stamp}.{extension}"))
}

pub fn is_xlsx_path(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("xlsx"))
}

pub fn to_csv(rows: &[Row]) -> String {
    let headers = headers(rows);
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(headers.join(","));
    for row in rows {
        let cells = headers
            .iter()
            .map(|header| csv_cell(row.get(header)))
            .collect::<Vec<_>>();
        lines.push(cells.join(","));
    }
    lines.join("\n")
}

fn csv_cell(value: Option<&Value>) -> String {
    match value {
        None => quote(PLACEHOLDER),
        Some(Value::String(text)) => quote(text),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(Value::Null) => String::new(),
        Some(other) => quote(&other.to_string()),
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

pub fn write_csv(path: &Path, rows: &[Row]) -> Result<()> {
    fs::write(path, to_csv(rows)).with_context(|| format!("write CSV file {}", path.display()))
}

pub fn write_xlsx(path: &Path, rows: &[Row]) -> Result<()> {
    let headers = headers(rows);
    let mut workbook = Workbook::new();
    workbook.set_properties(&DocProperties::new().set_author("Dermaview"));

    let header_format = Format::new()
        .set_bold()
        .set_font_size(12.0)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_border(FormatBorder::Thin);
    let cell_format = Format::new().set_border(FormatBorder::Thin);

    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(SHEET_NAME)
        .context("name export worksheet")?;

    let mut widths = headers
        .iter()
        .map(|header| header.chars().count())
        .collect::<Vec<_>>();

    for (column, header) in headers.iter().enumerate() {
        let column = column_index(column)?;
        worksheet
            .write_string_with_format(0, column, header, &header_format)
            .with_context(|| format!("write header {header:?}"))?;
    }

    for (index, row) in rows.iter().enumerate() {
        let row_number = u32::try_from(index + 1).context("too many rows for a worksheet")?;
        for (column, header) in headers.iter().enumerate() {
            let value = row
                .get(header)
                .cloned()
                .unwrap_or_else(|| Value::String(PLACEHOLDER.to_owned()));
            let text_width = match &value {
                Value::String(text) => text.chars().count(),
                other => other.to_string().chars().count(),
            };
            widths[column] = widths[column].max(text_width);

            let column = column_index(column)?;
            let written = match value {
                Value::Number(number) => match number.as_f64() {
                    Some(float) => worksheet
                        .write_number_with_format(row_number, column, float, &cell_format)
                        .map(|_| ()),
                    None => worksheet
                        .write_string_with_format(
                            row_number,
                            column,
                            number.to_string(),
                            &cell_format,
                        )
                        .map(|_| ()),
                },
                Value::Bool(flag) => worksheet
                    .write_boolean_with_format(row_number, column, flag, &cell_format)
                    .map(|_| ()),
                Value::String(text) => worksheet
                    .write_string_with_format(row_number, column, text, &cell_format)
                    .map(|_| ()),
                other => worksheet
                    .write_string_with_format(row_number, column, other.to_string(), &cell_format)
                    .map(|_| ()),
            };
            written.with_context(|| format!("write cell {row_number}:{header}"))?;
        }
    }

    for (column, width) in widths.into_iter().enumerate() {
        let width = MIN_COLUMN_WIDTH.max(width + 2);
        worksheet
            .set_column_width(column_index(column)?, width as f64)
            .context("set export column width")?;
    }

    workbook
        .save(path)
        .with_context(|| format!("write workbook {}", path.display()))
}

fn column_index(column: usize) -> Result<u16> {
    u16::try_from(column).context("too many columns for a worksheet")
}

/// Writes `rows` to `target` (workbook for `.xlsx`, CSV otherwise). When that
/// fails the rows go to `<downloads>/patient-list_<date>.csv` instead.
pub fn export_rows(
    rows: &[Row],
    target: &Path,
    downloads: &Path,
    today: Date,
) -> Result<ExportReport> {
    let format = if is_xlsx_path(target) {
        ExportFormat::Excel
    } else {
        ExportFormat::Csv
    };

    let written = match format {
        ExportFormat::Excel => write_xlsx(target, rows),
        ExportFormat::Csv => write_csv(target, rows),
    };

    let primary_error = match written {
        Ok(()) => {
            info!(path = %target.display(), rows = rows.len(), "patient list exported");
            return Ok(ExportReport {
                success: true,
                path: target.to_path_buf(),
                format,
                recovered: false,
            });
        }
        Err(error) => error,
    };

    warn!(
        path = %target.display(),
        error = %format!("{primary_error:#}"),
        "export failed; writing CSV to downloads instead"
    );
    let fallback = downloads.join(default_file_name(today, "csv")?);
    if let Err(fallback_error) = write_csv(&fallback, rows) {
        warn!(
            path = %fallback.display(),
            error = %format!("{fallback_error:#}"),
            "fallback CSV export failed"
        );
        return Err(primary_error);
    }

    info!(path = %fallback.display(), "patient list recovered as CSV");
    Ok(ExportReport {
        success: true,
        path: fallback,
        format: ExportFormat::Csv,
        recovered: true,
    })
}
