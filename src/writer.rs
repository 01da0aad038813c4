use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::diagnostics::{DIAGNOSTIC_COLUMNS, DiagnosticRow};
use crate::error::{Error, Result};
use crate::flatten::{Cell, ExportRow, export_header};
use crate::models::CustomFieldMap;

pub const EXPORT_SHEET: &str = "Xray Tests";
pub const DIAGNOSTICS_SHEET: &str = "Field Diagnostics";

const MIN_COLUMN_WIDTH: usize = 10;
const MAX_COLUMN_WIDTH: usize = 80;
/// Excelの1セルあたりの最大文字数
pub const MAX_CELL_CHARS: usize = 32_767;

/// 出力先を事前に検証する（ネットワーク処理の前に呼ぶ）
pub fn validate_output_path(path: &Path) -> Result<()> {
    let is_xlsx = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("xlsx"))
        .unwrap_or(false);
    if !is_xlsx {
        return Err(Error::write(path, "output file must have the .xlsx extension"));
    }

    if path.is_dir() {
        return Err(Error::write(path, "output path is a directory"));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            return Err(Error::write(
                path,
                format!("directory {} does not exist", parent.display()),
            ));
        }
    }

    if let Ok(metadata) = std::fs::metadata(path) {
        if metadata.permissions().readonly() {
            return Err(Error::write(path, "file is read-only"));
        }
    }

    Ok(())
}

/// エクスポート行をスプレッドシートに書き出す
pub fn write_export(rows: &[ExportRow], custom_fields: &CustomFieldMap, path: &Path) -> Result<()> {
    let header = export_header(custom_fields);
    write_table(
        path,
        EXPORT_SHEET,
        &header,
        rows.iter().map(ExportRow::cells),
    )?;
    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// 診断行をスプレッドシートに書き出す
pub fn write_diagnostics(rows: &[DiagnosticRow], path: &Path) -> Result<()> {
    let header: Vec<String> = DIAGNOSTIC_COLUMNS.iter().map(|c| c.to_string()).collect();
    write_table(
        path,
        DIAGNOSTICS_SHEET,
        &header,
        rows.iter().map(DiagnosticRow::cells),
    )?;
    info!("Wrote {} diagnostic rows to {}", rows.len(), path.display());
    Ok(())
}

fn write_table<I>(path: &Path, sheet_name: &str, header: &[String], rows: I) -> Result<()>
where
    I: Iterator<Item = Vec<Cell>>,
{
    validate_output_path(path)?;

    let mut workbook = Workbook::new();
    fill_sheet(workbook.add_worksheet(), sheet_name, header, rows)
        .map_err(|e| Error::workbook(path, e))?;

    debug!(path = %path.display(), "Saving workbook");
    workbook.save(path).map_err(|e| Error::workbook(path, e))
}

fn fill_sheet<I>(
    sheet: &mut Worksheet,
    sheet_name: &str,
    header: &[String],
    rows: I,
) -> std::result::Result<(), XlsxError>
where
    I: Iterator<Item = Vec<Cell>>,
{
    sheet.set_name(sheet_name)?;

    let bold = Format::new().set_bold();
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();

    for (col, title) in header.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, title.as_str(), &bold)?;
    }

    for (index, cells) in rows.enumerate() {
        let row = index as u32 + 1;
        for (col, cell) in cells.iter().enumerate() {
            match cell {
                Cell::Text(text) => {
                    let text = fit_cell_text(text);
                    if matches!(text, Cow::Owned(_)) {
                        let column = header.get(col).map(String::as_str).unwrap_or("");
                        warn!(
                            row,
                            column,
                            "Cell text exceeds {} characters, truncated",
                            MAX_CELL_CHARS
                        );
                    }
                    sheet.write_string(row, col as u16, &*text)?;
                }
                Cell::Number(number) => {
                    sheet.write_number(row, col as u16, *number)?;
                }
                Cell::Blank => {}
            }
            if col >= widths.len() {
                widths.resize(col + 1, 0);
            }
            widths[col] = widths[col].max(cell.display_width());
        }
    }

    for (col, width) in widths.iter().enumerate() {
        sheet.set_column_width(col as u16, column_width(*width) as f64)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    Ok(())
}

/// セルの上限を超える文字列を文字境界で切り詰める
fn fit_cell_text(text: &str) -> Cow<'_, str> {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((end, _)) => Cow::Owned(text[..end].to_string()),
        None => Cow::Borrowed(text),
    }
}

/// 内容に合わせた列幅（最小10、最大80）
fn column_width(content_width: usize) -> usize {
    (content_width.max(MIN_COLUMN_WIDTH) + 2).min(MAX_COLUMN_WIDTH)
}
