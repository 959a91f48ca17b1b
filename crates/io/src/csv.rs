// CSV/TSV import and assignment export

use std::collections::BTreeMap;
use std::path::Path;

use stockrecon::model::{CellValue, MatchAssignment};
use stockrecon::{CellGrid, MemoryGrid, MemoryWorkbook};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Lines inspected when guessing the delimiter.
const SNIFF_LINES: usize = 20;

/// Load a delimited text file as a one-sheet workbook named after the file
/// stem. Every non-empty field becomes a text cell, on the row of the line it
/// was read from.
pub fn import(path: &Path) -> Result<MemoryWorkbook, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    let grid = import_from_string(&content, delimiter)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Sheet1".to_string());
    log::debug!(
        "{}: {} rows (delimiter {:?})",
        path.display(),
        grid.max_row(),
        delimiter as char
    );
    Ok(MemoryWorkbook::new().with_sheet(name, grid))
}

/// Guess the field delimiter of a stock export.
///
/// Exports open with title and spacer rows that split into a single field
/// under every candidate, so only multi-field lines vote. Each candidate
/// scores its most common field width times the lines showing it; the
/// highest score wins, earlier candidates winning ties. Falls back to comma.
fn sniff_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();

    let mut best = b',';
    let mut best_score = 0usize;
    for delim in [b'\t', b';', b',', b'|'] {
        let mut widths: BTreeMap<usize, usize> = BTreeMap::new();
        for line in &sample {
            let width = field_count(line, delim);
            if width > 1 {
                *widths.entry(width).or_default() += 1;
            }
        }
        let score = widths.iter().map(|(width, lines)| width * lines).max().unwrap_or(0);
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }
    best
}

fn field_count(line: &str, delim: u8) -> usize {
    csv::ReaderBuilder::new()
        .delimiter(delim)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(|r| r.ok())
        .map_or(1, |r| r.len())
}

/// Read a text export as UTF-8. A leading byte-order mark is dropped; bytes
/// that are not valid UTF-8 are decoded as Windows-1252.
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

    if let Some(text) = encoding_rs::UTF_8.decode_without_bom_handling_and_without_replacement(body)
    {
        return Ok(text.into_owned());
    }
    log::debug!("{}: not UTF-8, decoding as Windows-1252", path.display());
    let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(body);
    Ok(text.into_owned())
}

/// Records land on the row of the file line they start on. The reader skips
/// empty lines, so rows are counted from the text rather than from records.
fn import_from_string(content: &str, delimiter: u8) -> Result<MemoryGrid, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let bytes = content.as_bytes();
    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    let mut line = 1usize;
    let mut scanned = 0usize;
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        let reported = record.position().map_or(scanned, |p| p.byte() as usize);
        let start = record_start(bytes, reported.max(scanned));
        line += bytes[scanned..start].iter().filter(|&&b| b == b'\n').count();
        scanned = start;
        if rows.len() + 1 < line {
            rows.resize_with(line - 1, Vec::new);
        }
        rows.push(record.iter().map(CellValue::from).collect());
    }
    Ok(MemoryGrid::from_rows(rows))
}

/// First byte of the record at or after `from`, past any line breaks the
/// reader stepped over.
fn record_start(bytes: &[u8], from: usize) -> usize {
    let from = from.min(bytes.len());
    bytes[from..]
        .iter()
        .position(|&b| b != b'\n' && b != b'\r')
        .map_or(bytes.len(), |offset| from + offset)
}

pub const ASSIGNMENT_HEADERS: [&str; 6] =
    ["match_id", "category", "left_row", "right_row", "product_code", "item_name"];

/// Write committed assignments, one row per entry, in pass order.
pub fn export_assignments(assignments: &[MatchAssignment], path: &Path) -> Result<(), String> {
    let writer = csv::Writer::from_path(path).map_err(|e| format!("{}: {e}", path.display()))?;
    write_assignments(assignments, writer)
}

pub fn assignments_to_string(assignments: &[MatchAssignment]) -> Result<String, String> {
    let mut buf = Vec::new();
    write_assignments(assignments, csv::Writer::from_writer(&mut buf))?;
    String::from_utf8(buf).map_err(|e| e.to_string())
}

fn write_assignments<W: std::io::Write>(
    assignments: &[MatchAssignment],
    mut writer: csv::Writer<W>,
) -> Result<(), String> {
    writer.write_record(ASSIGNMENT_HEADERS).map_err(|e| e.to_string())?;
    for assignment in assignments {
        for e in &assignment.entries {
            let left_row = e.left_row.to_string();
            let right_row = e.right_row.to_string();
            writer
                .write_record([
                    e.match_id.as_str(),
                    assignment.prefix.as_str(),
                    left_row.as_str(),
                    right_row.as_str(),
                    e.product_code.as_str(),
                    e.item_name.as_str(),
                ])
                .map_err(|e| e.to_string())?;
        }
    }
    writer.flush().map_err(|e| e.to_string())?;
    Ok(())
}
