//! Tabular extraction from delimited text and OOXML workbooks.
//!
//! Both parsers return a [`Table`] whose first row supplied the header.
//! Cell types are inferred per column: a column whose every non-empty cell
//! is an integer becomes integers, likewise floats and booleans, anything
//! else stays text. Empty cells are null.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde_json::Value;
use tabsync_core::{Record, Table};
use thiserror::Error;

use crate::models::SourceFormat;

/// Last column a worksheet can address (`XFD`).
const MAX_COLUMNS: usize = 16_384;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 200 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parse failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX parse failed: {0}")]
    Ooxml(String),
}

/// Reads and parses one source file.
pub fn read_table(path: &Path, format: SourceFormat) -> Result<Table, ExtractError> {
    let bytes = std::fs::read(path)?;
    match format {
        SourceFormat::Csv => read_csv(&bytes),
        SourceFormat::Xlsx => read_xlsx(&bytes),
    }
}

/// One parsed cell before per-column inference.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Raw(String),
    Text(String),
    Number(f64),
    Bool(bool),
}

/// Blank names become `Unnamed: <i>`; a repeated name gets `.1`, `.2`,
/// ... appended so every column keeps its own field.
fn header_names(cells: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(cells.len());
    for (i, name) in cells.into_iter().enumerate() {
        let name = name.trim().to_string();
        let mut name = if name.is_empty() {
            format!("Unnamed: {}", i)
        } else {
            name
        };
        if seen.contains(&name) {
            let base = name.clone();
            let mut n = 1;
            while seen.contains(&name) {
                name = format!("{}.{}", base, n);
                n += 1;
            }
        }
        seen.insert(name.clone());
        out.push(name);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ColumnKind {
    Int,
    Float,
    Bool,
    Mixed,
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15
}

fn infer_kind<'a>(cells: impl Iterator<Item = &'a Cell>) -> ColumnKind {
    let (mut int, mut float, mut boolean, mut any) = (true, true, true, false);
    for cell in cells {
        match cell {
            Cell::Empty => continue,
            Cell::Raw(s) => {
                any = true;
                let s = s.trim();
                int &= s.parse::<i64>().is_ok();
                float &= s.parse::<f64>().is_ok();
                boolean &= parse_bool(s).is_some();
            }
            Cell::Number(f) => {
                any = true;
                int &= is_integral(*f);
                boolean = false;
            }
            Cell::Bool(_) => {
                any = true;
                int = false;
                float = false;
            }
            Cell::Text(_) => return ColumnKind::Mixed,
        }
    }
    match (any, int, float, boolean) {
        (false, ..) => ColumnKind::Mixed,
        (true, true, _, _) => ColumnKind::Int,
        (true, _, true, _) => ColumnKind::Float,
        (true, _, _, true) => ColumnKind::Bool,
        _ => ColumnKind::Mixed,
    }
}

fn to_value(cell: &Cell, kind: ColumnKind) -> Value {
    match (cell, kind) {
        (Cell::Empty, _) => Value::Null,
        (Cell::Raw(s), ColumnKind::Int) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::Null),
        (Cell::Raw(s), ColumnKind::Float) => s
            .trim()
            .parse::<f64>()
            .map(Value::from)
            .unwrap_or(Value::Null),
        (Cell::Raw(s), ColumnKind::Bool) => parse_bool(s.trim())
            .map(Value::from)
            .unwrap_or(Value::Null),
        (Cell::Raw(s), _) | (Cell::Text(s), _) => Value::String(s.clone()),
        (Cell::Number(f), ColumnKind::Int) => Value::from(*f as i64),
        (Cell::Number(f), _) => Value::from(*f),
        (Cell::Bool(b), _) => Value::Bool(*b),
    }
}

/// Applies per-column inference and builds the table. Rows shorter than
/// the header are null-filled; cells beyond it are dropped.
fn build_table(header: Vec<String>, rows: Vec<Vec<Cell>>) -> Table {
    let width = header.len();
    let kinds: Vec<ColumnKind> = (0..width)
        .map(|c| infer_kind(rows.iter().map(|r| r.get(c).unwrap_or(&Cell::Empty))))
        .collect();

    let mut table = Table::new(header.clone());
    for row in rows {
        let mut record = Record::with_capacity(width);
        for (c, name) in header.iter().enumerate() {
            let cell = row.get(c).unwrap_or(&Cell::Empty);
            record.insert(name.clone(), to_value(cell, kinds[c]));
        }
        table.push_row(record);
    }
    table
}

pub fn read_csv(bytes: &[u8]) -> Result<Table, ExtractError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let header = header_names(reader.headers()?.iter().map(str::to_string).collect());
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cells = record
            .iter()
            .map(|field| {
                if field.trim().is_empty() {
                    Cell::Empty
                } else {
                    Cell::Raw(field.to_string())
                }
            })
            .collect();
        rows.push(cells);
    }
    Ok(build_table(header, rows))
}

fn ooxml_err(e: impl std::fmt::Display) -> ExtractError {
    ExtractError::Ooxml(e.to_string())
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive.by_name(name).map_err(ooxml_err)?;
    let mut out = Vec::new();
    entry.take(max_bytes).read_to_end(&mut out)?;
    if out.len() as u64 >= max_bytes {
        return Err(ExtractError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

/// Reads the first worksheet of an xlsx workbook.
pub fn read_xlsx(bytes: &[u8]) -> Result<Table, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(ooxml_err)?;
    let shared_strings = read_shared_strings(&mut archive)?;
    let sheet = list_worksheet_names(&archive)
        .into_iter()
        .next()
        .ok_or_else(|| ExtractError::Ooxml("workbook has no worksheets".to_string()))?;
    let sheet_xml = read_zip_entry_bounded(&mut archive, &sheet, MAX_XML_ENTRY_BYTES)?;
    let mut rows = read_sheet_rows(&sheet_xml, &shared_strings)?.into_iter();

    let header = match rows.next() {
        Some(cells) => header_names(
            cells
                .into_iter()
                .map(|c| match c {
                    Cell::Empty => String::new(),
                    Cell::Raw(s) | Cell::Text(s) => s,
                    Cell::Number(f) if is_integral(f) => (f as i64).to_string(),
                    Cell::Number(f) => f.to_string(),
                    Cell::Bool(b) => b.to_string(),
                })
                .collect(),
        ),
        None => return Ok(Table::default()),
    };
    Ok(build_table(header, rows.collect()))
}

/// Shared string table; workbooks without text cells may omit it.
fn read_shared_strings(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
) -> Result<Vec<String>, ExtractError> {
    if archive.index_for_name("xl/sharedStrings.xml").is_none() {
        return Ok(Vec::new());
    }
    let xml = read_zip_entry_bounded(archive, "xl/sharedStrings.xml", MAX_XML_ENTRY_BYTES)?;
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_t = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Empty(e)) => {
                if e.local_name().as_ref() == b"si" {
                    strings.push(String::new());
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_t => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&te.unescape().map_err(ooxml_err)?);
                }
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"si" => strings.push(current.take().unwrap_or_default()),
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

fn list_worksheet_names(archive: &zip::ZipArchive<std::io::Cursor<&[u8]>>) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches("xl/worksheets/sheet")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

/// Zero-based column index of a cell reference such as `AB12`, or `None`
/// when the reference has no column letters.
fn column_index(reference: &str) -> Result<Option<usize>, ExtractError> {
    let out_of_range =
        || ExtractError::Ooxml(format!("cell reference {} is beyond column XFD", reference));
    let mut idx = 0usize;
    let mut seen = false;
    for ch in reference.chars().take_while(|c| c.is_ascii_alphabetic()) {
        let digit = ch.to_ascii_uppercase() as usize - 'A' as usize + 1;
        idx = idx
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .filter(|v| *v <= MAX_COLUMNS)
            .ok_or_else(out_of_range)?;
        seen = true;
    }
    Ok(seen.then(|| idx - 1))
}

#[derive(Default)]
struct PendingCell {
    column: usize,
    kind: Vec<u8>,
    text: String,
}

impl PendingCell {
    fn finish(self, shared_strings: &[String]) -> Cell {
        let text = self.text;
        if text.is_empty() {
            return Cell::Empty;
        }
        match self.kind.as_slice() {
            b"s" => text
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|i| shared_strings.get(i))
                .map(|s| Cell::Text(s.clone()))
                .unwrap_or(Cell::Empty),
            b"b" => Cell::Bool(text.trim() == "1"),
            b"e" => Cell::Empty,
            b"str" | b"inlineStr" => Cell::Text(text),
            _ => text
                .trim()
                .parse::<f64>()
                .map(Cell::Number)
                .unwrap_or(Cell::Text(text)),
        }
    }
}

fn place(row: &mut Vec<Cell>, column: usize, cell: Cell) {
    if row.len() <= column {
        row.resize(column + 1, Cell::Empty);
    }
    row[column] = cell;
}

fn read_sheet_rows(xml: &[u8], shared_strings: &[String]) -> Result<Vec<Vec<Cell>>, ExtractError> {
    let mut rows: Vec<Vec<Cell>> = Vec::new();
    let mut row: Option<Vec<Cell>> = None;
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => row = Some(Vec::new()),
                b"c" => {
                    let mut pending = PendingCell {
                        column: row.as_ref().map(Vec::len).unwrap_or(0),
                        ..PendingCell::default()
                    };
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"r" => {
                                let r = String::from_utf8_lossy(&attr.value);
                                if let Some(col) = column_index(&r)? {
                                    pending.column = col;
                                }
                            }
                            b"t" => pending.kind = attr.value.to_vec(),
                            _ => {}
                        }
                    }
                    cell = Some(pending);
                }
                b"v" | b"t" => in_value = cell.is_some(),
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(te)) if in_value => {
                if let Some(c) = cell.as_mut() {
                    c.text.push_str(&te.unescape().map_err(ooxml_err)?);
                }
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let (Some(pending), Some(r)) = (cell.take(), row.as_mut()) {
                        let column = pending.column;
                        place(r, column, pending.finish(shared_strings));
                    }
                }
                b"row" => {
                    if let Some(r) = row.take() {
                        if r.iter().any(|c| *c != Cell::Empty) {
                            rows.push(r);
                        }
                    }
                }
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}
