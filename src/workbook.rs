//! Read side: capturing an existing workbook into a [`WorkbookSnapshot`].

use crate::error::EngineError;
use crate::model::{CellSnapshot, CellValue, PlainValue};
use crate::recovery::CorruptionDetector;
use crate::rich_text::{RichPart, RichText, Run};
use crate::styles::{cell_style_from, run_style_from};
use crate::utils::{column_name_to_number, column_number_to_name};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use umya_spreadsheet::reader::xlsx;
use umya_spreadsheet::structs::CellRawValue;
use umya_spreadsheet::{Cell, Worksheet};

/// Library-neutral capture of the active sheet of a workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkbookSnapshot {
    pub sheet_name: String,
    /// Header text from row 1 → 1-based column index, in column order.
    pub headers: IndexMap<String, u32>,
    /// `(row, col)` → cell, both 1-based. Iterates in row-major order.
    pub grid: BTreeMap<(u32, u32), CellSnapshot>,
    /// Column letter → width as stored in the file.
    pub col_widths: BTreeMap<String, f64>,
    pub row_heights: BTreeMap<u32, f64>,
    pub last_row: u32,
}

impl WorkbookSnapshot {
    pub fn header_names(&self) -> Vec<String> {
        self.headers.keys().cloned().collect()
    }

    pub fn column_of(&self, name: &str) -> Option<u32> {
        self.headers.get(name).copied()
    }

    /// The right-most header column; 0 for a sheet without headers.
    pub fn max_column(&self) -> u32 {
        self.headers.values().copied().max().unwrap_or(0)
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&CellSnapshot> {
        self.grid.get(&(row, col))
    }

    /// Required names absent from the header row, in the order given.
    pub fn missing_columns<S: AsRef<str>>(&self, required: &[S]) -> Vec<String> {
        required
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| !self.headers.contains_key(*name))
            .map(str::to_string)
            .collect()
    }

    /// Column widths keyed by 1-based column index.
    pub fn widths_by_index(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.col_widths
            .iter()
            .filter_map(|(letter, width)| column_name_to_number(letter).map(|col| (col, *width)))
    }
}

/// Port for loading a workbook from disk.
pub trait WorkbookReader {
    fn load(&self, path: &Path) -> Result<WorkbookSnapshot, EngineError>;
}

/// [`WorkbookReader`] backed by umya-spreadsheet.
#[derive(Debug, Clone, Default)]
pub struct UmyaReader {
    detector: CorruptionDetector,
}

impl UmyaReader {
    pub fn new(detector: CorruptionDetector) -> Self {
        Self { detector }
    }
}

impl WorkbookReader for UmyaReader {
    fn load(&self, path: &Path) -> Result<WorkbookSnapshot, EngineError> {
        self.detector.ensure_readable(path)?;

        let bytes = fs::read(path).map_err(|e| EngineError::from_io(path, "read", e))?;
        let book = xlsx::read_reader(Cursor::new(bytes), true).map_err(|e| {
            EngineError::Corrupted {
                path: path.to_path_buf(),
                detail: e.to_string(),
            }
        })?;

        let snapshot = snapshot_sheet(book.get_active_sheet());
        tracing::debug!(
            path = %path.display(),
            sheet = %snapshot.sheet_name,
            headers = snapshot.headers.len(),
            cells = snapshot.grid.len(),
            last_row = snapshot.last_row,
            "workbook snapshot loaded"
        );
        Ok(snapshot)
    }
}

pub fn snapshot_sheet(sheet: &Worksheet) -> WorkbookSnapshot {
    let mut captured: BTreeMap<(u32, u32), CellSnapshot> = BTreeMap::new();
    let mut last_row = 1u32;

    for cell in sheet.get_cell_collection() {
        let col = *cell.get_coordinate().get_col_num();
        let row = *cell.get_coordinate().get_row_num();
        let snapshot = CellSnapshot::new(capture_value(cell), cell_style_from(cell.get_style()));
        if !snapshot.value.is_blank() {
            last_row = last_row.max(row);
        }
        captured.insert((row, col), snapshot);
    }

    let headers = headers_from(&captured);
    let max_column = headers.values().copied().max().unwrap_or(0);

    let mut grid = BTreeMap::new();
    let mut dropped = 0usize;
    for ((row, col), snapshot) in captured {
        if !snapshot.is_significant() {
            continue;
        }
        if row > last_row || col > max_column {
            dropped += 1;
            continue;
        }
        grid.insert((row, col), snapshot);
    }
    if dropped > 0 {
        tracing::warn!(
            dropped,
            max_column,
            last_row,
            "cells outside the header columns or used rows are not carried over"
        );
    }

    let col_widths = sheet
        .get_column_dimensions()
        .iter()
        .filter(|column| *column.get_width() > 0.0)
        .map(|column| (column_number_to_name(*column.get_col_num()), *column.get_width()))
        .collect();

    let row_heights = sheet
        .get_row_dimensions()
        .iter()
        .filter(|row| *row.get_height() > 0.0)
        .map(|row| (*row.get_row_num(), *row.get_height()))
        .collect();

    WorkbookSnapshot {
        sheet_name: sheet.get_name().to_string(),
        headers,
        grid,
        col_widths,
        row_heights,
        last_row,
    }
}

fn headers_from(cells: &BTreeMap<(u32, u32), CellSnapshot>) -> IndexMap<String, u32> {
    let mut headers = IndexMap::new();
    for ((_, col), snapshot) in cells.range((1, 0)..(2, 0)) {
        let name = match &snapshot.value {
            CellValue::Formula(_) | CellValue::Blank => continue,
            value => value.text().unwrap_or_default(),
        };
        let name = name.trim();
        if !name.is_empty() && !headers.contains_key(name) {
            headers.insert(name.to_string(), *col);
        }
    }
    headers
}

fn capture_value(cell: &Cell) -> CellValue {
    if cell.is_formula() {
        return CellValue::formula(cell.get_formula());
    }
    match cell.get_cell_value().get_raw_value() {
        CellRawValue::RichText(rich) => {
            let parts = rich
                .get_rich_text_elements()
                .iter()
                .map(|element| match element.get_run_properties() {
                    Some(font) => {
                        RichPart::Styled(Run::new(element.get_text(), run_style_from(font)))
                    }
                    None => RichPart::Plain(element.get_text().to_string()),
                })
                .collect();
            RichText::from_parts(parts)
                .map(CellValue::Rich)
                .unwrap_or(CellValue::Blank)
        }
        CellRawValue::Numeric(number) => CellValue::Plain(PlainValue::Number(*number)),
        CellRawValue::Bool(flag) => CellValue::Plain(PlainValue::Bool(*flag)),
        CellRawValue::Empty => CellValue::Blank,
        _ => {
            let text = cell.get_value();
            if text.is_empty() {
                CellValue::Blank
            } else {
                CellValue::Plain(PlainValue::Text(text.to_string()))
            }
        }
    }
}
