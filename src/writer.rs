//! Write side: the [`WorkbookWriter`] port and its rust_xlsxwriter adapter.
//!
//! Coordinates on the port are 1-based like the snapshot; the adapter
//! converts to the 0-based indices rust_xlsxwriter uses.

use crate::error::EngineError;
use crate::model::{CellSnapshot, CellStyle, CellValue, HorizontalAlign, PlainValue, VerticalAlign};
use crate::rich_text::{RichText, RunStyle};
use crate::utils::{cell_address, excel_serial};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatPattern, Workbook, Worksheet};
use std::fs;
use std::path::{Path, PathBuf};

/// Number format for dates written without one of their own.
pub const DATE_FORMAT: &str = "yyyy-mm-dd";

/// Pixel width of the widest digit in the default font, and the cell
/// padding added on top of it. Used to turn stored widths back into
/// character widths.
const MAX_DIGIT_WIDTH: f64 = 7.0;
const COLUMN_PADDING: f64 = 5.0;

/// Port for producing the rewritten workbook.
pub trait WorkbookWriter: Sized {
    /// Starts a new workbook that [`close`](Self::close) serializes to
    /// `temp_path`.
    fn create(temp_path: &Path) -> Result<Self, EngineError>;

    fn set_sheet_name(&mut self, name: &str);

    fn set_column_default(&mut self, col: u32, style: &CellStyle) -> Result<(), EngineError>;

    /// `width` is the value stored in the source file.
    fn set_column_width(&mut self, col: u32, width: f64) -> Result<(), EngineError>;

    fn set_row_height(&mut self, row: u32, height: f64) -> Result<(), EngineError>;

    fn write_value(
        &mut self,
        row: u32,
        col: u32,
        value: &PlainValue,
        style: &CellStyle,
    ) -> Result<(), EngineError>;

    fn write_formula(
        &mut self,
        row: u32,
        col: u32,
        source: &str,
        style: &CellStyle,
    ) -> Result<(), EngineError>;

    /// Writes styled runs. Falls back to the plain text when the rich write
    /// is rejected; never fails.
    fn write_rich(&mut self, row: u32, col: u32, text: &RichText, style: &CellStyle);

    fn write_blank(&mut self, row: u32, col: u32, style: &CellStyle) -> Result<(), EngineError>;

    fn close(self) -> Result<(), EngineError>;

    fn write_cell(&mut self, row: u32, col: u32, cell: &CellSnapshot) -> Result<(), EngineError> {
        match &cell.value {
            CellValue::Formula(source) => self.write_formula(row, col, source, &cell.style),
            CellValue::Rich(text) => {
                self.write_rich(row, col, text, &cell.style);
                Ok(())
            }
            CellValue::Plain(value) => self.write_value(row, col, value, &cell.style),
            CellValue::Blank => self.write_blank(row, col, &cell.style),
        }
    }
}

/// [`WorkbookWriter`] backed by rust_xlsxwriter. The single worksheet is
/// built in memory and attached to a workbook on close.
pub struct XlsxWriter {
    temp_path: PathBuf,
    worksheet: Worksheet,
}

impl WorkbookWriter for XlsxWriter {
    fn create(temp_path: &Path) -> Result<Self, EngineError> {
        Ok(Self {
            temp_path: temp_path.to_path_buf(),
            worksheet: Worksheet::new(),
        })
    }

    fn set_sheet_name(&mut self, name: &str) {
        if let Err(e) = self.worksheet.set_name(name) {
            tracing::warn!(name, error = %e, "sheet name rejected, keeping the default");
        }
    }

    fn set_column_default(&mut self, col: u32, style: &CellStyle) -> Result<(), EngineError> {
        let format = cell_format(style);
        self.worksheet
            .set_column_format(col_index(col)?, &format)
            .map_err(|e| EngineError::writer(format!("column {col} format"), e))?;
        Ok(())
    }

    fn set_column_width(&mut self, col: u32, width: f64) -> Result<(), EngineError> {
        self.worksheet
            .set_column_width(col_index(col)?, character_width(width))
            .map_err(|e| EngineError::writer(format!("column {col} width"), e))?;
        Ok(())
    }

    fn set_row_height(&mut self, row: u32, height: f64) -> Result<(), EngineError> {
        self.worksheet
            .set_row_height(row_index(row)?, height)
            .map_err(|e| EngineError::writer(format!("row {row} height"), e))?;
        Ok(())
    }

    fn write_value(
        &mut self,
        row: u32,
        col: u32,
        value: &PlainValue,
        style: &CellStyle,
    ) -> Result<(), EngineError> {
        let (r, c) = (row_index(row)?, col_index(col)?);
        let result = match value {
            PlainValue::Text(text) => self
                .worksheet
                .write_string_with_format(r, c, text, &cell_format(style))
                .map(|_| ()),
            PlainValue::Number(number) => self
                .worksheet
                .write_number_with_format(r, c, *number, &cell_format(style))
                .map(|_| ()),
            PlainValue::Bool(flag) => self
                .worksheet
                .write_boolean_with_format(r, c, *flag, &cell_format(style))
                .map(|_| ()),
            PlainValue::Date(date) => {
                let style = if style.number_format.is_some() {
                    style.clone()
                } else {
                    style.clone().with_number_format(DATE_FORMAT)
                };
                self.worksheet
                    .write_number_with_format(r, c, excel_serial(*date), &cell_format(&style))
                    .map(|_| ())
            }
        };
        result.map_err(|e| EngineError::writer(cell_address(col, row), e))
    }

    fn write_formula(
        &mut self,
        row: u32,
        col: u32,
        source: &str,
        style: &CellStyle,
    ) -> Result<(), EngineError> {
        self.worksheet
            .write_formula_with_format(
                row_index(row)?,
                col_index(col)?,
                source,
                &cell_format(style),
            )
            .map_err(|e| EngineError::writer(cell_address(col, row), e))?;
        Ok(())
    }

    fn write_rich(&mut self, row: u32, col: u32, text: &RichText, style: &CellStyle) {
        let (Ok(r), Ok(c)) = (row_index(row), col_index(col)) else {
            tracing::warn!(row, col, "rich text outside the sheet bounds dropped");
            return;
        };
        let cell_fmt = cell_format(style);
        let run_formats: Vec<Format> = text
            .runs()
            .iter()
            .map(|run| run_format(&run.style))
            .collect();
        let segments: Vec<(&Format, &str)> = run_formats
            .iter()
            .zip(text.runs())
            .map(|(format, run)| (format, run.text.as_str()))
            .collect();

        let result = self
            .worksheet
            .write_rich_string_with_format(r, c, &segments, &cell_fmt)
            .map(|_| ());
        let Err(e) = result else {
            return;
        };

        let cell = cell_address(col, row);
        tracing::warn!(
            cell = %cell,
            runs = text.runs().len(),
            error = %e,
            "rich text write failed, writing plain text instead"
        );
        if let Err(e) = self
            .worksheet
            .write_string_with_format(r, c, text.plain(), &cell_fmt)
        {
            tracing::warn!(cell = %cell, error = %e, "plain text fallback failed");
        }
    }

    fn write_blank(&mut self, row: u32, col: u32, style: &CellStyle) -> Result<(), EngineError> {
        self.worksheet
            .write_blank(row_index(row)?, col_index(col)?, &cell_format(style))
            .map_err(|e| EngineError::writer(cell_address(col, row), e))?;
        Ok(())
    }

    fn close(self) -> Result<(), EngineError> {
        let mut workbook = Workbook::new();
        workbook.push_worksheet(self.worksheet);
        let buffer = workbook
            .save_to_buffer()
            .map_err(|e| EngineError::writer("workbook", e))?;
        fs::write(&self.temp_path, buffer)
            .map_err(|e| EngineError::from_io(&self.temp_path, "write temp file", e))?;
        tracing::debug!(path = %self.temp_path.display(), "workbook serialized");
        Ok(())
    }
}

fn row_index(row: u32) -> Result<u32, EngineError> {
    row.checked_sub(1)
        .ok_or_else(|| EngineError::writer(format!("row {row}"), "rows are 1-based"))
}

fn col_index(col: u32) -> Result<u16, EngineError> {
    col.checked_sub(1)
        .and_then(|c| u16::try_from(c).ok())
        .ok_or_else(|| EngineError::writer(format!("column {col}"), "column out of range"))
}

/// Inverse of the width rust_xlsxwriter stores for a character width, so a
/// width survives any number of rewrites unchanged.
pub fn character_width(stored: f64) -> f64 {
    if stored <= 0.0 {
        return 0.0;
    }
    let one_char = (MAX_DIGIT_WIDTH + COLUMN_PADDING) / MAX_DIGIT_WIDTH;
    if stored < one_char {
        stored * MAX_DIGIT_WIDTH / (MAX_DIGIT_WIDTH + COLUMN_PADDING)
    } else {
        stored - COLUMN_PADDING / MAX_DIGIT_WIDTH
    }
}

pub fn cell_format(style: &CellStyle) -> Format {
    let style = style.for_writing();
    let mut format = Format::new().set_text_wrap();

    if style.bold == Some(true) {
        format = format.set_bold();
    }
    if style.italic == Some(true) {
        format = format.set_italic();
    }
    if let Some(color) = style.font_color {
        format = format.set_font_color(Color::RGB(color.as_u32()));
    }
    if let Some(size) = style.font_size {
        format = format.set_font_size(size);
    }
    if let Some(fill) = style.fill_color {
        format = format
            .set_pattern(FormatPattern::Solid)
            .set_background_color(Color::RGB(fill.as_u32()));
    }
    if let Some(align) = style.h_align {
        format = format.set_align(horizontal(align));
    }
    if let Some(align) = style.v_align {
        format = format.set_align(vertical(align));
    }
    if let Some(code) = &style.number_format {
        format = format.set_num_format(code);
    }
    format
}

fn run_format(style: &RunStyle) -> Format {
    let mut format = Format::default();
    if style.is_default() {
        return format;
    }
    if style.bold == Some(true) {
        format = format.set_bold();
    }
    if style.italic == Some(true) {
        format = format.set_italic();
    }
    if let Some(color) = style.color.filter(|c| !crate::color::is_default_text_color(c)) {
        format = format.set_font_color(Color::RGB(color.as_u32()));
    }
    format
}

fn horizontal(align: HorizontalAlign) -> FormatAlign {
    match align {
        HorizontalAlign::General => FormatAlign::General,
        HorizontalAlign::Left => FormatAlign::Left,
        HorizontalAlign::Center => FormatAlign::Center,
        HorizontalAlign::Right => FormatAlign::Right,
        HorizontalAlign::Fill => FormatAlign::Fill,
        HorizontalAlign::Justify => FormatAlign::Justify,
        HorizontalAlign::CenterContinuous => FormatAlign::CenterAcross,
        HorizontalAlign::Distributed => FormatAlign::Distributed,
    }
}

fn vertical(align: VerticalAlign) -> FormatAlign {
    match align {
        VerticalAlign::Top => FormatAlign::Top,
        VerticalAlign::Center => FormatAlign::VerticalCenter,
        VerticalAlign::Bottom => FormatAlign::Bottom,
        VerticalAlign::Justify => FormatAlign::VerticalJustify,
        VerticalAlign::Distributed => FormatAlign::VerticalDistributed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::rich_text::Run;

    /// The width rust_xlsxwriter stores for a character width.
    fn stored_width(chars: f64) -> f64 {
        let pixels = if chars < 1.0 {
            (chars * (MAX_DIGIT_WIDTH + COLUMN_PADDING) + 0.5).floor()
        } else {
            (chars * MAX_DIGIT_WIDTH + 0.5).floor() + COLUMN_PADDING
        };
        (pixels / MAX_DIGIT_WIDTH * 256.0).floor() / 256.0
    }

    #[test]
    fn widths_do_not_drift() {
        for stored in [8.43, 12.0, 20.7109375, 30.0, 55.5, 1.0] {
            let once = stored_width(character_width(stored));
            let twice = stored_width(character_width(once));
            assert!((once - stored).abs() < 0.15, "{stored} became {once}");
            assert_eq!(once, twice);
        }
        assert_eq!(character_width(0.0), 0.0);
    }

    #[test]
    fn indices_are_zero_based() {
        assert_eq!(row_index(1).unwrap(), 0);
        assert_eq!(col_index(3).unwrap(), 2);
        assert!(row_index(0).is_err());
        assert!(col_index(0).is_err());
        assert!(col_index(70_000).is_err());
    }

    #[test]
    fn rich_write_and_close_produce_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("out.xlsx.tmp");
        let mut writer = XlsxWriter::create(&temp).unwrap();
        writer.set_sheet_name("Tidslinje");
        let text = RichText::from_runs(vec![
            Run::new("Bold ", RunStyle::bold()),
            Run::new("red", RunStyle::colored(Rgb::new(0xFF0000))),
        ])
        .unwrap();
        writer.write_rich(1, 1, &text, &CellStyle::baseline());
        writer
            .write_value(1, 2, &PlainValue::Number(3.5), &CellStyle::default())
            .unwrap();
        writer.close().unwrap();

        let bytes = fs::read(&temp).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
