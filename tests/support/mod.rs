#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};
use timeline_append::WorkbookReader;
use timeline_append::model::{CellValue, PlainValue};
use timeline_append::workbook::{UmyaReader, WorkbookSnapshot};
use umya_spreadsheet::structs::{RichText as UmyaRichText, TextElement};
use umya_spreadsheet::{self, Spreadsheet, Worksheet};

pub const HEADERS: &[&str] = &["Startdatum", "Händelse", "Dag", "Källa1", "Plats"];

pub fn write_workbook_to_path<F>(path: &Path, f: F)
where
    F: FnOnce(&mut Spreadsheet),
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create dir");
    }
    let mut book = umya_spreadsheet::new_file();
    f(&mut book);
    umya_spreadsheet::writer::xlsx::write(&book, path).expect("write workbook");
}

pub struct TestWorkspace {
    _tempdir: TempDir,
    root: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let tempdir = tempdir().expect("tempdir");
        let root = tempdir.path().to_path_buf();
        Self {
            _tempdir: tempdir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn create_workbook<F>(&self, name: &str, f: F) -> PathBuf
    where
        F: FnOnce(&mut Spreadsheet),
    {
        let path = self.path(name);
        write_workbook_to_path(&path, f);
        path
    }

    /// A timeline with the standard headers and one dated row.
    pub fn create_timeline<F>(&self, name: &str, f: F) -> PathBuf
    where
        F: FnOnce(&mut Worksheet),
    {
        self.create_workbook(name, |book| {
            let sheet = book.get_sheet_mut(&0).expect("first sheet");
            write_headers(sheet);
            sheet.get_cell_mut("A2").set_value_number(45000);
            sheet
                .get_style_mut("A2")
                .get_number_format_mut()
                .set_format_code("yyyy-mm-dd");
            sheet.get_cell_mut("B2").set_value("Första händelsen");
            sheet.get_cell_mut("C2").set_formula("TEXT(A2,\"ddd\")");
            sheet.get_cell_mut("D2").set_value("DN");
            f(sheet);
        })
    }
}

pub fn write_headers(sheet: &mut Worksheet) {
    for (idx, header) in HEADERS.iter().enumerate() {
        sheet
            .get_cell_mut((idx as u32 + 1, 1))
            .set_value(*header);
    }
}

/// Builds a rich value from `(text, bold, argb)` triples. `None` for both
/// style fields leaves the run without properties.
pub fn umya_rich(parts: &[(&str, Option<bool>, Option<&str>)]) -> UmyaRichText {
    let mut rich = UmyaRichText::default();
    for (text, bold, color) in parts {
        let mut element = TextElement::default();
        element.set_text(*text);
        if bold.is_some() || color.is_some() {
            let font = element.get_run_properties_mut();
            if let Some(bold) = bold {
                font.set_bold(*bold);
            }
            if let Some(argb) = color {
                font.get_color_mut().set_argb(*argb);
            }
        }
        rich.add_rich_text_elements(element);
    }
    rich
}

pub fn snapshot(path: &Path) -> WorkbookSnapshot {
    UmyaReader::default().load(path).expect("load snapshot")
}

pub fn text_at(snapshot: &WorkbookSnapshot, row: u32, col: u32) -> Option<String> {
    match snapshot.cell(row, col).map(|cell| &cell.value) {
        Some(CellValue::Plain(PlainValue::Text(text))) => Some(text.clone()),
        Some(CellValue::Rich(rich)) => Some(rich.plain()),
        _ => None,
    }
}

pub fn temp_files(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .expect("read dir")
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "tmp"))
        .collect()
}
