use crate::color::{Rgb, is_default_fill, is_default_text_color};
use crate::rich_text::RichText;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// A scalar cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum PlainValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Bool(bool),
}

impl PlainValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, PlainValue::Text(text) if text.is_empty())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PlainValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Plain(PlainValue),
    /// Formula source without the leading `=`. Never evaluated.
    Formula(String),
    Rich(RichText),
    /// No value; the style may still matter.
    Blank,
}

impl CellValue {
    pub fn formula(source: &str) -> Self {
        CellValue::Formula(source.trim_start_matches('=').to_string())
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Blank)
    }

    /// Display text for header discovery and diagnostics.
    pub fn text(&self) -> Option<String> {
        match self {
            CellValue::Plain(PlainValue::Text(text)) => Some(text.clone()),
            CellValue::Plain(PlainValue::Number(n)) => Some(n.to_string()),
            CellValue::Plain(PlainValue::Date(d)) => Some(d.format("%Y-%m-%d").to_string()),
            CellValue::Plain(PlainValue::Bool(b)) => Some(b.to_string().to_uppercase()),
            CellValue::Formula(src) => Some(format!("={src}")),
            CellValue::Rich(rt) => Some(rt.plain()),
            CellValue::Blank => None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "camelCase", ascii_case_insensitive)]
#[serde(rename_all = "camelCase")]
pub enum HorizontalAlign {
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterContinuous,
    Distributed,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "camelCase", ascii_case_insensitive)]
#[serde(rename_all = "camelCase")]
pub enum VerticalAlign {
    Top,
    Center,
    Bottom,
    Justify,
    Distributed,
}

/// Normalized per-cell style. `None` means "library default".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_color: Option<Rgb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<Rgb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_text: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h_align: Option<HorizontalAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v_align: Option<VerticalAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_format: Option<String>,
}

impl CellStyle {
    /// The sheet-wide baseline every written cell starts from.
    pub fn baseline() -> Self {
        Self {
            wrap_text: Some(true),
            ..Self::default()
        }
    }

    /// True when any field is set to something other than the baseline.
    pub fn is_non_default(&self) -> bool {
        self.bold.is_some()
            || self.italic.is_some()
            || self.font_color.is_some()
            || self.font_size.is_some()
            || self.fill_color.is_some()
            || self.wrap_text.is_some_and(|wrap| !wrap)
            || self.h_align.is_some()
            || self.v_align.is_some()
            || self.number_format.is_some()
    }

    /// The style the writer should actually emit: wrap forced on, default
    /// text colors and fills dropped.
    pub fn for_writing(&self) -> Self {
        Self {
            font_color: self.font_color.filter(|c| !is_default_text_color(c)),
            fill_color: self.fill_color.filter(|c| !is_default_fill(c)),
            wrap_text: Some(true),
            ..self.clone()
        }
    }

    pub fn with_fill(mut self, fill: Option<Rgb>) -> Self {
        if fill.is_some() {
            self.fill_color = fill;
        }
        self
    }

    pub fn with_number_format(mut self, code: &str) -> Self {
        self.number_format = Some(code.to_string());
        self
    }
}

/// One captured cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellSnapshot {
    pub value: CellValue,
    pub style: CellStyle,
}

impl CellSnapshot {
    pub fn new(value: CellValue, style: CellStyle) -> Self {
        Self { value, style }
    }

    /// A cell worth replaying: it has a value or visible styling.
    pub fn is_significant(&self) -> bool {
        !self.value.is_blank() || self.style.is_non_default()
    }
}

/// A user-supplied value for one column of the new row.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Rich(RichText),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.is_empty(),
            FieldValue::Date(_) => false,
            FieldValue::Rich(rt) => rt.plain().is_empty(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl From<RichText> for FieldValue {
    fn from(value: RichText) -> Self {
        FieldValue::Rich(value)
    }
}

/// Fixed row highlight palette.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum RowColor {
    #[default]
    None,
    Yellow,
    Green,
    Blue,
    Red,
    Pink,
    #[strum(to_string = "gray", serialize = "grey")]
    Gray,
}

impl RowColor {
    pub fn fill(&self) -> Option<Rgb> {
        match self {
            RowColor::None => None,
            RowColor::Yellow => Some(Rgb::new(0xFFF59D)),
            RowColor::Green => Some(Rgb::new(0xC8E6C9)),
            RowColor::Blue => Some(Rgb::new(0xBBDEFB)),
            RowColor::Red => Some(Rgb::new(0xFFCDD2)),
            RowColor::Pink => Some(Rgb::new(0xF8BBD9)),
            RowColor::Gray => Some(Rgb::new(0xE0E0E0)),
        }
    }
}

/// One row's worth of input from the collector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppendRequest {
    /// Column name to value. Names missing from the header row are ignored.
    pub fields: IndexMap<String, FieldValue>,
    pub filename_hint: Option<String>,
    pub row_color: RowColor,
    /// ISO `YYYY-MM-DD`, used when the start date was left empty.
    pub source_date: Option<String>,
}

impl AppendRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    pub fn filename_hint(mut self, hint: impl Into<String>) -> Self {
        self.filename_hint = Some(hint.into());
        self
    }

    pub fn row_color(mut self, color: RowColor) -> Self {
        self.row_color = color;
        self
    }

    pub fn source_date(mut self, date: impl Into<String>) -> Self {
        self.source_date = Some(date.into());
        self
    }

    /// The filename hint, if set and non-empty.
    pub fn hint(&self) -> Option<&str> {
        self.filename_hint.as_deref().filter(|h| !h.is_empty())
    }

    /// Nothing to append: the workbook is only rewritten.
    pub fn is_empty(&self) -> bool {
        self.fields.values().all(FieldValue::is_empty)
            && self.hint().is_none()
            && self.source_date.as_deref().is_none_or(|d| d.trim().is_empty())
            && self.row_color == RowColor::None
    }
}
