//! Rules for the columns the engine fills in on the caller's behalf.

use crate::model::{AppendRequest, FieldValue};
use crate::utils::{column_name_to_number, column_number_to_name};
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Column used for the auto-day formula's date when no start-date column
/// exists.
const DEFAULT_DAY_FALLBACK_LETTER: &str = "I";

/// Header names with special handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnRoles {
    /// Free-text event description; receives the filename hint.
    pub main_text: String,
    /// Accepted names for the start-date column, in priority order.
    pub start_date: Vec<String>,
    /// First source reference; falls back to the filename hint.
    pub primary_source: String,
    /// Weekday column, filled with a formula when left empty.
    pub day: String,
    pub day_fallback_letter: String,
}

impl Default for ColumnRoles {
    fn default() -> Self {
        Self {
            main_text: "Händelse".to_string(),
            start_date: vec!["Tid start".to_string(), "Startdatum".to_string()],
            primary_source: "Källa1".to_string(),
            day: "Dag".to_string(),
            day_fallback_letter: DEFAULT_DAY_FALLBACK_LETTER.to_string(),
        }
    }
}

impl ColumnRoles {
    /// The first configured start-date header present in `headers`.
    pub fn start_date_column(&self, headers: &IndexMap<String, u32>) -> Option<u32> {
        self.start_date
            .iter()
            .find_map(|name| headers.get(name.as_str()).copied())
    }

    /// Letter of the column the auto-day formula reads its date from.
    pub fn day_source_letter(&self, headers: &IndexMap<String, u32>) -> String {
        if let Some(col) = self.start_date_column(headers) {
            return column_number_to_name(col);
        }
        match column_name_to_number(&self.day_fallback_letter) {
            Some(col) => column_number_to_name(col),
            None => DEFAULT_DAY_FALLBACK_LETTER.to_string(),
        }
    }

    pub fn is_start_date(&self, name: &str) -> bool {
        self.start_date.iter().any(|candidate| candidate == name)
    }
}

/// Applies the main-text, start-date and primary-source rules to the request
/// fields. Other fields pass through unchanged.
pub fn resolve_fields(
    request: &AppendRequest,
    roles: &ColumnRoles,
) -> IndexMap<String, FieldValue> {
    let mut fields = request.fields.clone();
    let hint = request.hint();

    let main = main_text(fields.get(&roles.main_text), hint);
    fields.insert(roles.main_text.clone(), main);

    for name in &roles.start_date {
        let resolved = start_date(fields.get(name), request.source_date.as_deref());
        fields.insert(name.clone(), resolved);
    }

    let source = primary_source(fields.get(&roles.primary_source), hint);
    fields.insert(roles.primary_source.clone(), source);

    fields
}

fn main_text(value: Option<&FieldValue>, hint: Option<&str>) -> FieldValue {
    match (value, hint) {
        (Some(rich @ FieldValue::Rich(_)), _) => rich.clone(),
        (Some(value), Some(hint)) if !value.is_empty() => {
            let text = field_text(value);
            if text.contains(hint) {
                FieldValue::Text(text)
            } else {
                FieldValue::Text(format!("{text}\n{hint}"))
            }
        }
        (Some(value), None) if !value.is_empty() => value.clone(),
        (_, Some(hint)) => FieldValue::Text(format!("\n\n{hint}")),
        (_, None) => FieldValue::Text(String::new()),
    }
}

fn start_date(value: Option<&FieldValue>, source_date: Option<&str>) -> FieldValue {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        return value.clone();
    }
    let raw = source_date.unwrap_or_default();
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => FieldValue::Date(date),
        Err(_) => FieldValue::Text(raw.to_string()),
    }
}

fn primary_source(value: Option<&FieldValue>, hint: Option<&str>) -> FieldValue {
    match (value, hint) {
        (Some(value), _) if !value.is_empty() => value.clone(),
        (_, Some(hint)) => FieldValue::Text(hint.to_string()),
        _ => FieldValue::Text(String::new()),
    }
}

fn field_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(text) => text.clone(),
        FieldValue::Date(date) => date.format("%Y-%m-%d").to_string(),
        FieldValue::Rich(rt) => rt.plain(),
    }
}
