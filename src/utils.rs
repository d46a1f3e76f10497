use chrono::Datelike;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub fn column_number_to_name(column: u32) -> String {
    let mut column = column;
    let mut name = String::new();
    while column > 0 {
        let rem = ((column - 1) % 26) as u8;
        name.insert(0, (b'A' + rem) as char);
        column = (column - 1) / 26;
    }
    name
}

/// `"A"` → 1, `"AB"` → 28. Returns `None` for anything that is not letters.
pub fn column_name_to_number(name: &str) -> Option<u32> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let mut value: u32 = 0;
    for ch in name.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
        value = value.checked_mul(26)?.checked_add(digit)?;
    }
    Some(value)
}

pub fn cell_address(column: u32, row: u32) -> String {
    format!("{}{}", column_number_to_name(column), row)
}

/// `book.xlsx` → `book.xlsx.tmp`, in the same directory so the final rename
/// never crosses a filesystem.
pub fn temp_sibling(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Day number of 1899-12-30, the epoch of spreadsheet date serials.
const SERIAL_EPOCH_FROM_CE: i32 = 693_594;

pub fn excel_serial(date: chrono::NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce() - SERIAL_EPOCH_FROM_CE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_names_round_trip() {
        for (num, name) in [
            (1, "A"),
            (9, "I"),
            (26, "Z"),
            (27, "AA"),
            (28, "AB"),
            (702, "ZZ"),
            (703, "AAA"),
        ] {
            assert_eq!(column_number_to_name(num), name);
            assert_eq!(column_name_to_number(name), Some(num));
        }
        assert_eq!(column_name_to_number("a"), Some(1));
        assert_eq!(column_name_to_number("A1"), None);
        assert_eq!(column_name_to_number(""), None);
    }

    #[test]
    fn temp_sibling_appends_suffix() {
        let temp = temp_sibling(Path::new("/data/timeline.xlsx"));
        assert_eq!(temp, PathBuf::from("/data/timeline.xlsx.tmp"));
    }

    #[test]
    fn serial_matches_spreadsheet_epoch() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        assert_eq!(excel_serial(date), 45365.0);
        let date = chrono::NaiveDate::from_ymd_opt(1900, 3, 1).unwrap();
        assert_eq!(excel_serial(date), 61.0);
    }
}
