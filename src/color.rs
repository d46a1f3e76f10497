//! Color normalization between the reader's ARGB strings and canonical `#RRGGBB`.
//!
//! The reader reports many cells with explicit black text or white fills even
//! when nobody set them. Writing those back verbatim over-formats the sheet, so
//! the writer consults [`is_default_text_color`] and [`is_default_fill`] before
//! emitting a color.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

static HEX_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9A-Fa-f]{8}|[0-9A-Fa-f]{6}").expect("hex pattern compiles"));

pub const BLACK: Rgb = Rgb(0x000000);
pub const WHITE: Rgb = Rgb(0xFFFFFF);

/// A canonical 24-bit color. Displays as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rgb(u32);

impl Rgb {
    pub const fn new(value: u32) -> Self {
        Self(value & 0x00FF_FFFF)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.0)
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        to_canonical(Some(s)).ok_or_else(|| format!("not a color: {s:?}"))
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

fn named(raw: &str) -> Option<Rgb> {
    match raw.to_ascii_lowercase().as_str() {
        "black" => Some(BLACK),
        "white" => Some(WHITE),
        "red" => Some(Rgb(0xFF0000)),
        "green" => Some(Rgb(0x00FF00)),
        "blue" => Some(Rgb(0x0000FF)),
        _ => None,
    }
}

/// Normalizes a stored color to `#RRGGBB`.
///
/// The first 8- or 6-digit hex run wins; eight digits are ARGB and lose their
/// alpha byte. Anything unrecognized maps to `None`.
pub fn to_canonical(raw: Option<&str>) -> Option<Rgb> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(color) = named(raw) {
        return Some(color);
    }

    let found = HEX_RUN.find(raw)?.as_str();
    let rgb = if found.len() == 8 { &found[2..] } else { found };
    u32::from_str_radix(rgb, 16).ok().map(Rgb::new)
}

pub fn is_default_text_color(color: &Rgb) -> bool {
    *color == BLACK
}

pub fn is_default_fill(color: &Rgb) -> bool {
    *color == WHITE || *color == BLACK
}
