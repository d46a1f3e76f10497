//! Library-neutral rich text and the duplicated-prefix repair.
//!
//! When one xlsx library writes a rich string and another parses it back, the
//! parser sometimes yields an extra leading plain part holding (nearly) the
//! whole cell text, followed by the correctly styled runs. Writing that back
//! doubles the text on every rewrite. [`repair`] strips such prefixes.

use crate::color::{Rgb, is_default_text_color};
use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// Minimum share of the tail length a plain head must reach to count as a
/// duplicate of it.
pub const DUPLICATE_PREFIX_RATIO: f64 = 0.7;

/// Inline character formatting of one run. `None` means "inherit".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgb>,
}

impl RunStyle {
    /// Builds a style from reader flags, dropping values that equal the
    /// inherited default.
    pub fn new(bold: bool, italic: bool, color: Option<Rgb>) -> Self {
        Self {
            bold: bold.then_some(true),
            italic: italic.then_some(true),
            color: color.filter(|c| !is_default_text_color(c)),
        }
    }

    pub fn bold() -> Self {
        Self::new(true, false, None)
    }

    pub fn italic() -> Self {
        Self::new(false, true, None)
    }

    pub fn colored(color: Rgb) -> Self {
        Self::new(false, false, Some(color))
    }

    pub fn is_default(&self) -> bool {
        self.bold != Some(true)
            && self.italic != Some(true)
            && self.color.is_none_or(|c| is_default_text_color(&c))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    #[serde(flatten)]
    pub style: RunStyle,
}

impl Run {
    pub fn new(text: impl Into<String>, style: RunStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, RunStyle::default())
    }
}

/// One element of a rich value as the reader reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RichPart {
    /// Text without any run properties.
    Plain(String),
    /// A run block with properties, possibly all default.
    Styled(Run),
}

impl RichPart {
    pub fn text(&self) -> &str {
        match self {
            RichPart::Plain(text) => text,
            RichPart::Styled(run) => &run.text,
        }
    }

    fn into_run(self) -> Run {
        match self {
            RichPart::Plain(text) => Run::plain(text),
            RichPart::Styled(run) => run,
        }
    }
}

/// An ordered, non-empty sequence of runs, none with empty text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Run>", into = "Vec<Run>")]
pub struct RichText {
    runs: Vec<Run>,
}

impl RichText {
    pub fn from_runs<I>(runs: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = Run>,
    {
        let runs: Vec<Run> = runs.into_iter().filter(|run| !run.text.is_empty()).collect();
        if runs.is_empty() {
            return Err(EngineError::EmptyRichText);
        }
        Ok(Self { runs })
    }

    /// Repairs reader output and converts it into runs.
    pub fn from_parts(parts: Vec<RichPart>) -> Result<Self, EngineError> {
        Self::from_runs(repair(parts).into_iter().map(RichPart::into_run))
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn plain(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    pub fn has_styling(&self) -> bool {
        self.runs.iter().any(|run| !run.style.is_default())
    }

    /// Coalesces neighbouring runs that share a style.
    pub fn merge_adjacent(&self) -> Self {
        let mut merged: Vec<Run> = Vec::with_capacity(self.runs.len());
        for run in &self.runs {
            match merged.last_mut() {
                Some(last) if last.style == run.style => last.text.push_str(&run.text),
                _ => merged.push(run.clone()),
            }
        }
        Self { runs: merged }
    }
}

impl TryFrom<Vec<Run>> for RichText {
    type Error = EngineError;

    fn try_from(runs: Vec<Run>) -> Result<Self, Self::Error> {
        Self::from_runs(runs)
    }
}

impl From<RichText> for Vec<Run> {
    fn from(value: RichText) -> Self {
        value.runs
    }
}

/// Removes duplicated plain prefixes until none is left.
///
/// A plain head is only dropped when its text repeats the styled tail. A long
/// unstyled introduction with different text is kept as written.
pub fn repair(mut parts: Vec<RichPart>) -> Vec<RichPart> {
    let mut removed = 0usize;
    while has_duplicated_prefix(&parts) {
        parts.remove(0);
        removed += 1;
    }
    if removed > 0 {
        tracing::debug!(removed, remaining = parts.len(), "repaired duplicated rich-text prefix");
    }
    parts
}

/// True when `parts` starts with a plain part that repeats the text of the
/// styled parts after it.
pub fn has_duplicated_prefix(parts: &[RichPart]) -> bool {
    let Some((RichPart::Plain(head), tail)) = parts.split_first() else {
        return false;
    };
    if tail.is_empty() || !tail.iter().any(|part| matches!(part, RichPart::Styled(_))) {
        return false;
    }

    let tail_text: String = tail.iter().map(RichPart::text).collect();
    let tail_len = tail_text.chars().count();
    let head_len = head.chars().count();
    if (head_len as f64) <= DUPLICATE_PREFIX_RATIO * tail_len as f64 {
        return false;
    }

    let head = collapse_whitespace(head);
    let tail = collapse_whitespace(&tail_text);
    if head.is_empty() || tail.is_empty() {
        return false;
    }
    head.contains(&tail) || tail.contains(&head)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn red() -> Rgb {
        Rgb::new(0xFF0000)
    }

    fn styled(text: &str, style: RunStyle) -> RichPart {
        RichPart::Styled(Run::new(text, style))
    }

    fn corrupted() -> Vec<RichPart> {
        vec![
            RichPart::Plain("Bold red tail".into()),
            styled("Bold ", RunStyle::bold()),
            styled("red", RunStyle::colored(red())),
            styled(" tail", RunStyle::default()),
        ]
    }

    #[test]
    fn from_runs_drops_empty_and_rejects_nothing_left() {
        let rt = RichText::from_runs(vec![Run::plain(""), Run::plain("a")]).unwrap();
        assert_eq!(rt.runs().len(), 1);
        assert_matches!(
            RichText::from_runs(vec![Run::plain("")]),
            Err(EngineError::EmptyRichText)
        );
    }

    #[test]
    fn duplicated_prefix_is_removed() {
        let rt = RichText::from_parts(corrupted()).unwrap();
        assert_eq!(rt.runs().len(), 3);
        assert_eq!(rt.plain(), "Bold red tail");
        assert_eq!(rt.runs()[0].style, RunStyle::bold());
        assert_eq!(rt.runs()[1].style.color, Some(red()));
    }

    #[test]
    fn repair_is_idempotent() {
        let once = repair(corrupted());
        assert_eq!(once.len(), 3);
        assert_eq!(repair(once.clone()), once);
    }

    #[test]
    fn leading_unstyled_run_survives() {
        let parts = vec![
            RichPart::Plain("A fairly long unstyled introduction ".into()),
            styled("x", RunStyle::bold()),
        ];
        assert_eq!(repair(parts.clone()), parts);
    }

    #[test]
    fn short_head_is_not_a_duplicate() {
        let parts = vec![
            RichPart::Plain("Bold".into()),
            styled("Bold red tail and more", RunStyle::bold()),
        ];
        assert!(!has_duplicated_prefix(&parts));
    }

    #[test]
    fn all_plain_tail_is_left_alone() {
        let parts = vec![
            RichPart::Plain("abc".into()),
            RichPart::Plain("abc".into()),
        ];
        assert_eq!(repair(parts.clone()), parts);
    }

    #[test]
    fn short_inputs_unchanged() {
        assert!(repair(Vec::new()).is_empty());
        let single = vec![RichPart::Plain("only".into())];
        assert_eq!(repair(single.clone()), single);
    }

    #[test]
    fn default_black_is_not_a_style() {
        let style = RunStyle::new(false, false, Some(Rgb::new(0)));
        assert!(style.is_default());
        assert_eq!(style, RunStyle::default());
    }

    #[test]
    fn merge_adjacent_joins_equal_styles() {
        let rt = RichText::from_runs(vec![
            Run::new("a", RunStyle::bold()),
            Run::new("b", RunStyle::bold()),
            Run::plain("c"),
        ])
        .unwrap();
        let merged = rt.merge_adjacent();
        assert_eq!(merged.runs().len(), 2);
        assert_eq!(merged.plain(), rt.plain());
    }

    #[test]
    fn serde_round_trip() {
        let rt = RichText::from_runs(vec![
            Run::new("Bold ", RunStyle::bold()),
            Run::new("red", RunStyle::colored(red())),
        ])
        .unwrap();
        let json = serde_json::to_string(&rt).unwrap();
        assert_eq!(
            json,
            r##"[{"text":"Bold ","bold":true},{"text":"red","color":"#FF0000"}]"##
        );
        let back: RichText = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rt);
        assert!(serde_json::from_str::<RichText>("[]").is_err());
    }
}
