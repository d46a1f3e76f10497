//! Capture of reader-side (umya-spreadsheet) styles into [`CellStyle`] and
//! [`RunStyle`].

use crate::color::{Rgb, is_default_text_color, to_canonical};
use crate::model::{CellStyle, HorizontalAlign, VerticalAlign};
use crate::rich_text::RunStyle;
use std::str::FromStr;
use umya_spreadsheet::structs::{EnumTrait, HorizontalAlignmentValues, VerticalAlignmentValues};
use umya_spreadsheet::{Alignment, Fill, Font, PatternValues, Style};

/// Font size every new workbook starts with; not worth recording.
const DEFAULT_FONT_SIZE: f64 = 11.0;

pub fn cell_style_from(style: &Style) -> CellStyle {
    let mut out = CellStyle::default();

    if let Some(font) = style.get_font() {
        out.bold = (*font.get_bold()).then_some(true);
        out.italic = (*font.get_italic()).then_some(true);
        out.font_color = font_color(font);
        out.font_size =
            Some(*font.get_size()).filter(|size| *size > 0.0 && *size != DEFAULT_FONT_SIZE);
    }

    out.fill_color = style.get_fill().and_then(fill_color);

    if let Some(alignment) = style.get_alignment() {
        apply_alignment(&mut out, alignment);
    }

    out.number_format = style.get_number_format().and_then(|fmt| {
        let code = fmt.get_format_code();
        if code.is_empty() || code.eq_ignore_ascii_case("general") {
            None
        } else {
            Some(code.to_string())
        }
    });

    out
}

pub fn run_style_from(font: &Font) -> RunStyle {
    RunStyle::new(*font.get_bold(), *font.get_italic(), font_color(font))
}

/// Explicit black is what the reader reports for untouched text.
fn font_color(font: &Font) -> Option<Rgb> {
    to_canonical(Some(font.get_color().get_argb())).filter(|c| !is_default_text_color(c))
}

fn fill_color(fill: &Fill) -> Option<Rgb> {
    let pattern = fill.get_pattern_fill()?;
    if pattern.get_pattern_type() == &PatternValues::None {
        return None;
    }
    let color = pattern.get_foreground_color()?;
    to_canonical(Some(color.get_argb()))
}

fn apply_alignment(out: &mut CellStyle, alignment: &Alignment) {
    if alignment.get_horizontal() != &HorizontalAlignmentValues::General {
        out.h_align = HorizontalAlign::from_str(alignment.get_horizontal().get_value_string()).ok();
    }
    if alignment.get_vertical() != &VerticalAlignmentValues::Bottom {
        out.v_align = VerticalAlign::from_str(alignment.get_vertical().get_value_string()).ok();
    }
    if *alignment.get_wrap_text() {
        out.wrap_text = Some(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_style_captures_nothing() {
        let style = Style::default();
        let captured = cell_style_from(&style);
        assert!(!captured.is_non_default());
    }

    #[test]
    fn font_fill_and_alignment_are_captured() {
        let mut style = Style::default();
        style.get_font_mut().set_bold(true);
        style.get_font_mut().set_size(14.0);
        style.get_font_mut().get_color_mut().set_argb("FFFF0000");
        style
            .get_fill_mut()
            .get_pattern_fill_mut()
            .set_pattern_type(PatternValues::Solid)
            .get_foreground_color_mut()
            .set_argb("FFFFF59D");
        style
            .get_alignment_mut()
            .set_horizontal(HorizontalAlignmentValues::Center);
        style
            .get_alignment_mut()
            .set_vertical(VerticalAlignmentValues::Top);
        style.get_alignment_mut().set_wrap_text(true);
        style.get_number_format_mut().set_format_code("yyyy-mm-dd");

        let captured = cell_style_from(&style);
        assert_eq!(captured.bold, Some(true));
        assert_eq!(captured.italic, None);
        assert_eq!(captured.font_size, Some(14.0));
        assert_eq!(captured.font_color.map(|c| c.to_string()).as_deref(), Some("#FF0000"));
        assert_eq!(captured.fill_color.map(|c| c.to_string()).as_deref(), Some("#FFF59D"));
        assert_eq!(captured.h_align, Some(HorizontalAlign::Center));
        assert_eq!(captured.v_align, Some(VerticalAlign::Top));
        assert_eq!(captured.wrap_text, Some(true));
        assert_eq!(captured.number_format.as_deref(), Some("yyyy-mm-dd"));
    }

    #[test]
    fn black_run_color_is_inherited() {
        let mut font = Font::default();
        font.get_color_mut().set_argb("FF000000");
        font.set_italic(true);
        let run = run_style_from(&font);
        assert_eq!(run, RunStyle::italic());
    }
}
