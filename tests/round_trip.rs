mod support;

use std::fs;

use support::{TestWorkspace, snapshot, temp_files};
use timeline_append::color::Rgb;
use timeline_append::model::{CellValue, HorizontalAlign, PlainValue, VerticalAlign};
use timeline_append::{AppendOutcome, AppendRequest, append};
use umya_spreadsheet::structs::{HorizontalAlignmentValues, VerticalAlignmentValues};
use umya_spreadsheet::PatternValues;

#[test]
fn existing_cells_replay_unchanged() {
    let workspace = TestWorkspace::new();
    let path = workspace.create_timeline("timeline.xlsx", |sheet| {
        sheet.get_cell_mut("B3").set_value("Tredje raden");
        sheet.get_cell_mut("E3").set_value_bool(true);
        sheet.get_cell_mut("D3").set_value_number(12.5);
    });

    let before = snapshot(&path);
    assert_eq!(append(&path, &AppendRequest::new().field("Händelse", "Ny")), AppendOutcome::Ok);
    let after = snapshot(&path);

    assert_eq!(after.headers, before.headers);
    assert_eq!(after.last_row, before.last_row + 1);
    for ((row, col), cell) in &before.grid {
        let replayed = after.cell(*row, *col).expect("cell replayed");
        assert_eq!(replayed.value, cell.value, "value at ({row}, {col})");
    }
    assert!(
        after
            .grid
            .keys()
            .all(|(row, col)| *row <= after.last_row && *col <= after.max_column())
    );
}

#[test]
fn styles_widths_and_heights_are_kept() {
    let workspace = TestWorkspace::new();
    let path = workspace.create_timeline("timeline.xlsx", |sheet| {
        sheet.get_column_dimension_mut("B").set_width(40.0);
        sheet.get_column_dimension_mut("D").set_width(18.0);
        sheet.get_row_dimension_mut(&2).set_height(45.0);

        let style = sheet.get_style_mut("B2");
        style.get_font_mut().set_bold(true);
        style.get_font_mut().set_italic(true);
        style.get_font_mut().set_size(14.0);
        style.get_font_mut().get_color_mut().set_argb("FF1F4E79");
        style
            .get_fill_mut()
            .get_pattern_fill_mut()
            .set_pattern_type(PatternValues::Solid)
            .get_foreground_color_mut()
            .set_argb("FFC8E6C9");
        style
            .get_alignment_mut()
            .set_horizontal(HorizontalAlignmentValues::Center);
        style
            .get_alignment_mut()
            .set_vertical(VerticalAlignmentValues::Top);

        // A white fill is treated as no fill at all.
        sheet
            .get_style_mut("D2")
            .get_fill_mut()
            .get_pattern_fill_mut()
            .set_pattern_type(PatternValues::Solid)
            .get_foreground_color_mut()
            .set_argb("FFFFFFFF");
    });

    for _ in 0..3 {
        assert_eq!(append(&path, &AppendRequest::new()), AppendOutcome::Ok);
    }
    let after = snapshot(&path);

    assert_eq!(after.col_widths.get("B").copied(), Some(40.0));
    assert_eq!(after.col_widths.get("D").copied(), Some(18.0));
    assert_eq!(after.row_heights.get(&2).copied(), Some(45.0));

    let b2 = &after.cell(2, 2).expect("B2").style;
    assert_eq!(b2.bold, Some(true));
    assert_eq!(b2.italic, Some(true));
    assert_eq!(b2.font_size, Some(14.0));
    assert_eq!(b2.font_color, Some(Rgb::new(0x1F4E79)));
    assert_eq!(b2.fill_color, Some(Rgb::new(0xC8E6C9)));
    assert_eq!(b2.h_align, Some(HorizontalAlign::Center));
    assert_eq!(b2.v_align, Some(VerticalAlign::Top));
    assert_eq!(b2.wrap_text, Some(true));

    let d2 = &after.cell(2, 4).expect("D2").style;
    assert_eq!(d2.fill_color, None);

    let a2 = after.cell(2, 1).expect("A2");
    assert_eq!(a2.style.number_format.as_deref(), Some("yyyy-mm-dd"));
    assert_eq!(a2.value, CellValue::Plain(PlainValue::Number(45000.0)));
}

#[test]
fn sheet_name_is_kept() {
    let workspace = TestWorkspace::new();
    let path = workspace.create_timeline("timeline.xlsx", |sheet| {
        sheet.set_name("Tidslinje");
    });
    assert_eq!(append(&path, &AppendRequest::new()), AppendOutcome::Ok);
    assert_eq!(snapshot(&path).sheet_name, "Tidslinje");
}

#[test]
fn stale_temp_file_does_not_block_commit() {
    let workspace = TestWorkspace::new();
    let path = workspace.create_timeline("timeline.xlsx", |_| {});
    fs::write(workspace.path("timeline.xlsx.tmp"), b"left over from a crash").unwrap();

    assert_eq!(append(&path, &AppendRequest::new()), AppendOutcome::Ok);
    assert!(temp_files(workspace.root()).is_empty());
    assert_eq!(snapshot(&path).last_row, 2);
}

#[test]
fn empty_request_rewrites_without_adding_a_row() {
    let workspace = TestWorkspace::new();
    let path = workspace.create_timeline("timeline.xlsx", |_| {});
    let before = snapshot(&path);
    assert_eq!(before.column_of("Dag"), Some(3));

    for _ in 0..2 {
        assert_eq!(append(&path, &AppendRequest::new()), AppendOutcome::Ok);
    }

    let after = snapshot(&path);
    assert_eq!(after.last_row, before.last_row);
    assert!(after.cell(3, 3).is_none());
    assert_eq!(
        after.cell(2, 3).map(|c| &c.value),
        Some(&CellValue::Formula("TEXT(A2,\"ddd\")".into()))
    );
    assert!(temp_files(workspace.root()).is_empty());
}

#[test]
fn rows_append_strictly_after_last_used_row() {
    let workspace = TestWorkspace::new();
    let path = workspace.create_timeline("timeline.xlsx", |sheet| {
        // A styled but empty row below the data does not count as used.
        sheet.get_style_mut("B6").get_font_mut().set_bold(true);
        sheet.get_cell_mut("B4").set_value("Fjärde");
    });

    assert_eq!(snapshot(&path).last_row, 4);
    assert_eq!(append(&path, &AppendRequest::new().field("Händelse", "Femte")), AppendOutcome::Ok);

    let after = snapshot(&path);
    assert_eq!(after.last_row, 5);
    assert_eq!(
        after.cell(5, 2).map(|c| &c.value),
        Some(&CellValue::Plain(PlainValue::Text("Femte".into())))
    );
}
