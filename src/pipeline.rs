//! Read-modify-write of one workbook: replay the snapshot into a fresh
//! workbook, add the new row, then swap it in with a rename.

use crate::error::{EngineError, is_lock_error};
use crate::model::{AppendRequest, CellStyle, FieldValue, PlainValue};
use crate::policy::{ColumnRoles, resolve_fields};
use crate::utils::temp_sibling;
use crate::workbook::WorkbookSnapshot;
use crate::writer::WorkbookWriter;
use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::Path;
use tracing::{debug, warn};

/// What a successful run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteSummary {
    pub replayed: usize,
    /// `None` when the request was empty and the workbook was only rewritten.
    pub appended_row: Option<u32>,
}

pub struct RewritePipeline<'a, W> {
    roles: &'a ColumnRoles,
    _writer: PhantomData<fn() -> W>,
}

impl<'a, W: WorkbookWriter> RewritePipeline<'a, W> {
    pub fn new(roles: &'a ColumnRoles) -> Self {
        Self {
            roles,
            _writer: PhantomData,
        }
    }

    /// Rewrites `target` as `snapshot` plus one row built from `request`.
    /// An empty request adds no row. On failure the temp file is gone and
    /// `target` is untouched.
    pub fn run(
        &self,
        snapshot: &WorkbookSnapshot,
        request: &AppendRequest,
        target: &Path,
    ) -> Result<RewriteSummary, EngineError> {
        let temp = temp_sibling(target);
        remove_stale(&temp);

        let result = self
            .write_temp(snapshot, request, &temp)
            .and_then(|summary| commit(&temp, target).map(|()| summary));

        if let Err(error) = &result {
            warn!(target = %target.display(), error = %error, "rewrite failed");
            discard(&temp);
        }
        result
    }

    fn write_temp(
        &self,
        snapshot: &WorkbookSnapshot,
        request: &AppendRequest,
        temp: &Path,
    ) -> Result<RewriteSummary, EngineError> {
        let mut writer = W::create(temp)?;
        writer.set_sheet_name(&snapshot.sheet_name);

        let baseline = CellStyle::baseline();
        for col in 1..=snapshot.max_column() {
            writer.set_column_default(col, &baseline)?;
        }
        for (col, width) in snapshot.widths_by_index() {
            writer.set_column_width(col, width)?;
        }
        for (row, height) in &snapshot.row_heights {
            writer.set_row_height(*row, *height)?;
        }

        for ((row, col), cell) in &snapshot.grid {
            writer.write_cell(*row, *col, cell)?;
        }
        debug!(cells = snapshot.grid.len(), "snapshot replayed");

        let appended_row = if request.is_empty() {
            debug!("empty request, nothing appended");
            None
        } else {
            Some(self.append_row(&mut writer, snapshot, request)?)
        };
        writer.close()?;

        Ok(RewriteSummary {
            replayed: snapshot.grid.len(),
            appended_row,
        })
    }

    fn append_row(
        &self,
        writer: &mut W,
        snapshot: &WorkbookSnapshot,
        request: &AppendRequest,
    ) -> Result<u32, EngineError> {
        let row = snapshot.last_row + 1;
        let fields = resolve_fields(request, self.roles);
        let style = CellStyle::baseline().with_fill(request.row_color.fill());
        let date_letter = self.roles.day_source_letter(&snapshot.headers);

        for (name, col) in &snapshot.headers {
            let col = *col;
            let value = fields.get(name).filter(|value| !value.is_empty());
            match value {
                None if *name == self.roles.day => {
                    let formula = format!("TEXT({date_letter}{row},\"ddd\")");
                    writer.write_formula(row, col, &formula, &style)?;
                }
                None => writer.write_blank(row, col, &style)?,
                Some(FieldValue::Rich(text)) => writer.write_rich(row, col, text, &style),
                Some(FieldValue::Text(text)) => {
                    writer.write_value(row, col, &PlainValue::Text(text.clone()), &style)?
                }
                Some(FieldValue::Date(date)) => {
                    writer.write_value(row, col, &PlainValue::Date(*date), &style)?
                }
            }
        }

        debug!(row, columns = snapshot.headers.len(), color = %request.row_color, "row appended");
        Ok(row)
    }
}

/// Renames the finished temp file over the target.
fn commit(temp: &Path, target: &Path) -> Result<(), EngineError> {
    fs::rename(temp, target).map_err(|source| {
        if is_lock_error(&source) {
            EngineError::FileLocked {
                path: target.to_path_buf(),
                source: Some(source),
            }
        } else {
            EngineError::Io {
                path: target.to_path_buf(),
                operation: "commit",
                source,
            }
        }
    })?;
    debug!(target = %target.display(), "rewrite committed");
    Ok(())
}

/// A leftover from a crashed run.
fn remove_stale(temp: &Path) {
    if temp.exists() {
        warn!(path = %temp.display(), "removing stale temp file");
        discard(temp);
    }
}

fn discard(temp: &Path) {
    match fs::remove_file(temp) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %temp.display(), error = %e, "failed to remove temp file"),
    }
}
