//! Public entry points. Everything here returns an [`AppendOutcome`] rather
//! than an error; nothing below escapes as a panic or an `Err`.

use crate::config::EngineConfig;
use crate::error::{AppendOutcome, EngineError};
use crate::logging::{append_span, inspect_span};
use crate::model::AppendRequest;
use crate::pipeline::RewritePipeline;
use crate::recovery::{ExponentialBackoff, RetryConfig, retry_with_policy};
use crate::workbook::{UmyaReader, WorkbookReader, WorkbookSnapshot};
use crate::writer::{WorkbookWriter, XlsxWriter};
use std::marker::PhantomData;
use std::path::Path;
use strum::Display;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
enum AppendState {
    Init,
    Loaded,
    Rewriting,
    Committed,
    Failed,
}

fn enter(state: AppendState) {
    debug!(state = %state, "append state");
}

/// Appends rows with a fixed reader and writer.
pub struct Appender<R = UmyaReader, W = XlsxWriter> {
    reader: R,
    config: EngineConfig,
    _writer: PhantomData<fn() -> W>,
}

impl Appender {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_reader(UmyaReader::default(), config)
    }
}

impl Default for Appender {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<R: WorkbookReader, W: WorkbookWriter> Appender<R, W> {
    pub fn with_reader(reader: R, config: EngineConfig) -> Self {
        Self {
            reader,
            config,
            _writer: PhantomData,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Appends one row after the last used row of the active sheet.
    pub fn append(&self, path: &Path, request: &AppendRequest) -> AppendOutcome {
        let _span = append_span(path).entered();
        let outcome = match self.try_append(path, request) {
            Ok(outcome) => outcome,
            Err(error) => {
                enter(AppendState::Failed);
                AppendOutcome::from(error)
            }
        };
        info!(outcome = outcome.label(), "append finished");
        outcome
    }

    /// [`append`](Self::append), retried with backoff while the workbook is
    /// locked, as configured in [`EngineConfig::retry`].
    pub fn append_with_retry(&self, path: &Path, request: &AppendRequest) -> AppendOutcome {
        self.append_with(path, request, &self.config.retry)
    }

    pub fn append_with(
        &self,
        path: &Path,
        request: &AppendRequest,
        retry: &RetryConfig,
    ) -> AppendOutcome {
        let policy = ExponentialBackoff::new(retry.clone());
        retry_with_policy(|| self.append(path, request), &policy, "append")
    }

    /// Header names of the active sheet in column order.
    pub fn load_headers(&self, path: &Path) -> Result<Vec<String>, AppendOutcome> {
        let _span = inspect_span("load_headers", path).entered();
        let snapshot = self.load(path)?;
        Ok(snapshot.header_names())
    }

    /// Required columns absent from the header row; empty when valid.
    pub fn validate_schema<S: AsRef<str>>(
        &self,
        path: &Path,
        required: &[S],
    ) -> Result<Vec<String>, AppendOutcome> {
        let _span = inspect_span("validate_schema", path).entered();
        let snapshot = self.load(path)?;
        Ok(snapshot.missing_columns(required))
    }

    fn load(&self, path: &Path) -> Result<WorkbookSnapshot, AppendOutcome> {
        if !path.is_file() {
            return Err(AppendOutcome::FileMissing);
        }
        self.reader.load(path).map_err(AppendOutcome::from)
    }

    fn try_append(
        &self,
        path: &Path,
        request: &AppendRequest,
    ) -> Result<AppendOutcome, EngineError> {
        enter(AppendState::Init);
        if !path.is_file() {
            enter(AppendState::Failed);
            return Ok(AppendOutcome::FileMissing);
        }

        let snapshot = self.reader.load(path)?;
        enter(AppendState::Loaded);

        let missing = snapshot.missing_columns(&self.config.required_columns);
        if !missing.is_empty() {
            enter(AppendState::Failed);
            debug!(missing = ?missing, "required columns absent");
            return Ok(AppendOutcome::SchemaMismatch(missing));
        }

        enter(AppendState::Rewriting);
        let summary = RewritePipeline::<W>::new(&self.config.roles).run(&snapshot, request, path)?;
        enter(AppendState::Committed);
        debug!(
            replayed = summary.replayed,
            row = ?summary.appended_row,
            "rewrite summary"
        );
        Ok(AppendOutcome::Ok)
    }
}

/// Appends one row using the default column roles and no required columns.
pub fn append(path: &Path, request: &AppendRequest) -> AppendOutcome {
    Appender::default().append(path, request)
}

pub fn append_with_retry(
    path: &Path,
    request: &AppendRequest,
    retry: RetryConfig,
) -> AppendOutcome {
    Appender::default().append_with(path, request, &retry)
}

pub fn load_headers(path: &Path) -> Result<Vec<String>, AppendOutcome> {
    Appender::default().load_headers(path)
}

pub fn validate_schema<S: AsRef<str>>(
    path: &Path,
    required: &[S],
) -> Result<Vec<String>, AppendOutcome> {
    Appender::default().validate_schema(path, required)
}
