use crate::model::{AppendRequest, FieldValue, RowColor};
use crate::policy::ColumnRoles;
use crate::recovery::RetryConfig;
use crate::rich_text::RichText;
use crate::utils::column_name_to_number;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything the engine needs besides the workbook path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    pub roles: ColumnRoles,
    /// Headers that must be present before a row is appended.
    pub required_columns: Vec<String>,
    pub retry: RetryConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.roles.main_text.trim().is_empty(),
            "main text column name must not be empty"
        );
        anyhow::ensure!(
            !self.roles.day.trim().is_empty(),
            "day column name must not be empty"
        );
        anyhow::ensure!(
            column_name_to_number(&self.roles.day_fallback_letter).is_some(),
            "day fallback {:?} is not a column letter",
            self.roles.day_fallback_letter
        );
        anyhow::ensure!(
            self.retry.backoff_multiplier >= 1.0,
            "retry backoff multiplier must be at least 1.0"
        );
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub workbook: PathBuf,
    pub engine: EngineConfig,
}

impl AppConfig {
    /// CLI flags and their environment variables win over the config file,
    /// which wins over built-in defaults.
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            workbook: cli_workbook,
            require: cli_require,
            ..
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            workbook: file_workbook,
            required_columns: file_required,
            roles: file_roles,
            retry: file_retry,
        } = file_config;

        let workbook = cli_workbook
            .clone()
            .or(file_workbook)
            .context("no workbook given; pass --workbook or set TIMELINE_WORKBOOK")?;

        let mut required_columns: Vec<String> = Vec::new();
        for column in cli_require.clone().or(file_required).unwrap_or_default() {
            let column = column.trim().to_string();
            if !column.is_empty() && !required_columns.contains(&column) {
                required_columns.push(column);
            }
        }

        let mut retry = file_retry.unwrap_or_default();
        retry.max_attempts = retry.max_attempts.max(1);

        let engine = EngineConfig {
            roles: file_roles.unwrap_or_default(),
            required_columns,
            retry,
        };
        engine.validate()?;

        Ok(Self { workbook, engine })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "timeline-append",
    about = "Append rows to a newspaper-clipping timeline workbook",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "TIMELINE_WORKBOOK",
        value_name = "FILE",
        help = "Timeline workbook to operate on",
        global = true
    )]
    pub workbook: Option<PathBuf>,

    #[arg(
        long,
        env = "TIMELINE_REQUIRED_COLUMNS",
        value_name = "COL",
        value_delimiter = ',',
        help = "Comma-separated header names that must exist",
        global = true
    )]
    pub require: Option<Vec<String>>,

    #[arg(long, help = "Print results as JSON", global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Append one row to the workbook
    Append(AppendArgs),
    /// List the header row
    Headers,
    /// Report required columns missing from the header row
    Validate,
}

#[derive(Args, Debug, Clone, Default)]
pub struct AppendArgs {
    #[arg(
        long = "field",
        value_name = "NAME=VALUE",
        value_parser = parse_key_value,
        help = "Text value for a column; repeatable"
    )]
    pub fields: Vec<(String, String)>,

    #[arg(
        long = "date",
        value_name = "NAME=YYYY-MM-DD",
        value_parser = parse_key_date,
        help = "Date value for a column; repeatable"
    )]
    pub dates: Vec<(String, NaiveDate)>,

    #[arg(
        long = "rich",
        value_name = "NAME=JSON",
        value_parser = parse_key_value,
        help = "Rich text for a column as a JSON run list, e.g. [{\"text\":\"a\",\"bold\":true}]"
    )]
    pub rich: Vec<(String, String)>,

    #[arg(long, value_name = "TEXT", help = "Filename of the clipping")]
    pub hint: Option<String>,

    #[arg(long, value_name = "COLOR", help = "Row highlight: yellow, green, blue, red, pink, gray")]
    pub color: Option<RowColor>,

    #[arg(long, value_name = "DATE", help = "Publication date used when no start date is given")]
    pub source_date: Option<String>,

    #[arg(long, help = "Fail immediately when the workbook is locked")]
    pub no_retry: bool,
}

impl AppendArgs {
    pub fn to_request(&self) -> Result<AppendRequest> {
        let mut request = AppendRequest::new().row_color(self.color.unwrap_or_default());
        for (name, value) in &self.fields {
            request = request.field(name.clone(), value.as_str());
        }
        for (name, date) in &self.dates {
            request = request.field(name.clone(), *date);
        }
        for (name, json) in &self.rich {
            let rich: RichText = serde_json::from_str(json)
                .with_context(|| format!("invalid rich text for column {name:?}"))?;
            request = request.field(name.clone(), FieldValue::Rich(rich));
        }
        if let Some(hint) = &self.hint {
            request = request.filename_hint(hint.clone());
        }
        if let Some(date) = &self.source_date {
            request = request.source_date(date.clone());
        }
        Ok(request)
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing column name in {raw:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_key_date(raw: &str) -> Result<(String, NaiveDate), String> {
    let (key, value) = parse_key_value(raw)?;
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid date {value:?}: {e}"))?;
    Ok((key, date))
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    workbook: Option<PathBuf>,
    required_columns: Option<Vec<String>>,
    roles: Option<ColumnRoles>,
    retry: Option<RetryConfig>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
