pub mod append;
pub mod color;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod policy;
pub mod recovery;
pub mod rich_text;
pub mod styles;
pub mod utils;
pub mod workbook;
pub mod writer;

pub use append::{Appender, append, append_with_retry, load_headers, validate_schema};
pub use config::{AppConfig, CliArgs, Command, EngineConfig};
pub use error::{AppendOutcome, EngineError};
pub use logging::{LoggingConfig, init_logging};
pub use model::{AppendRequest, FieldValue, RowColor};
pub use policy::ColumnRoles;
pub use recovery::RetryConfig;
pub use rich_text::{RichText, Run, RunStyle};
pub use workbook::{UmyaReader, WorkbookReader, WorkbookSnapshot};
pub use writer::{WorkbookWriter, XlsxWriter};
