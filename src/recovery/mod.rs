//! Recovery around the rewrite:
//! - preflight corruption detection before a workbook is parsed
//! - retry with exponential backoff while the workbook is locked

mod retry;
mod workbook_recovery;

pub use retry::{ExponentialBackoff, RetryConfig, RetryPolicy, retry_with_policy};
pub use workbook_recovery::{CorruptionDetector, CorruptionStatus};
