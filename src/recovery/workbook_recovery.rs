//! Preflight checks for workbook files that are missing or clearly not xlsx.

use crate::error::EngineError;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::warn;

/// Local file header signature every xlsx (zip) archive starts with.
const ZIP_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Corruption detection ahead of parsing
#[derive(Debug, Clone)]
pub struct CorruptionDetector {
    /// Minimum file size to be considered valid (in bytes)
    pub min_file_size: u64,
    /// Maximum file size to process (in bytes)
    pub max_file_size: u64,
}

impl Default for CorruptionDetector {
    fn default() -> Self {
        Self {
            min_file_size: 100,
            max_file_size: 200 * 1024 * 1024,
        }
    }
}

impl CorruptionDetector {
    pub fn detect(&self, path: &Path) -> Result<CorruptionStatus, EngineError> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CorruptionStatus::Missing);
            }
            Err(e) => return Err(EngineError::from_io(path, "stat", e)),
        };

        if !metadata.is_file() {
            return Ok(CorruptionStatus::NotAFile);
        }

        let file_size = metadata.len();
        if file_size < self.min_file_size {
            warn!(
                path = ?path,
                size = file_size,
                min_size = self.min_file_size,
                "file too small, likely corrupted"
            );
            return Ok(CorruptionStatus::TooSmall { actual: file_size });
        }
        if file_size > self.max_file_size {
            warn!(
                path = ?path,
                size = file_size,
                max_size = self.max_file_size,
                "file too large"
            );
            return Ok(CorruptionStatus::TooLarge { actual: file_size });
        }

        let mut header = [0u8; 4];
        fs::File::open(path)
            .and_then(|mut file| file.read_exact(&mut header))
            .map_err(|e| EngineError::from_io(path, "read signature", e))?;

        if header == ZIP_SIGNATURE {
            Ok(CorruptionStatus::Healthy)
        } else {
            Ok(CorruptionStatus::InvalidSignature)
        }
    }

    /// [`detect`](Self::detect), with every unhealthy status turned into the
    /// matching error.
    pub fn ensure_readable(&self, path: &Path) -> Result<(), EngineError> {
        let status = self.detect(path)?;
        match status {
            CorruptionStatus::Healthy => Ok(()),
            CorruptionStatus::Missing | CorruptionStatus::NotAFile => Err(EngineError::FileMissing {
                path: path.to_path_buf(),
            }),
            other => Err(EngineError::Corrupted {
                path: path.to_path_buf(),
                detail: other.to_string(),
            }),
        }
    }
}

/// Status of a preflight check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorruptionStatus {
    Healthy,
    Missing,
    NotAFile,
    TooSmall { actual: u64 },
    TooLarge { actual: u64 },
    /// Not a zip archive.
    InvalidSignature,
}

impl CorruptionStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, CorruptionStatus::Healthy)
    }
}

impl std::fmt::Display for CorruptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorruptionStatus::Healthy => write!(f, "healthy"),
            CorruptionStatus::Missing => write!(f, "file does not exist"),
            CorruptionStatus::NotAFile => write!(f, "path is not a regular file"),
            CorruptionStatus::TooSmall { actual } => {
                write!(f, "file is only {actual} bytes, too small for a workbook")
            }
            CorruptionStatus::TooLarge { actual } => {
                write!(f, "file is {actual} bytes, larger than the processing limit")
            }
            CorruptionStatus::InvalidSignature => write!(f, "file is not a zip-based workbook"),
        }
    }
}
