use std::fmt::{self, Debug, Display};
use std::io;

/// Provides `EpidayError` and maps other errors to
/// convert to an `EpidayError`
#[derive(Debug)]
pub enum EpidayError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CSVError(csv::Error),
    ReportError(String),
    EpidayError(String),
}

impl From<io::Error> for EpidayError {
    fn from(error: io::Error) -> Self {
        EpidayError::IoError(error)
    }
}

impl From<serde_json::Error> for EpidayError {
    fn from(error: serde_json::Error) -> Self {
        EpidayError::JsonError(error)
    }
}

impl From<csv::Error> for EpidayError {
    fn from(error: csv::Error) -> Self {
        EpidayError::CSVError(error)
    }
}

impl From<String> for EpidayError {
    fn from(error: String) -> Self {
        EpidayError::EpidayError(error)
    }
}

impl From<&str> for EpidayError {
    fn from(error: &str) -> Self {
        EpidayError::EpidayError(error.to_string())
    }
}

impl std::error::Error for EpidayError {}

impl Display for EpidayError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Error: {self:?}")?;
        Ok(())
    }
}
