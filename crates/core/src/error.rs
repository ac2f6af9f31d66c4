//! Error types for heatgis

use thiserror::Error;

/// Main error type for heatgis operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cannot load vector source '{path}': {reason}")]
    DataLoad { path: String, reason: String },

    #[error("Unresolvable CRS: {0}")]
    UnresolvedCrs(String),

    #[error("Catalog is empty: no sources registered")]
    EmptyCatalog,

    #[error("Unknown source_id: {0}")]
    UnknownSource(String),

    #[error("Unsupported evaluation: geometry family '{family}' with mode '{mode}'")]
    UnsupportedEvaluation { family: String, mode: String },

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Algorithm error: {0}")]
    Algorithm(String),
}

/// Coarse classification of [`Error`] variants.
///
/// `DataLoad` errors abort registration of one source, `Config` errors abort
/// a single evaluation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DataLoad,
    Config,
    Computation,
}

impl Error {
    pub fn data_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::DataLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_parameter(
        name: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) | Error::Json(_) | Error::DataLoad { .. } | Error::UnresolvedCrs(_) => {
                ErrorKind::DataLoad
            }
            Error::EmptyCatalog
            | Error::UnknownSource(_)
            | Error::UnsupportedEvaluation { .. }
            | Error::CrsMismatch(..)
            | Error::InvalidParameter { .. } => ErrorKind::Config,
            Error::Algorithm(_) => ErrorKind::Computation,
        }
    }
}

/// Result type alias for heatgis operations
pub type Result<T> = std::result::Result<T, Error>;
