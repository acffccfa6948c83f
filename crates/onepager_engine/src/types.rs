use std::fmt;
use std::path::PathBuf;

use onepager_core::{
    CompanySuggestion, ExcelNotice, SuggestedOperation, SuggestionSource, TaskId,
};
use thiserror::Error;

use crate::probe::ProbeError;

/// Results leaving the engine thread. Cancelled work produces no event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Suggestions {
        generation: TaskId,
        source: SuggestionSource,
        suggestions: Vec<CompanySuggestion>,
    },
    CompanyMatches {
        task_id: TaskId,
        matches: Vec<CompanySuggestion>,
    },
    OperationsGenerated {
        task_id: TaskId,
        result: Result<Vec<SuggestedOperation>, ServiceError>,
    },
    ExcelValidated {
        task_id: TaskId,
        result: Result<ExcelNotice, ServiceError>,
    },
    ArtifactSaved {
        task_id: TaskId,
        result: Result<SavedArtifact, ServiceError>,
    },
    WorkflowFinished {
        result: Result<SavedArtifact, ServiceError>,
    },
    TimerFired {
        banner_id: u64,
    },
}

/// A downloaded file written to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    pub path: PathBuf,
    pub filename: String,
    /// Hex sha256 of the written bytes.
    pub digest: String,
    pub byte_len: u64,
    /// Partial-data warning carried in the response headers.
    pub notice: Option<ExcelNotice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Decode,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Decode => write!(f, "undecodable response"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Failure of one service call, as reported to the front end.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("cancelled")]
    Cancelled,
    /// The service refused the input; retrying elsewhere would not help.
    #[error("{message}")]
    Rejected { message: String },
    #[error("no backend answered ({attempts} tried)")]
    Unreachable { attempts: usize },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("could not read {path}: {message}")]
    Upload { path: PathBuf, message: String },
    #[error("could not save result: {0}")]
    Persist(String),
}

impl From<ProbeError> for ServiceError {
    fn from(err: ProbeError) -> Self {
        match err {
            ProbeError::Cancelled => ServiceError::Cancelled,
            ProbeError::Authoritative { message } => ServiceError::Rejected { message },
            ProbeError::Exhausted { attempts } => ServiceError::Unreachable { attempts },
        }
    }
}
