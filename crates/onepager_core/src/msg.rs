use std::path::PathBuf;

use crate::{
    AboutField, CompanySuggestion, ExcelNotice, StepId, SuggestedOperation, SuggestionSource,
    TaskId, TurnId, UploadedFile,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User typed in the company name box.
    CompanyNameChanged(String),
    /// User typed in the website box.
    WebsiteChanged(String),
    /// User picked entry `n` from the suggestion dropdown.
    SuggestionPicked(usize),
    SuggestionsDismissed,
    /// User asked to resolve the company from its website.
    FindCompanyClicked,
    AboutToggled(AboutField),
    OperationToggled(usize),
    OperationKeyEdited { index: usize, text: String },
    OperationKeyCommitted(usize),
    /// Escape while editing a heading.
    OperationKeyReverted(usize),
    OperationValueEdited { index: usize, text: String },
    OperationAdded { heading: String, description: String },
    OperationsQueryChanged(String),
    FileSelected(UploadedFile),
    SubmitStep(StepId),
    /// User asked to go back and change an earlier answer.
    EditTurn(TurnId),
    /// User stopped a running generation.
    CancelGeneration,
    Restart,
    /// One provider answered a keystroke lookup.
    SuggestionsLoaded {
        generation: TaskId,
        source: SuggestionSource,
        suggestions: Vec<CompanySuggestion>,
    },
    CompanyFound {
        task_id: TaskId,
        matches: Vec<CompanySuggestion>,
    },
    OperationsLoaded {
        task_id: TaskId,
        result: Result<Vec<SuggestedOperation>, String>,
    },
    ExcelValidated {
        task_id: TaskId,
        result: Result<ExcelNotice, String>,
    },
    ArtifactFinished {
        task_id: TaskId,
        result: Result<ArtifactReady, ArtifactFailure>,
    },
    BannerExpired { banner_id: u64 },
}

/// A generated artifact saved to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReady {
    pub path: PathBuf,
    pub filename: String,
    pub digest: String,
    /// Partial-data warning sent alongside the artifact.
    pub notice: Option<ExcelNotice>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactFailure {
    /// The service rejected the workbook; no other backend was tried.
    Validation { message: String },
    /// Every candidate backend failed.
    Connectivity { attempts: usize },
    /// The request never left this machine, or its result could not be saved.
    Local { message: String },
}
