//! One-pager core: pure wizard state machine and transcript projection.
mod effect;
mod msg;
mod operations;
mod state;
mod suggestions;
mod update;
mod view_model;

pub use effect::{ArtifactRequest, Effect, SelectedOperation};
pub use msg::{ArtifactFailure, ArtifactReady, Msg};
pub use operations::{
    OperationOption, OperationOrigin, OperationsPanel, SuggestedOperation, MAX_HEADING_CHARS,
    MAX_DESCRIPTION_CHARS, MAX_USER_ADDED_OPERATIONS,
};
pub use state::{
    AboutField, AboutPreferences, ArtifactSummary, Attachment, Banner, BannerKind, CompanyForm,
    ExcelNotice, Role, StepId, TaskId, TaskKind, TaskRecord, TaskStatus, Turn, TurnCategory,
    TurnId, UploadedFile, WizardState,
};
pub use suggestions::{normalize_domain, CompanySuggestion, SuggestionList, SuggestionSource};
pub use update::{messages, update};
pub use view_model::{
    render, ActiveForm, OperationRowView, TurnView, WizardViewModel, DESCRIPTION_WARN_CHARS,
};
