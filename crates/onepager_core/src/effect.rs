use std::time::Duration;

use crate::{AboutPreferences, TaskId, TaskKind, UploadedFile};

/// Side effects requested by `update`; executed by the front end through the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Debounced keystroke lookup against both company providers.
    LookupSuggestions { generation: TaskId, query: String },
    FindCompany { task_id: TaskId, website_url: String },
    GenerateOperations {
        task_id: TaskId,
        company_name: String,
        website_url: String,
    },
    /// Fire-and-forget; failures are only logged.
    SaveOperations {
        company_name: String,
        website_url: String,
        selected: Vec<SelectedOperation>,
    },
    ValidateExcel { task_id: TaskId, file: UploadedFile },
    GenerateArtifact {
        task_id: TaskId,
        request: ArtifactRequest,
    },
    CancelTask { kind: TaskKind },
    DismissBannerAfter { banner_id: u64, after: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedOperation {
    pub key: String,
    pub value: String,
}

/// Everything the one-pager service needs for the final multipart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRequest {
    pub company_name: String,
    pub website_url: String,
    pub about: AboutPreferences,
    pub operations_selected: Vec<SelectedOperation>,
    pub operations_query: String,
    pub excel_file: UploadedFile,
}
