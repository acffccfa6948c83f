//! One-pager engine: company lookups, backend calls and effect execution.
mod artifact;
mod config;
mod engine;
mod excel;
mod fetch;
mod filename;
mod lookup;
mod operations;
mod persist;
mod probe;
mod providers;
mod service;
mod types;
mod workflows;

pub use config::{endpoint_url, BackendConfig, DIRECTORY_URL, LOGO_SEARCH_URL};
pub use engine::EngineHandle;
pub use excel::{ExcelValidation, VALIDATION_HEADER};
pub use filename::{default_artifact_name, disposition_filename, peer_analysis_name, sanitize_filename};
pub use lookup::{CompanyLookup, SuggestionSink};
pub use persist::{ensure_output_dir, sha256_hex, ArtifactStore, PersistError, StoredFile};
pub use probe::{probe_candidates, Attempt, ProbeError};
pub use providers::{
    parse_directory_response, DirectoryProvider, LogoSearchProvider, QueryMode, SuggestionProvider,
};
pub use service::OnePagerService;
pub use types::{EngineEvent, FailureKind, FetchError, SavedArtifact, ServiceError};
pub use workflows::{WorkflowError, WorkflowRequest};
