use std::path::Path;

use onepager_logging::wizard_info;
use reqwest::multipart::Part;

use crate::fetch::build_client;
use crate::persist::ArtifactStore;
use crate::{BackendConfig, FetchError, ServiceError};

/// Client for the one-pager backend. Every call probes the candidate base
/// URLs in order; see `BackendConfig::candidate_base_urls`.
#[derive(Clone)]
pub struct OnePagerService {
    pub(crate) client: reqwest::Client,
    pub(crate) config: BackendConfig,
    pub(crate) store: ArtifactStore,
}

impl OnePagerService {
    pub fn new(config: BackendConfig) -> Result<Self, FetchError> {
        let client = build_client(&config)?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: BackendConfig) -> Self {
        wizard_info!(
            "One-pager backend candidates: {}",
            config.candidate_base_urls().join(", ")
        );
        Self {
            client,
            store: ArtifactStore::new(config.output_dir.clone()),
            config,
        }
    }

    pub(crate) fn endpoints(&self, path: &str) -> Vec<String> {
        self.config.endpoint_candidates(path)
    }
}

/// Read a local file for upload. The bytes are read once and re-sent to
/// every candidate.
pub(crate) async fn read_upload(path: &Path) -> Result<Vec<u8>, ServiceError> {
    tokio::fs::read(path).await.map_err(|err| ServiceError::Upload {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

pub(crate) fn file_part(bytes: &[u8], file_name: &str) -> Part {
    Part::bytes(bytes.to_vec()).file_name(file_name.to_string())
}
