//! The single-request workflows: screenshot to Excel, financial
//! extraction from a PDF, and peer-set generation.

use std::path::{Path, PathBuf};

use onepager_logging::wizard_info;
use reqwest::multipart::Form;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::fetch::{error_details, parse_url, read_body, status_error};
use crate::filename::peer_analysis_name;
use crate::probe::{probe_candidates, Attempt};
use crate::service::{file_part, read_upload};
use crate::{OnePagerService, SavedArtifact, ServiceError};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowRequest {
    ScreenshotToExcel { image: PathBuf },
    FinancialExtraction { pdf: PathBuf },
    PeerSet { company_name: String },
}

/// Input rejected before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("{0} is not an image file")]
    NotAnImage(PathBuf),
    #[error("{0} is not a PDF file")]
    NotAPdf(PathBuf),
    #[error("please enter a company name")]
    MissingCompanyName,
}

impl From<WorkflowError> for ServiceError {
    fn from(err: WorkflowError) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string())
}

impl WorkflowRequest {
    pub fn validate(&self) -> Result<(), WorkflowError> {
        match self {
            WorkflowRequest::ScreenshotToExcel { image } if !has_extension(image, IMAGE_EXTENSIONS) => {
                Err(WorkflowError::NotAnImage(image.clone()))
            }
            WorkflowRequest::FinancialExtraction { pdf } if !has_extension(pdf, &["pdf"]) => {
                Err(WorkflowError::NotAPdf(pdf.clone()))
            }
            WorkflowRequest::PeerSet { company_name } if company_name.trim().is_empty() => {
                Err(WorkflowError::MissingCompanyName)
            }
            _ => Ok(()),
        }
    }

    fn path(&self) -> &'static str {
        match self {
            WorkflowRequest::ScreenshotToExcel { .. } => "api/screenshot-to-excel",
            WorkflowRequest::FinancialExtraction { .. } => "api/financial-extraction",
            WorkflowRequest::PeerSet { .. } => "api/peer-set-generation",
        }
    }

    /// Name of the saved workbook.
    pub fn output_name(&self) -> String {
        match self {
            WorkflowRequest::ScreenshotToExcel { .. } => "chart_data.xlsx".to_string(),
            WorkflowRequest::FinancialExtraction { .. } => "financial_statements.xlsx".to_string(),
            WorkflowRequest::PeerSet { company_name } => peer_analysis_name(company_name),
        }
    }
}

enum Payload {
    File {
        field: &'static str,
        name: String,
        bytes: Vec<u8>,
    },
    Text {
        field: &'static str,
        value: String,
    },
}

impl Payload {
    fn form(&self) -> Form {
        match self {
            Payload::File { field, name, bytes } => Form::new().part(*field, file_part(bytes, name)),
            Payload::Text { field, value } => Form::new().text(*field, value.clone()),
        }
    }
}

impl OnePagerService {
    /// Run one workflow and save the returned workbook.
    pub async fn run_workflow(
        &self,
        request: &WorkflowRequest,
        cancel: &CancellationToken,
    ) -> Result<SavedArtifact, ServiceError> {
        request.validate()?;
        let payload = match request {
            WorkflowRequest::ScreenshotToExcel { image } => Payload::File {
                field: "screenshot",
                name: file_name_of(image),
                bytes: read_upload(image).await?,
            },
            WorkflowRequest::FinancialExtraction { pdf } => Payload::File {
                field: "financialPdf",
                name: file_name_of(pdf),
                bytes: read_upload(pdf).await?,
            },
            WorkflowRequest::PeerSet { company_name } => Payload::Text {
                field: "companyName",
                value: company_name.trim().to_string(),
            },
        };
        let max_bytes = self.config.max_download_bytes;

        let body = probe_candidates(&self.endpoints(request.path()), cancel, |endpoint| {
            let payload = &payload;
            async move {
                let url = match parse_url(&endpoint) {
                    Ok(url) => url,
                    Err(err) => return Attempt::Retry(err),
                };
                let response = match self.client.post(url).multipart(payload.form()).send().await {
                    Ok(response) => response,
                    Err(err) => return Attempt::Retry(crate::fetch::map_reqwest_error(err)),
                };
                let status = response.status();
                if !status.is_success() {
                    let details = error_details(response).await;
                    return Attempt::Retry(status_error(status, details.message));
                }
                match read_body(response, max_bytes).await {
                    Ok(body) => Attempt::Success(body),
                    Err(err) => Attempt::Retry(err),
                }
            }
        })
        .await?;

        wizard_info!("{} returned {} bytes", request.path(), body.len());
        self.save(&request.output_name(), &body, None)
    }
}
