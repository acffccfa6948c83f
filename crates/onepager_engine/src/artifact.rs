use bytes::Bytes;
use onepager_core::{ArtifactRequest, ExcelNotice};
use onepager_logging::{wizard_info, wizard_warn};
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION};
use reqwest::multipart::Form;
use reqwest::StatusCode;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::excel::header_warning;
use crate::fetch::{error_details, parse_url, read_body, status_error};
use crate::filename::{default_artifact_name, disposition_filename};
use crate::probe::{probe_candidates, Attempt};
use crate::service::{file_part, read_upload};
use crate::{OnePagerService, SavedArtifact, ServiceError};

const PPTX_PATH: &str = "one-pager/pptx";

/// Phrases the service uses for workbook problems no other backend would accept.
const VALIDATION_PHRASES: &[&str] = &["missing required financial sheets", "Excel validation failed"];

struct Download {
    body: Bytes,
    headers: HeaderMap,
}

fn is_validation_failure(status: StatusCode, flagged: bool, message: &str) -> bool {
    status == StatusCode::BAD_REQUEST
        || flagged
        || VALIDATION_PHRASES.iter().any(|phrase| message.contains(phrase))
}

fn artifact_form(request: &ArtifactRequest, excel: &[u8]) -> Form {
    let about = json!({
        "founding_year": request.about.founding_year,
        "founder_name": request.about.founder_name,
        "headquarter_city": request.about.headquarter_city,
        "shareholding_pattern": request.about.shareholding_pattern,
    });
    let selected: Vec<_> = request
        .operations_selected
        .iter()
        .map(|op| json!({ "key": op.key, "value": op.value }))
        .collect();
    Form::new()
        .text("companyName", request.company_name.clone())
        .text("websiteUrl", request.website_url.clone())
        .text("aboutPreferences", about.to_string())
        .text("operationsSelected", json!(selected).to_string())
        .text("operationsQuery", request.operations_query.clone())
        .part("excelFile", file_part(excel, &request.excel_file.name))
}

impl OnePagerService {
    /// Generate the one-pager deck and save it to the output directory.
    ///
    /// A workbook rejection halts probing: the message is authoritative and
    /// the remaining candidates are never contacted.
    pub async fn generate_artifact(
        &self,
        request: &ArtifactRequest,
        cancel: &CancellationToken,
    ) -> Result<SavedArtifact, ServiceError> {
        let excel = read_upload(&request.excel_file.path).await?;
        let max_bytes = self.config.max_download_bytes;

        let download = probe_candidates(&self.endpoints(PPTX_PATH), cancel, |endpoint| {
            let excel = &excel;
            async move {
                let url = match parse_url(&endpoint) {
                    Ok(url) => url,
                    Err(err) => return Attempt::Retry(err),
                };
                let form = artifact_form(request, excel);
                let response = match self.client.post(url).multipart(form).send().await {
                    Ok(response) => response,
                    Err(err) => return Attempt::Retry(crate::fetch::map_reqwest_error(err)),
                };
                let status = response.status();
                if !status.is_success() {
                    let details = error_details(response).await;
                    if is_validation_failure(status, details.flagged_validation, &details.message) {
                        return Attempt::Authoritative(details.message);
                    }
                    return Attempt::Retry(status_error(status, details.message));
                }
                let headers = response.headers().clone();
                match read_body(response, max_bytes).await {
                    Ok(body) => Attempt::Success(Download { body, headers }),
                    Err(err) => Attempt::Retry(err),
                }
            }
        })
        .await?;

        let filename = download
            .headers
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(disposition_filename)
            .unwrap_or_else(|| default_artifact_name(&request.company_name));
        let notice = header_warning(&download.headers);
        if let Some(ExcelNotice::PartialWarning { message, .. }) = &notice {
            wizard_warn!("Generated with partial data: {}", message);
        }
        self.save(&filename, &download.body, notice)
    }

    pub(crate) fn save(
        &self,
        filename: &str,
        body: &[u8],
        notice: Option<ExcelNotice>,
    ) -> Result<SavedArtifact, ServiceError> {
        let stored = self
            .store
            .store(filename, body)
            .map_err(|err| ServiceError::Persist(err.to_string()))?;
        wizard_info!(
            "Saved {} ({} bytes, sha256 {})",
            stored.path.display(),
            stored.byte_len,
            stored.digest
        );
        Ok(SavedArtifact {
            path: stored.path,
            filename: filename.to_string(),
            digest: stored.digest,
            byte_len: stored.byte_len,
            notice,
        })
    }
}
