use onepager_core::{SelectedOperation, SuggestedOperation};
use onepager_logging::{wizard_info, wizard_warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::fetch::{error_details, parse_url, status_error};
use crate::probe::{probe_candidates, Attempt};
use crate::{OnePagerService, ServiceError};

const GENERATE_PATH: &str = "one-pager/operations/generate";
const SAVE_PATH: &str = "operations/save";

#[derive(Debug, Deserialize)]
struct OperationItem {
    #[serde(default)]
    key: String,
    #[serde(default)]
    value: String,
}

#[derive(Serialize)]
struct KeyValue<'a> {
    key: &'a str,
    value: &'a str,
}

/// A 2xx body that is not an array of `{key, value}` means "no suggestions".
fn parse_operations(body: Value) -> Vec<SuggestedOperation> {
    serde_json::from_value::<Vec<OperationItem>>(body)
        .unwrap_or_default()
        .into_iter()
        .filter(|item| !item.key.trim().is_empty())
        .map(|item| SuggestedOperation {
            key: item.key,
            value: item.value,
        })
        .collect()
}

impl OnePagerService {
    /// Suggested operational highlights for the company.
    pub async fn generate_operations(
        &self,
        company_name: &str,
        website_url: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<SuggestedOperation>, ServiceError> {
        let body = json!({ "companyName": company_name, "websiteUrl": website_url });
        let operations = probe_candidates(&self.endpoints(GENERATE_PATH), cancel, |endpoint| {
            let body = &body;
            async move {
                let url = match parse_url(&endpoint) {
                    Ok(url) => url,
                    Err(err) => return Attempt::Retry(err),
                };
                let response = match self.client.post(url).json(body).send().await {
                    Ok(response) => response,
                    Err(err) => return Attempt::Retry(crate::fetch::map_reqwest_error(err)),
                };
                let status = response.status();
                if !status.is_success() {
                    let details = error_details(response).await;
                    return Attempt::Retry(status_error(status, details.message));
                }
                match response.json::<Value>().await {
                    Ok(body) => Attempt::Success(parse_operations(body)),
                    Err(err) => Attempt::Retry(crate::fetch::map_reqwest_error(err)),
                }
            }
        })
        .await?;
        wizard_info!(
            "Received {} operation suggestion(s) for {}",
            operations.len(),
            company_name
        );
        Ok(operations)
    }

    /// Record the user's selection. Failures are logged and swallowed.
    pub async fn save_operations(
        &self,
        company_name: &str,
        website_url: &str,
        selected: &[SelectedOperation],
    ) {
        let options: Vec<KeyValue<'_>> = selected
            .iter()
            .map(|op| KeyValue {
                key: &op.key,
                value: &op.value,
            })
            .collect();
        let body = json!({
            "companyName": company_name,
            "websiteUrl": website_url,
            "selectedOptions": options,
        });
        let never = CancellationToken::new();
        let saved = probe_candidates(&self.endpoints(SAVE_PATH), &never, |endpoint| {
            let body = &body;
            async move {
                let url = match parse_url(&endpoint) {
                    Ok(url) => url,
                    Err(err) => return Attempt::Retry(err),
                };
                match self.client.post(url).json(body).send().await {
                    Ok(response) if response.status().is_success() => Attempt::Success(()),
                    Ok(response) => {
                        let status = response.status();
                        Attempt::Retry(status_error(status, error_details(response).await.message))
                    }
                    Err(err) => Attempt::Retry(crate::fetch::map_reqwest_error(err)),
                }
            }
        })
        .await;
        match saved {
            Ok(()) => wizard_info!("Saved {} operation(s) for {}", selected.len(), company_name),
            Err(err) => wizard_warn!("Saving operations for {} failed: {}", company_name, err),
        }
    }
}
