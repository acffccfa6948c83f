use onepager_core::{ExcelNotice, UploadedFile};
use onepager_logging::{wizard_debug, wizard_info};
use reqwest::header::HeaderMap;
use reqwest::multipart::Form;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::fetch::{error_details, parse_url, status_error};
use crate::probe::{probe_candidates, Attempt};
use crate::service::{file_part, read_upload};
use crate::{OnePagerService, ServiceError};

const VALIDATE_PATH: &str = "one-pager/validate-excel";

/// Header carrying a JSON `ExcelValidation` that overrides the body.
pub const VALIDATION_HEADER: &str = "x-excel-validation-message";

const INVALID_MESSAGE: &str = "We couldn't find the needed financial or shareholding data.";
const VALID_MESSAGE: &str = "Excel file validated successfully.";

/// Validation verdict as the service reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExcelValidation {
    pub valid: bool,
    pub message: Option<String>,
    pub has_financial_data: Option<bool>,
    pub has_shareholding_data: Option<bool>,
    pub partial_warning: Option<String>,
}

impl ExcelValidation {
    /// The header verdict wins over the body when it parses.
    pub fn with_header(self, headers: &HeaderMap) -> Self {
        headers
            .get(VALIDATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| serde_json::from_str::<ExcelValidation>(raw).ok())
            .unwrap_or(self)
    }

    /// Exactly one data set present on a valid file, or an explicit
    /// `partialWarning`, makes a partial warning.
    fn missing_data(&self) -> Option<&'static str> {
        match (self.has_financial_data, self.has_shareholding_data) {
            (Some(true), Some(false)) => Some("shareholding"),
            (Some(false), Some(true)) => Some("financial"),
            _ => None,
        }
    }

    pub fn into_notice(self) -> ExcelNotice {
        let missing = self.missing_data();
        let message = self.message.filter(|m| !m.trim().is_empty());
        if let Some(warning) = self.partial_warning.filter(|w| !w.trim().is_empty()) {
            return ExcelNotice::PartialWarning {
                message: warning,
                missing: missing.map(str::to_string),
            };
        }
        if !self.valid {
            return ExcelNotice::Invalid {
                message: message.unwrap_or_else(|| INVALID_MESSAGE.to_string()),
            };
        }
        if let Some(missing) = missing {
            return ExcelNotice::PartialWarning {
                message: message.unwrap_or_else(|| format!("Warning: {missing} data is missing")),
                missing: Some(missing.to_string()),
            };
        }
        ExcelNotice::Valid {
            message: message.unwrap_or_else(|| VALID_MESSAGE.to_string()),
        }
    }
}

/// Partial-data warning carried in an artifact response, if any.
pub(crate) fn header_warning(headers: &HeaderMap) -> Option<ExcelNotice> {
    if !headers.contains_key(VALIDATION_HEADER) {
        return None;
    }
    let notice = ExcelValidation {
        valid: true,
        ..ExcelValidation::default()
    }
    .with_header(headers)
    .into_notice();
    matches!(notice, ExcelNotice::PartialWarning { .. }).then_some(notice)
}

impl OnePagerService {
    /// Pre-validate an attached workbook before generation.
    pub async fn validate_excel(
        &self,
        file: &UploadedFile,
        cancel: &CancellationToken,
    ) -> Result<ExcelNotice, ServiceError> {
        let bytes = read_upload(&file.path).await?;
        let notice = probe_candidates(&self.endpoints(VALIDATE_PATH), cancel, |endpoint| {
            let bytes = &bytes;
            async move {
                let url = match parse_url(&endpoint) {
                    Ok(url) => url,
                    Err(err) => return Attempt::Retry(err),
                };
                let form = Form::new().part("excelFile", file_part(bytes, &file.name));
                let response = match self.client.post(url).multipart(form).send().await {
                    Ok(response) => response,
                    Err(err) => return Attempt::Retry(crate::fetch::map_reqwest_error(err)),
                };
                let status = response.status();
                if !status.is_success() {
                    let details = error_details(response).await;
                    return Attempt::Retry(status_error(status, details.message));
                }
                let headers = response.headers().clone();
                let body = response.json::<ExcelValidation>().await.unwrap_or_else(|err| {
                    wizard_debug!("Validation body unreadable: {}", err);
                    ExcelValidation::default()
                });
                Attempt::Success(body.with_header(&headers).into_notice())
            }
        })
        .await?;
        wizard_info!("Validated {}: {:?}", file.name, notice);
        Ok(notice)
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    fn verdict(financial: bool, shareholding: bool) -> ExcelValidation {
        ExcelValidation {
            valid: true,
            has_financial_data: Some(financial),
            has_shareholding_data: Some(shareholding),
            ..ExcelValidation::default()
        }
    }

    #[test]
    fn one_missing_data_set_is_a_partial_warning() {
        assert_eq!(
            verdict(true, false).into_notice(),
            ExcelNotice::PartialWarning {
                message: "Warning: shareholding data is missing".to_string(),
                missing: Some("shareholding".to_string()),
            }
        );
        assert_eq!(
            verdict(true, true).into_notice(),
            ExcelNotice::Valid {
                message: VALID_MESSAGE.to_string()
            }
        );
    }

    #[test]
    fn invalid_without_message_gets_default_text() {
        assert_eq!(
            ExcelValidation::default().into_notice(),
            ExcelNotice::Invalid {
                message: INVALID_MESSAGE.to_string()
            }
        );
    }

    #[test]
    fn header_overrides_body() {
        let mut headers = HeaderMap::new();
        headers.insert(
            VALIDATION_HEADER,
            HeaderValue::from_static(r#"{"valid":true,"partialWarning":"Shareholding sheet missing"}"#),
        );

        let notice = verdict(true, true).with_header(&headers).into_notice();
        assert_eq!(
            notice,
            ExcelNotice::PartialWarning {
                message: "Shareholding sheet missing".to_string(),
                missing: None,
            }
        );
        assert_eq!(header_warning(&headers), Some(notice));
        assert_eq!(header_warning(&HeaderMap::new()), None);
    }
}
