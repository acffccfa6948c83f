use std::path::PathBuf;
use std::time::Duration;

use url::Url;

pub const LOGO_SEARCH_URL: &str = "https://api.logo.dev/search";
pub const DIRECTORY_URL: &str =
    "https://alerts-staging.bynd.ai/processingScripts/companySpecificAlerts/findCompany";

/// Everything the engine needs to reach the outside world.
///
/// Built once by the front end and handed to the engine; nothing is read
/// from the environment after that.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Where the one-pager service is normally hosted (same-origin deployment).
    pub origin: Option<String>,
    /// Explicitly configured backend base URL.
    pub backend_base_url: Option<String>,
    /// Local development defaults tried after the configured bases.
    pub fallback_bases: Vec<String>,
    pub logo_search_url: String,
    pub logo_api_key: Option<String>,
    pub directory_url: String,
    pub suggestion_debounce: Duration,
    /// Cap for the directory during keystroke lookups.
    pub directory_timeout: Duration,
    /// Cap for each provider when resolving a company from its website.
    pub find_company_timeout: Duration,
    pub connect_timeout: Duration,
    pub max_download_bytes: u64,
    pub output_dir: PathBuf,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            origin: None,
            backend_base_url: None,
            fallback_bases: vec![
                "http://localhost:3001/backend".to_string(),
                "http://127.0.0.1:3001/backend".to_string(),
                "http://localhost:5005".to_string(),
                "http://127.0.0.1:5005".to_string(),
            ],
            logo_search_url: LOGO_SEARCH_URL.to_string(),
            logo_api_key: None,
            directory_url: DIRECTORY_URL.to_string(),
            suggestion_debounce: Duration::from_millis(300),
            directory_timeout: Duration::from_secs(3),
            find_company_timeout: Duration::from_secs(4),
            connect_timeout: Duration::from_secs(10),
            max_download_bytes: 50 * 1024 * 1024,
            output_dir: PathBuf::from("output"),
        }
    }
}

impl BackendConfig {
    /// Backend base URLs in probing order, without duplicates.
    pub fn candidate_base_urls(&self) -> Vec<String> {
        let origin = non_empty(self.origin.as_deref());
        let mut bases = Vec::new();
        if let Some(origin) = origin {
            bases.push(origin.to_string());
        }
        if let Some(base) = non_empty(self.backend_base_url.as_deref()) {
            bases.push(base.to_string());
        }
        if let Some(origin) = origin {
            bases.push(format!("{origin}/backend"));
            bases.push(format!("{}/backend", with_port(origin, 3001)));
        }
        bases.extend(
            self.fallback_bases
                .iter()
                .filter_map(|base| non_empty(Some(base)))
                .map(str::to_string),
        );

        let mut unique: Vec<String> = Vec::with_capacity(bases.len());
        for base in bases {
            if !unique.contains(&base) {
                unique.push(base);
            }
        }
        unique
    }

    /// Full endpoint URLs for `path` on every candidate base.
    pub fn endpoint_candidates(&self, path: &str) -> Vec<String> {
        self.candidate_base_urls()
            .iter()
            .map(|base| endpoint_url(base, path))
            .collect()
    }

    /// Publishable keys are rejected by the search endpoint.
    pub fn logo_key_is_publishable(&self) -> bool {
        self.logo_api_key
            .as_deref()
            .is_some_and(|key| key.trim().starts_with("pk_"))
    }
}

/// Append `path` to `base` unless the base already points at it.
pub fn endpoint_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_matches('/');
    if base.ends_with(&format!("/{path}")) {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value
        .map(|v| v.trim().trim_end_matches('/'))
        .filter(|v| !v.is_empty())
}

/// `origin` with an explicit port replaced; origins without a port are kept.
fn with_port(origin: &str, port: u16) -> String {
    match Url::parse(origin) {
        Ok(mut url) if url.port().is_some() => {
            if url.set_port(Some(port)).is_ok() {
                url.as_str().trim_end_matches('/').to_string()
            } else {
                origin.to_string()
            }
        }
        _ => origin.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_follow_preference_order_without_duplicates() {
        let config = BackendConfig {
            origin: Some("http://localhost:3000/".to_string()),
            backend_base_url: Some("https://api.example.com".to_string()),
            ..BackendConfig::default()
        };

        assert_eq!(
            config.candidate_base_urls(),
            vec![
                "http://localhost:3000",
                "https://api.example.com",
                "http://localhost:3000/backend",
                "http://localhost:3001/backend",
                "http://127.0.0.1:3001/backend",
                "http://localhost:5005",
                "http://127.0.0.1:5005",
            ]
        );
    }

    #[test]
    fn origin_without_port_is_not_guessed_twice() {
        let config = BackendConfig {
            origin: Some("https://onepager.example.com".to_string()),
            fallback_bases: Vec::new(),
            ..BackendConfig::default()
        };

        assert_eq!(
            config.candidate_base_urls(),
            vec![
                "https://onepager.example.com",
                "https://onepager.example.com/backend",
            ]
        );
    }

    #[test]
    fn endpoint_path_is_not_appended_twice() {
        assert_eq!(
            endpoint_url("http://localhost:5005/", "one-pager/pptx"),
            "http://localhost:5005/one-pager/pptx"
        );
        assert_eq!(
            endpoint_url("http://localhost:5005/one-pager/pptx/", "one-pager/pptx"),
            "http://localhost:5005/one-pager/pptx"
        );
    }

    #[test]
    fn publishable_logo_key_is_detected() {
        let mut config = BackendConfig::default();
        assert!(!config.logo_key_is_publishable());
        config.logo_api_key = Some("pk_live_123".to_string());
        assert!(config.logo_key_is_publishable());
        config.logo_api_key = Some("sk_live_123".to_string());
        assert!(!config.logo_key_is_publishable());
    }
}
