//! Company lookup providers: a logo/domain search and an internal company
//! directory, each with a backend proxy to fall back on.

use async_trait::async_trait;
use onepager_core::{normalize_domain, CompanySuggestion, SuggestionSource};
use onepager_logging::{wizard_debug, wizard_warn};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::fetch::{parse_url, read_json, with_query};
use crate::{BackendConfig, FailureKind, FetchError};

const LOGO_PROXY_PATH: &str = "api/logo-dev-search";
const DIRECTORY_PROXY_PATH: &str = "api/bynd-company-search";

/// What the query text is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    CompanyName,
    Website,
}

#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    fn source(&self) -> SuggestionSource;

    /// Matching companies. An empty list means the provider answered but knows nothing.
    async fn search(
        &self,
        query: &str,
        mode: QueryMode,
    ) -> Result<Vec<CompanySuggestion>, FetchError>;
}

#[derive(Debug, Deserialize)]
struct LogoHit {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    logo_url: Option<String>,
}

impl LogoHit {
    fn into_suggestion(self) -> Option<CompanySuggestion> {
        let domain = self.domain.unwrap_or_default().trim().to_string();
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| domain.clone());
        if name.is_empty() && domain.is_empty() {
            return None;
        }
        Some(CompanySuggestion {
            display_name: name,
            resolved_website_url: website_from(&domain),
            domain,
            logo_url: self.logo_url.filter(|l| !l.is_empty()),
        })
    }
}

fn website_from(domain_or_url: &str) -> String {
    match domain_or_url.trim() {
        "" => String::new(),
        value if value.starts_with("http") => value.to_string(),
        value => format!("https://{value}"),
    }
}

fn logo_hits(body: Value) -> Vec<CompanySuggestion> {
    serde_json::from_value::<Vec<LogoHit>>(body)
        .unwrap_or_default()
        .into_iter()
        .filter_map(LogoHit::into_suggestion)
        .collect()
}

/// Logo/domain search. Direct calls need a secret key; the backend proxy
/// holds its own key and is only tried when `direct_only` is off.
pub struct LogoSearchProvider {
    client: reqwest::Client,
    search_url: String,
    api_key: Option<String>,
    proxy_candidates: Vec<String>,
    direct_only: bool,
}

impl LogoSearchProvider {
    pub fn new(client: reqwest::Client, config: &BackendConfig) -> Self {
        Self {
            client,
            search_url: config.logo_search_url.clone(),
            api_key: config
                .logo_api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            proxy_candidates: config.endpoint_candidates(LOGO_PROXY_PATH),
            direct_only: false,
        }
    }

    pub fn direct_only(mut self) -> Self {
        self.direct_only = true;
        self
    }

    async fn search_direct(&self, key: &str, query: &str) -> Result<Vec<CompanySuggestion>, FetchError> {
        let url = with_query(&self.search_url, "q", query)?;
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {key}"))
            .send()
            .await
            .map_err(crate::fetch::map_reqwest_error)?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED && key.starts_with("pk_") {
            wizard_warn!("Logo search rejected a publishable key; a secret (sk_) key is required");
        }
        Ok(logo_hits(read_json(response).await?))
    }

    async fn search_proxy(&self, query: &str) -> Result<Vec<CompanySuggestion>, FetchError> {
        let mut last_error = FetchError::new(FailureKind::Network, "no proxy candidates");
        for endpoint in &self.proxy_candidates {
            let sent = self
                .client
                .post(parse_url(endpoint)?)
                .json(&json!({ "query": query }))
                .send()
                .await;
            let outcome = match sent {
                Ok(response) => read_json(response).await,
                Err(err) => Err(crate::fetch::map_reqwest_error(err)),
            };
            match outcome {
                Ok(body) => {
                    let hits = logo_hits(body);
                    if !hits.is_empty() {
                        return Ok(hits);
                    }
                }
                Err(err) => {
                    wizard_debug!("Logo proxy {} failed: {}", endpoint, err);
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }
}

#[async_trait]
impl SuggestionProvider for LogoSearchProvider {
    fn source(&self) -> SuggestionSource {
        SuggestionSource::LogoSearch
    }

    async fn search(
        &self,
        query: &str,
        _mode: QueryMode,
    ) -> Result<Vec<CompanySuggestion>, FetchError> {
        match self.api_key.as_deref() {
            Some(key) => match self.search_direct(key, query).await {
                Ok(hits) if !hits.is_empty() => return Ok(hits),
                Ok(_) => wizard_debug!("Logo search had no hits for {:?}", query),
                Err(err) => wizard_debug!("Logo search failed: {}", err),
            },
            None => wizard_debug!("No logo search key configured"),
        }
        if self.direct_only {
            return Ok(Vec::new());
        }
        self.search_proxy(query).await
    }
}

/// Internal company directory. The service has accepted several request
/// shapes over time, so each is tried until one answers.
pub struct DirectoryProvider {
    client: reqwest::Client,
    endpoint: String,
    proxy_candidates: Vec<String>,
}

impl DirectoryProvider {
    pub fn new(client: reqwest::Client, config: &BackendConfig) -> Self {
        Self {
            client,
            endpoint: config.directory_url.clone(),
            proxy_candidates: config.endpoint_candidates(DIRECTORY_PROXY_PATH),
        }
    }

    async fn post_variants(&self, bodies: &[Value]) -> Option<Value> {
        let url = parse_url(&self.endpoint).ok()?;
        for body in bodies {
            let sent = self
                .client
                .post(url.clone())
                .header(ACCEPT, "application/json")
                .json(body)
                .send()
                .await;
            match sent {
                Ok(response) => match read_json(response).await {
                    Ok(data) => return Some(data),
                    Err(err) => wizard_debug!("Directory POST {} failed: {}", body, err),
                },
                Err(err) => wizard_debug!("Directory POST {} failed: {}", body, err),
            }
        }
        None
    }

    async fn get_variants(&self, params: &[&str], value: &str) -> Option<Value> {
        for param in params {
            let Ok(url) = with_query(&self.endpoint, param, value) else {
                return None;
            };
            let sent = self
                .client
                .get(url)
                .header(ACCEPT, "application/json")
                .send()
                .await;
            match sent {
                Ok(response) => match read_json(response).await {
                    Ok(data) => return Some(data),
                    Err(err) => wizard_debug!("Directory GET ?{}= failed: {}", param, err),
                },
                Err(err) => wizard_debug!("Directory GET ?{}= failed: {}", param, err),
            }
        }
        None
    }

    async fn search_proxy(&self, query: &str) -> Result<Vec<CompanySuggestion>, FetchError> {
        let mut last_error = FetchError::new(FailureKind::Network, "no proxy candidates");
        for endpoint in &self.proxy_candidates {
            let sent = self
                .client
                .post(parse_url(endpoint)?)
                .json(&json!({ "query": query }))
                .send()
                .await;
            let outcome = match sent {
                Ok(response) => read_json(response).await,
                Err(err) => Err(crate::fetch::map_reqwest_error(err)),
            };
            match outcome {
                Ok(body) => return Ok(parse_directory_response(&body)),
                Err(err) => last_error = err,
            }
        }
        Err(last_error)
    }
}

#[async_trait]
impl SuggestionProvider for DirectoryProvider {
    fn source(&self) -> SuggestionSource {
        SuggestionSource::Directory
    }

    async fn search(
        &self,
        query: &str,
        mode: QueryMode,
    ) -> Result<Vec<CompanySuggestion>, FetchError> {
        let query = query.trim();
        let (bodies, params, value) = match mode {
            QueryMode::CompanyName => (
                vec![
                    json!({ "query": query }),
                    json!({ "company": query }),
                    json!({ "companyName": query }),
                    json!({ "name": query }),
                    json!({ "q": query }),
                ],
                ["q", "company", "companyName", "name"],
                query.to_string(),
            ),
            QueryMode::Website => {
                let domain = normalize_domain(query);
                (
                    vec![
                        json!({ "website": query }),
                        json!({ "url": query }),
                        json!({ "domain": domain }),
                        json!({ "website": domain }),
                        json!({ "query": domain }),
                        json!({ "company": domain }),
                        json!({ "q": domain }),
                    ],
                    ["website", "url", "domain", "q"],
                    domain,
                )
            }
        };

        let data = match self.post_variants(&bodies).await {
            Some(data) => Some(data),
            None => self.get_variants(&params, &value).await,
        };
        match data {
            Some(data) => Ok(parse_directory_response(&data)),
            None => self.search_proxy(&value).await,
        }
    }
}

/// Companies in any of the response shapes the directory has used.
pub fn parse_directory_response(data: &Value) -> Vec<CompanySuggestion> {
    company_records(data)
        .into_iter()
        .filter_map(directory_suggestion)
        .collect()
}

fn company_records(data: &Value) -> Vec<&Value> {
    if let Some(items) = data.as_array() {
        return items.iter().collect();
    }
    for key in ["companies", "data", "results"] {
        if let Some(items) = data.get(key).and_then(Value::as_array) {
            return items.iter().collect();
        }
    }
    if let Some(company) = data.get("company").filter(|c| c.is_object()) {
        return vec![company];
    }
    if let Some(inner) = data.get("data").filter(|d| d.is_object()) {
        return vec![inner];
    }
    let describes_company = ["name", "companyName", "website", "domain"]
        .iter()
        .any(|key| first_str(data, &[key]).is_some());
    if describes_company {
        return vec![data];
    }
    Vec::new()
}

fn first_str<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| record.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|value| !value.is_empty())
}

fn directory_suggestion(record: &Value) -> Option<CompanySuggestion> {
    let name = first_str(record, &["name", "companyName", "company_name", "title"]).unwrap_or("");
    let website = record
        .pointer("/profiles/website")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .or_else(|| first_str(record, &["website", "domain", "url"]))
        .unwrap_or("");
    let resolved_website_url = website_from(website);
    let domain = normalize_domain(&resolved_website_url);

    let display_name = if name.is_empty() {
        capitalized_label(&domain)
    } else {
        name.to_string()
    };
    if display_name.is_empty() && domain.is_empty() {
        return None;
    }
    Some(CompanySuggestion {
        display_name,
        domain,
        logo_url: first_str(record, &["logo", "logo_url"]).map(str::to_string),
        resolved_website_url,
    })
}

/// `zomato.com` -> `Zomato`.
fn capitalized_label(domain: &str) -> String {
    let label = domain.split('.').next().unwrap_or_default();
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(data: Value) -> Vec<(String, String)> {
        parse_directory_response(&data)
            .into_iter()
            .map(|s| (s.display_name, s.domain))
            .collect()
    }

    #[test]
    fn directory_shapes_are_all_understood() {
        let expected = vec![("Zomato Ltd".to_string(), "zomato.com".to_string())];
        let record = json!({ "companyName": "Zomato Ltd", "website": "www.zomato.com" });

        assert_eq!(names(json!([record.clone()])), expected);
        assert_eq!(names(json!({ "companies": [record.clone()] })), expected);
        assert_eq!(names(json!({ "results": [record.clone()] })), expected);
        assert_eq!(names(json!({ "company": record.clone() })), expected);
        assert_eq!(names(json!({ "data": record.clone() })), expected);
        assert_eq!(names(record), expected);
        assert!(names(json!({ "status": "ok" })).is_empty());
    }

    #[test]
    fn directory_record_prefers_profile_website_and_derives_missing_name() {
        let parsed = parse_directory_response(&json!({
            "data": [{
                "profiles": { "website": "https://www.aartidrugs.co.in/" },
                "website": "ignored.example",
                "logo_url": "https://cdn.example/aarti.png"
            }]
        }));

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].display_name, "Aartidrugs");
        assert_eq!(parsed[0].domain, "aartidrugs.co.in");
        assert_eq!(parsed[0].resolved_website_url, "https://www.aartidrugs.co.in/");
        assert_eq!(
            parsed[0].logo_url.as_deref(),
            Some("https://cdn.example/aarti.png")
        );
    }

    #[test]
    fn logo_hits_fall_back_to_domain_for_name() {
        let hits = logo_hits(json!([
            { "name": "", "domain": "zomato.com", "logo_url": "https://img.logo.dev/zomato.com" },
            { "name": "Nothing" , "domain": null },
            {}
        ]));

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].display_name, "zomato.com");
        assert_eq!(hits[0].resolved_website_url, "https://zomato.com");
        assert_eq!(hits[1].display_name, "Nothing");
        assert_eq!(hits[1].resolved_website_url, "");
    }
}
