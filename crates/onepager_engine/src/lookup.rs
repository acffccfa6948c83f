use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use onepager_core::{normalize_domain, CompanySuggestion, SuggestionSource};
use onepager_logging::{wizard_debug, wizard_info};
use tokio_util::sync::CancellationToken;

use crate::providers::{DirectoryProvider, LogoSearchProvider, QueryMode, SuggestionProvider};
use crate::BackendConfig;

/// Receives each provider's answer as soon as it arrives.
pub type SuggestionSink<'a> = dyn Fn(SuggestionSource, Vec<CompanySuggestion>) + Send + Sync + 'a;

/// Company suggestions from both providers, raced against cancellation.
pub struct CompanyLookup {
    logo: Arc<dyn SuggestionProvider>,
    /// Logo search without the proxy fallback, for website resolution.
    logo_direct: Arc<dyn SuggestionProvider>,
    directory: Arc<dyn SuggestionProvider>,
    debounce: Duration,
    directory_timeout: Duration,
    find_timeout: Duration,
}

impl CompanyLookup {
    pub fn new(
        logo: Arc<dyn SuggestionProvider>,
        logo_direct: Arc<dyn SuggestionProvider>,
        directory: Arc<dyn SuggestionProvider>,
        config: &BackendConfig,
    ) -> Self {
        Self {
            logo,
            logo_direct,
            directory,
            debounce: config.suggestion_debounce,
            directory_timeout: config.directory_timeout,
            find_timeout: config.find_company_timeout,
        }
    }

    pub fn from_config(client: reqwest::Client, config: &BackendConfig) -> Self {
        Self::new(
            Arc::new(LogoSearchProvider::new(client.clone(), config)),
            Arc::new(LogoSearchProvider::new(client.clone(), config).direct_only()),
            Arc::new(DirectoryProvider::new(client, config)),
            config,
        )
    }

    /// Debounced keystroke lookup. Both providers run concurrently and each
    /// non-empty answer is emitted on its own; the directory is abandoned
    /// after its timeout without affecting the logo answer. Nothing is
    /// emitted once `cancel` fires.
    pub async fn lookup(&self, query: &str, cancel: &CancellationToken, emit: &SuggestionSink<'_>) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(self.debounce) => {}
        }

        let publish = |source: SuggestionSource, found: Vec<CompanySuggestion>| {
            if found.is_empty() || cancel.is_cancelled() {
                return;
            }
            wizard_debug!("{:?} offered {} suggestion(s) for {:?}", source, found.len(), query);
            emit(source, found);
        };

        let logo = async {
            let found = search_or_empty(self.logo.as_ref(), query, QueryMode::CompanyName).await;
            publish(SuggestionSource::LogoSearch, found);
        };
        let directory = async {
            let found = within(
                self.directory_timeout,
                search_or_empty(self.directory.as_ref(), query, QueryMode::CompanyName),
            )
            .await;
            publish(SuggestionSource::Directory, found);
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {}
            _ = async { tokio::join!(logo, directory) } => {}
        }
    }

    /// Resolve a company from its website. `None` means the lookup was cancelled.
    ///
    /// Directory matches win. Otherwise logo hits on the same domain are
    /// used, falling back to the first logo hit.
    pub async fn find_company(
        &self,
        website_url: &str,
        cancel: &CancellationToken,
    ) -> Option<Vec<CompanySuggestion>> {
        let domain = normalize_domain(website_url);
        if domain.is_empty() {
            return Some(Vec::new());
        }

        let searches = async {
            tokio::join!(
                within(
                    self.find_timeout,
                    search_or_empty(self.directory.as_ref(), website_url, QueryMode::Website),
                ),
                within(
                    self.find_timeout,
                    search_or_empty(self.logo_direct.as_ref(), &domain, QueryMode::Website),
                ),
            )
        };
        let (directory, logo) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            found = searches => found,
        };
        if cancel.is_cancelled() {
            return None;
        }

        if !directory.is_empty() {
            wizard_info!("Directory resolved {} to {} match(es)", domain, directory.len());
            return Some(directory);
        }
        let same_domain: Vec<CompanySuggestion> = logo
            .iter()
            .filter(|hit| hit.domain == domain)
            .cloned()
            .collect();
        if !same_domain.is_empty() {
            return Some(same_domain);
        }
        Some(logo.into_iter().take(1).collect())
    }
}

async fn search_or_empty(
    provider: &dyn SuggestionProvider,
    query: &str,
    mode: QueryMode,
) -> Vec<CompanySuggestion> {
    match provider.search(query, mode).await {
        Ok(found) => found,
        Err(err) => {
            wizard_debug!("{:?} lookup failed: {}", provider.source(), err);
            Vec::new()
        }
    }
}

async fn within<F>(limit: Duration, search: F) -> Vec<CompanySuggestion>
where
    F: Future<Output = Vec<CompanySuggestion>>,
{
    tokio::time::timeout(limit, search).await.unwrap_or_else(|_| {
        wizard_debug!("Lookup gave up after {:?}", limit);
        Vec::new()
    })
}
