use std::collections::HashSet;

/// One company candidate offered in the name dropdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanySuggestion {
    pub display_name: String,
    pub domain: String,
    pub logo_url: Option<String>,
    pub resolved_website_url: String,
}

impl CompanySuggestion {
    /// Key used for de-duplication across providers.
    pub fn dedupe_key(&self) -> String {
        let name = self.display_name.trim();
        if name.is_empty() {
            normalize_domain(&self.domain)
        } else {
            name.to_lowercase()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionSource {
    /// Logo/domain search (shown as soon as it arrives).
    LogoSearch,
    /// Internal company directory (merged in when it beats its timeout).
    Directory,
}

/// Suggestions displayed for the most recent lookup generation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SuggestionList {
    generation: u64,
    items: Vec<CompanySuggestion>,
    visible: bool,
}

impl SuggestionList {
    pub fn items(&self) -> &[CompanySuggestion] {
        &self.items
    }

    pub fn is_visible(&self) -> bool {
        self.visible && !self.items.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
        self.visible = false;
    }

    pub(crate) fn hide(&mut self) {
        self.visible = false;
    }

    /// Replace the list wholesale (find-company with several matches).
    pub(crate) fn replace(&mut self, generation: u64, items: Vec<CompanySuggestion>) {
        self.generation = generation;
        self.items = dedupe(items);
        self.visible = !self.items.is_empty();
    }

    /// Apply one provider's answer for `generation`.
    ///
    /// A newer generation replaces whatever is shown. Within the same
    /// generation the answers are merged, logo-search results first.
    pub(crate) fn apply(
        &mut self,
        generation: u64,
        source: SuggestionSource,
        incoming: Vec<CompanySuggestion>,
    ) {
        if incoming.is_empty() {
            return;
        }
        if generation != self.generation {
            self.replace(generation, incoming);
            return;
        }
        let existing = std::mem::take(&mut self.items);
        let merged = match source {
            SuggestionSource::LogoSearch => incoming.into_iter().chain(existing).collect(),
            SuggestionSource::Directory => existing.into_iter().chain(incoming).collect(),
        };
        self.items = dedupe(merged);
        self.visible = true;
    }
}

fn dedupe(items: Vec<CompanySuggestion>) -> Vec<CompanySuggestion> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.dedupe_key()))
        .collect()
}

/// Reduce a website URL to its bare lowercase domain (`https://www.x.com/a` -> `x.com`).
pub fn normalize_domain(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let host = url::Url::parse(&with_scheme)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_else(|| {
            let without_scheme = trimmed.split("://").last().unwrap_or(trimmed);
            without_scheme
                .split(['/', '?', '#'])
                .next()
                .unwrap_or_default()
                .to_string()
        });
    let host = host.to_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestion(name: &str, domain: &str) -> CompanySuggestion {
        CompanySuggestion {
            display_name: name.to_string(),
            domain: domain.to_string(),
            logo_url: None,
            resolved_website_url: format!("https://{domain}"),
        }
    }

    #[test]
    fn normalize_domain_strips_scheme_www_and_path() {
        assert_eq!(normalize_domain("https://www.AartiDrugs.co.in/about"), "aartidrugs.co.in");
        assert_eq!(normalize_domain("zomato.com"), "zomato.com");
        assert_eq!(normalize_domain("  http://www.example.com?x=1 "), "example.com");
        assert_eq!(normalize_domain(""), "");
    }

    #[test]
    fn same_generation_results_are_merged_without_duplicates() {
        let mut list = SuggestionList::default();
        list.apply(1, SuggestionSource::LogoSearch, vec![suggestion("Zomato", "zomato.com")]);
        list.apply(
            1,
            SuggestionSource::Directory,
            vec![suggestion("ZOMATO", "zomato.com"), suggestion("Zepto", "zepto.com")],
        );
        let names: Vec<_> = list.items().iter().map(|s| s.display_name.as_str()).collect();
        assert_eq!(names, vec!["Zomato", "Zepto"]);
        assert!(list.is_visible());
    }

    #[test]
    fn newer_generation_replaces_and_empty_answers_are_ignored() {
        let mut list = SuggestionList::default();
        list.apply(1, SuggestionSource::LogoSearch, vec![suggestion("Old", "old.com")]);
        list.apply(2, SuggestionSource::Directory, Vec::new());
        assert_eq!(list.items()[0].display_name, "Old");
        list.apply(2, SuggestionSource::Directory, vec![suggestion("New", "new.com")]);
        assert_eq!(list.items().len(), 1);
        assert_eq!(list.items()[0].display_name, "New");
        assert_eq!(list.generation(), 2);
    }
}
