/// Longest heading accepted for an operation.
pub const MAX_HEADING_CHARS: usize = 80;
/// Longest description accepted for an operation.
pub const MAX_DESCRIPTION_CHARS: usize = 300;
/// How many operations the user may add on top of the suggestions.
pub const MAX_USER_ADDED_OPERATIONS: usize = 2;

/// One `{key, value}` item as returned by the operations service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestedOperation {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOrigin {
    Suggested,
    UserAdded,
}

/// A selectable operations highlight.
///
/// `key` and `display_value` keep what the service suggested; the user's
/// edits live in separate fields so they can be reverted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOption {
    pub key: String,
    pub display_value: String,
    pub selected: bool,
    pub user_edited_key: Option<String>,
    pub user_edited_value: Option<String>,
    pub origin: OperationOrigin,
}

impl OperationOption {
    pub fn suggested(item: SuggestedOperation) -> Self {
        Self {
            key: item.key,
            display_value: item.value,
            selected: false,
            user_edited_key: None,
            user_edited_value: None,
            origin: OperationOrigin::Suggested,
        }
    }

    pub fn user_added(heading: String, description: String) -> Self {
        Self {
            key: heading,
            display_value: description,
            selected: true,
            user_edited_key: None,
            user_edited_value: None,
            origin: OperationOrigin::UserAdded,
        }
    }

    pub fn effective_key(&self) -> &str {
        self.user_edited_key.as_deref().unwrap_or(&self.key)
    }

    pub fn effective_value(&self) -> &str {
        self.user_edited_value
            .as_deref()
            .unwrap_or(&self.display_value)
    }

    pub fn is_edited(&self) -> bool {
        self.user_edited_key.is_some() || self.user_edited_value.is_some()
    }

    pub(crate) fn draft_key(&mut self, text: &str) {
        self.user_edited_key = Some(truncate_chars(text, MAX_HEADING_CHARS));
    }

    /// Trim the drafted heading; an empty draft falls back to the suggestion.
    pub(crate) fn commit_key(&mut self) {
        let committed = self
            .user_edited_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != self.key)
            .map(str::to_string);
        self.user_edited_key = committed;
    }

    pub(crate) fn revert_key(&mut self) {
        self.user_edited_key = None;
    }

    pub(crate) fn edit_value(&mut self, text: &str) {
        let value = truncate_chars(text, MAX_DESCRIPTION_CHARS);
        self.user_edited_value = if value == self.display_value {
            None
        } else {
            Some(value)
        };
    }
}

/// Everything the operations step shows and edits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OperationsPanel {
    pub options: Vec<OperationOption>,
    pub loading: bool,
    /// Non-fatal notice when generation failed.
    pub notice: Option<String>,
    pub selection_error: Option<String>,
    pub create_error: Option<String>,
    /// Free-text instructions forwarded as `operationsQuery`.
    pub query: String,
}

impl OperationsPanel {
    pub fn selected(&self) -> impl Iterator<Item = &OperationOption> {
        self.options.iter().filter(|o| o.selected)
    }

    pub fn user_added_count(&self) -> usize {
        self.options
            .iter()
            .filter(|o| o.origin == OperationOrigin::UserAdded)
            .count()
    }

    pub(crate) fn clear_errors(&mut self) {
        self.selection_error = None;
        self.create_error = None;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self {
            query: std::mem::take(&mut self.query),
            ..Self::default()
        };
    }
}

pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option() -> OperationOption {
        OperationOption::suggested(SuggestedOperation {
            key: "Manufacturing".to_string(),
            value: "Four API plants".to_string(),
        })
    }

    #[test]
    fn empty_heading_commit_falls_back_to_suggestion() {
        let mut opt = option();
        opt.draft_key("   ");
        opt.commit_key();
        assert_eq!(opt.effective_key(), "Manufacturing");
        assert!(opt.user_edited_key.is_none());
    }

    #[test]
    fn edits_never_touch_the_suggestion() {
        let mut opt = option();
        opt.draft_key("  Plants  ");
        opt.commit_key();
        opt.edit_value("Six plants");
        assert_eq!(opt.effective_key(), "Plants");
        assert_eq!(opt.effective_value(), "Six plants");
        assert_eq!(opt.key, "Manufacturing");
        assert_eq!(opt.display_value, "Four API plants");

        opt.revert_key();
        assert_eq!(opt.effective_key(), "Manufacturing");
    }

    #[test]
    fn drafts_are_capped_by_character_count() {
        let mut opt = option();
        opt.draft_key(&"é".repeat(MAX_HEADING_CHARS + 5));
        assert_eq!(opt.effective_key().chars().count(), MAX_HEADING_CHARS);
        opt.edit_value(&"x".repeat(MAX_DESCRIPTION_CHARS + 1));
        assert_eq!(opt.effective_value().len(), MAX_DESCRIPTION_CHARS);
    }
}
