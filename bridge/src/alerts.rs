//! Currently active network alerts and the status-bar text built from them.

use std::collections::BTreeMap;

use chainview_types::AlertStatus;

/// Separator between alert texts in [`AlertBook::warnings`].
pub const WARNING_SEPARATOR: &str = "; ";

/// Active alerts keyed by hash. Ordered by hash so the aggregated text is
/// stable regardless of arrival order.
#[derive(Debug, Default)]
pub struct AlertBook {
    active: BTreeMap<String, String>,
}

impl AlertBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one alert transition. `message` is the node's current text for
    /// the alert; `None` means the node no longer knows it.
    ///
    /// Returns `true` if the set of active alerts changed.
    pub fn apply(&mut self, hash: &str, status: AlertStatus, message: Option<String>) -> bool {
        match (status.is_active(), message) {
            (true, Some(text)) => self.active.insert(hash.to_string(), text.clone()) != Some(text),
            _ => self.active.remove(hash).is_some(),
        }
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Human-readable aggregate of every active alert; empty if none.
    pub fn warnings(&self) -> String {
        self.active
            .values()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(WARNING_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_book_has_no_warnings() {
        assert_eq!(AlertBook::new().warnings(), "");
    }

    #[test]
    fn warnings_are_ordered_by_hash() {
        let mut book = AlertBook::new();
        book.apply("bb", AlertStatus::New, Some("second".into()));
        book.apply("aa", AlertStatus::New, Some("first".into()));
        assert_eq!(book.warnings(), "first; second");
    }

    #[test]
    fn update_replaces_text() {
        let mut book = AlertBook::new();
        assert!(book.apply("aa", AlertStatus::New, Some("old".into())));
        assert!(!book.apply("aa", AlertStatus::Updated, Some("old".into())));
        assert!(book.apply("aa", AlertStatus::Updated, Some("new".into())));
        assert_eq!(book.warnings(), "new");
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn expiry_and_unknown_text_remove_the_alert() {
        let mut book = AlertBook::new();
        book.apply("aa", AlertStatus::New, Some("a".into()));
        book.apply("bb", AlertStatus::New, Some("b".into()));

        assert!(book.apply("aa", AlertStatus::Expired, Some("a".into())));
        assert!(book.apply("bb", AlertStatus::Updated, None));
        assert!(book.is_empty());
        assert!(!book.apply("cc", AlertStatus::Expired, None));
    }
}
