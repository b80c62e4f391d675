//! Category ↔ namespace prefix table.
//!
//! Built once from the configured environment and immutable afterwards.
//! Topics look like `<environment>/<category path>/v1/<suffix>`; routing splits
//! at the first version marker and looks the prefix up in an exact-match map,
//! so no routing decision is re-derived from string patterns per message.

use ahash::AHashMap;

use super::enums::Category;

/// Marker separating the namespace prefix from the topic suffix.
pub const VERSION_MARKER: &str = "v1/";

/// Immutable mapping between categories and their wire prefixes.
#[derive(Debug, Clone)]
pub struct NamespaceTable {
    /// Indexed by `Category as usize`.
    prefixes: Vec<String>,
    by_prefix: AHashMap<String, Category>,
}

impl NamespaceTable {
    /// Build the table for an environment segment (e.g. `"prod"`).
    pub fn new(environment: &str) -> Self {
        let environment = environment.trim_matches('/');
        let prefixes: Vec<String> = Category::ALL
            .iter()
            .map(|c| format!("{environment}/{}/{VERSION_MARKER}", c.path()))
            .collect();
        let by_prefix = Category::ALL.iter().map(|&c| (prefixes[c as usize].clone(), c)).collect();
        Self { prefixes, by_prefix }
    }

    /// Namespace prefix for a category, including the trailing version marker.
    pub fn prefix(&self, category: Category) -> &str {
        &self.prefixes[category as usize]
    }

    /// Full wire topic for a suffix in a category.
    pub fn topic(&self, category: Category, suffix: &str) -> String {
        let mut topic = String::with_capacity(self.prefix(category).len() + suffix.len());
        topic.push_str(self.prefix(category));
        topic.push_str(suffix);
        topic
    }

    /// Resolve an inbound topic to its category and suffix.
    ///
    /// Returns `None` when the topic has no version marker or its prefix is
    /// not one of ours.
    pub fn resolve<'a>(&self, topic: &'a str) -> Option<(Category, &'a str)> {
        let (prefix, suffix) = split_topic(topic)?;
        self.by_prefix.get(prefix).map(|&c| (c, suffix))
    }
}

/// Split a topic at the first version marker into `(prefix, suffix)`.
///
/// The prefix keeps the marker, so it compares equal to a table prefix.
pub fn split_topic(topic: &str) -> Option<(&str, &str)> {
    let idx = topic.find(VERSION_MARKER)? + VERSION_MARKER.len();
    Some(topic.split_at(idx))
}

/// Suffix of a topic with its namespace prefix stripped.
///
/// A topic without a marker is returned whole.
pub fn topic_suffix(topic: &str) -> &str {
    split_topic(topic).map_or(topic, |(_, suffix)| suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prod_prefixes() {
        let table = NamespaceTable::new("prod");
        assert_eq!(table.prefix(Category::Feed), "prod/marketfeed/mw/v1/");
        assert_eq!(table.prefix(Category::OrderUpdates), "prod/updates/order/v1/");
        assert_eq!(table.prefix(Category::Low52Week), "prod/marketfeed/low52week/v1/");
    }

    #[test]
    fn topic_round_trips_through_resolve() {
        let table = NamespaceTable::new("prod");
        for category in Category::ALL {
            let topic = table.topic(category, "nseeq/2885");
            assert_eq!(table.resolve(&topic), Some((category, "nseeq/2885")));
        }
    }

    #[test]
    fn resolve_splits_at_first_marker() {
        let table = NamespaceTable::new("prod");
        assert_eq!(
            table.resolve("prod/marketfeed/index/v1/nsefo/v1/7"),
            Some((Category::Index, "nsefo/v1/7"))
        );
    }

    #[test]
    fn resolve_rejects_foreign_topics() {
        let table = NamespaceTable::new("prod");
        assert_eq!(table.resolve("uat/marketfeed/mw/v1/nseeq/1"), None);
        assert_eq!(table.resolve("prod/marketfeed/mw/nseeq/1"), None);
        assert_eq!(table.resolve(""), None);
    }

    #[test]
    fn environment_slashes_are_trimmed() {
        let table = NamespaceTable::new("/uat/");
        assert_eq!(table.prefix(Category::Lpp), "uat/marketfeed/lpp/v1/");
    }

    #[test]
    fn suffix_stripping() {
        assert_eq!(topic_suffix("prod/marketfeed/oi/v1/bsefo/1152436"), "bsefo/1152436");
        assert_eq!(topic_suffix("no-marker"), "no-marker");
    }
}
