//! In-memory settings index
//!
//! Holds the live view of every category touched in the session. This type
//! performs no I/O; loading is driven by `Settings`, which hands freshly
//! fetched rows to `merge_loaded`.

use setbuf_common::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Category → (key → value), plus which categories have been loaded
#[derive(Debug, Default, Clone)]
pub struct SettingsIndex {
    items: HashMap<String, BTreeMap<String, Value>>,
    loaded: HashSet<String>,
}

impl SettingsIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self, category: &str) -> bool {
        self.loaded.contains(category)
    }

    /// Overwrite `category/key`
    pub fn set(&mut self, category: &str, key: &str, value: Value) {
        self.items
            .entry(category.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    pub fn get(&self, category: &str, key: &str) -> Option<&Value> {
        self.items.get(category).and_then(|keys| keys.get(key))
    }

    pub fn contains(&self, category: &str, key: &str) -> bool {
        self.get(category, key).is_some()
    }

    /// Whole category, `None` when absent
    pub fn category(&self, category: &str) -> Option<&BTreeMap<String, Value>> {
        self.items.get(category)
    }

    /// Remove one key. A category left without keys becomes absent.
    pub fn remove(&mut self, category: &str, key: &str) -> Option<Value> {
        let keys = self.items.get_mut(category)?;
        let removed = keys.remove(key);
        if keys.is_empty() {
            self.items.remove(category);
        }
        removed
    }

    /// Drop a whole category and treat it as loaded: its persisted rows are
    /// about to be deleted, so there is nothing left to fetch.
    pub fn remove_category(&mut self, category: &str) -> Option<BTreeMap<String, Value>> {
        self.loaded.insert(category.to_string());
        self.items.remove(category)
    }

    /// Install rows fetched for `category` and mark it loaded.
    ///
    /// Keys in `masked` (deleted locally before the load) are dropped from
    /// the fetched rows, then values already held locally are layered on
    /// top. An empty result leaves the category absent.
    pub fn merge_loaded(
        &mut self,
        category: &str,
        mut fetched: BTreeMap<String, Value>,
        masked: Option<&BTreeSet<String>>,
    ) {
        if let Some(masked) = masked {
            fetched.retain(|key, _| !masked.contains(key));
        }
        if let Some(local) = self.items.remove(category) {
            fetched.extend(local);
        }
        if !fetched.is_empty() {
            self.items.insert(category.to_string(), fetched);
        }
        self.loaded.insert(category.to_string());
    }

    /// Every category currently held
    pub fn items(&self) -> &HashMap<String, BTreeMap<String, Value>> {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(pairs: &[(&str, i64)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), Value::Int(*v)))
            .collect()
    }

    #[test]
    fn test_local_values_win_on_merge() {
        let mut index = SettingsIndex::new();
        index.set("ui", "k1", Value::from("B"));

        let mut fetched = BTreeMap::new();
        fetched.insert("k1".to_string(), Value::from("A"));
        fetched.insert("k2".to_string(), Value::from("C"));
        index.merge_loaded("ui", fetched, None);

        assert!(index.is_loaded("ui"));
        assert_eq!(index.get("ui", "k1"), Some(&Value::from("B")));
        assert_eq!(index.get("ui", "k2"), Some(&Value::from("C")));
    }

    #[test]
    fn test_masked_keys_dropped_on_merge() {
        let mut index = SettingsIndex::new();
        let masked: BTreeSet<String> = std::iter::once("a".to_string()).collect();
        index.merge_loaded("ui", rows(&[("a", 1), ("b", 2)]), Some(&masked));

        assert!(!index.contains("ui", "a"));
        assert!(index.contains("ui", "b"));
    }

    #[test]
    fn test_empty_load_leaves_category_absent() {
        let mut index = SettingsIndex::new();
        index.merge_loaded("ui", BTreeMap::new(), None);
        assert!(index.is_loaded("ui"));
        assert!(index.category("ui").is_none());
    }

    #[test]
    fn test_remove_last_key_makes_category_absent() {
        let mut index = SettingsIndex::new();
        index.set("ui", "a", Value::Int(1));
        assert_eq!(index.remove("ui", "a"), Some(Value::Int(1)));
        assert!(index.category("ui").is_none());
        assert_eq!(index.remove("ui", "a"), None);
    }

    #[test]
    fn test_remove_category_marks_loaded() {
        let mut index = SettingsIndex::new();
        index.set("ui", "a", Value::Int(1));
        assert!(!index.is_loaded("ui"));

        assert_eq!(index.remove_category("ui"), Some(rows(&[("a", 1)])));
        assert!(index.is_loaded("ui"));
        assert!(index.items().is_empty());
    }
}
