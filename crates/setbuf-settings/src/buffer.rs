//! Write buffer
//!
//! Accumulates the mutations of one unit of work until flush. Conflicts are
//! resolved when an operation is staged, so the buffer never holds both a
//! save and a delete for the same key:
//!
//! - a delete drops any staged save of the key, and vice versa (last write
//!   wins per key);
//! - a category delete drops every per-key operation staged before it for
//!   that category. Operations staged afterwards are kept and applied after
//!   the category's rows are removed.

use setbuf_common::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Mutations drained from a `WriteBuffer` at flush time
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PendingWrites {
    /// Categories whose rows must all be deleted
    pub category_deletes: BTreeSet<String>,
    /// Keys to delete, per category
    pub deletes: BTreeMap<String, BTreeSet<String>>,
    /// Values to persist, per category
    pub saves: BTreeMap<String, BTreeMap<String, Value>>,
}

impl PendingWrites {
    pub fn is_empty(&self) -> bool {
        self.category_deletes.is_empty() && self.deletes.is_empty() && self.saves.is_empty()
    }
}

/// Pending saves and deletes since the last flush
#[derive(Debug, Default)]
pub struct WriteBuffer {
    pending: PendingWrites,
}

impl WriteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `category/key = value` for persistence
    pub fn stage_save(&mut self, category: &str, key: &str, value: Value) {
        remove_staged_delete(&mut self.pending.deletes, category, key);
        self.pending
            .saves
            .entry(category.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Stage deletion of `category/key`
    pub fn stage_delete(&mut self, category: &str, key: &str) {
        remove_staged_save(&mut self.pending.saves, category, key);
        self.pending
            .deletes
            .entry(category.to_string())
            .or_default()
            .insert(key.to_string());
    }

    /// Stage deletion of a whole category
    pub fn stage_category_delete(&mut self, category: &str) {
        self.pending.saves.remove(category);
        self.pending.deletes.remove(category);
        self.pending.category_deletes.insert(category.to_string());
    }

    /// Keys staged for deletion in `category`
    pub fn pending_deletes(&self, category: &str) -> Option<&BTreeSet<String>> {
        self.pending.deletes.get(category)
    }

    /// Value staged for `category/key`, if any
    pub fn pending_save(&self, category: &str, key: &str) -> Option<&Value> {
        self.pending.saves.get(category).and_then(|keys| keys.get(key))
    }

    /// Whether `category` is staged for deletion
    pub fn is_category_deleted(&self, category: &str) -> bool {
        self.pending.category_deletes.contains(category)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drain everything staged so far, leaving the buffer empty
    pub fn take(&mut self) -> PendingWrites {
        std::mem::take(&mut self.pending)
    }
}

fn remove_staged_save(
    saves: &mut BTreeMap<String, BTreeMap<String, Value>>,
    category: &str,
    key: &str,
) {
    if let Some(keys) = saves.get_mut(category) {
        keys.remove(key);
        if keys.is_empty() {
            saves.remove(category);
        }
    }
}

fn remove_staged_delete(
    deletes: &mut BTreeMap<String, BTreeSet<String>>,
    category: &str,
    key: &str,
) {
    if let Some(keys) = deletes.get_mut(category) {
        keys.remove(key);
        if keys.is_empty() {
            deletes.remove(category);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::collections::HashMap;

    #[test]
    fn test_delete_after_save_drops_save() {
        let mut buffer = WriteBuffer::new();
        buffer.stage_save("ui", "a", Value::Int(1));
        buffer.stage_delete("ui", "a");

        let pending = buffer.take();
        assert!(pending.saves.is_empty());
        assert!(pending.deletes["ui"].contains("a"));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_save_after_delete_drops_delete() {
        let mut buffer = WriteBuffer::new();
        buffer.stage_delete("ui", "a");
        buffer.stage_save("ui", "a", Value::Int(2));

        let pending = buffer.take();
        assert!(pending.deletes.is_empty());
        assert_eq!(pending.saves["ui"]["a"], Value::Int(2));
    }

    #[test]
    fn test_category_delete_supersedes_earlier_ops() {
        let mut buffer = WriteBuffer::new();
        buffer.stage_save("ui", "a", Value::Int(1));
        buffer.stage_delete("ui", "b");
        buffer.stage_save("system", "theme", Value::from("dark"));
        buffer.stage_category_delete("ui");

        assert!(buffer.is_category_deleted("ui"));
        assert!(buffer.pending_save("ui", "a").is_none());
        assert!(buffer.pending_deletes("ui").is_none());
        assert!(buffer.pending_save("system", "theme").is_some());
    }

    #[test]
    fn test_ops_after_category_delete_survive() {
        let mut buffer = WriteBuffer::new();
        buffer.stage_save("ui", "old", Value::Int(1));
        buffer.stage_category_delete("ui");
        buffer.stage_save("ui", "new", Value::Int(2));

        let pending = buffer.take();
        assert!(pending.category_deletes.contains("ui"));
        assert_eq!(pending.saves["ui"].len(), 1);
        assert_eq!(pending.saves["ui"]["new"], Value::Int(2));
    }

    #[test]
    fn test_take_resets() {
        let mut buffer = WriteBuffer::new();
        assert!(buffer.take().is_empty());

        buffer.stage_category_delete("ui");
        assert!(!buffer.is_empty());
        assert!(!buffer.take().is_empty());
        assert!(buffer.is_empty());
    }

    /// Random save/delete sequences over a small key space must leave the
    /// buffer agreeing with a model that only remembers the last write.
    #[test]
    fn test_last_write_wins_model() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let mut buffer = WriteBuffer::new();
            let mut last: HashMap<&str, Option<i64>> = HashMap::new();

            for step in 0..30 {
                let key = ["a", "b", "c"][rng.gen_range(0..3)];
                if rng.gen_bool(0.5) {
                    buffer.stage_save("cat", key, Value::Int(step));
                    last.insert(key, Some(step));
                } else {
                    buffer.stage_delete("cat", key);
                    last.insert(key, None);
                }
            }

            for (key, expected) in last {
                match expected {
                    Some(v) => {
                        assert_eq!(buffer.pending_save("cat", key), Some(&Value::Int(v)));
                        assert!(
                            buffer
                                .pending_deletes("cat")
                                .is_none_or(|keys| !keys.contains(key))
                        );
                    }
                    None => {
                        assert!(buffer.pending_save("cat", key).is_none());
                        assert!(buffer.pending_deletes("cat").unwrap().contains(key));
                    }
                }
            }
        }
    }
}
