//! Persistent settings store backed by redb.
//!
//! Rows live in a single table keyed by `(category, key)`, so a category is
//! one contiguous key range. All writes are synchronous (write txn +
//! commit); each trait call is its own transaction.

use crate::SettingsStore;
use crate::error::{StoreError, StoreResult};
use redb::{Database, ReadableTable, TableDefinition};
use setbuf_common::{DEFAULT_TABLE_NAME, SettingsConfig};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

type RowsTable<'a> = TableDefinition<'a, (&'static str, &'static str), &'static [u8]>;

/// Persistent settings store backed by redb.
pub struct RedbStore {
    db: Database,
    table_name: String,
}

impl RedbStore {
    /// Open (or create) the redb database at the given path using the
    /// default table name.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with_table(path, DEFAULT_TABLE_NAME)
    }

    /// Open (or create) the database, storing rows in `table_name`.
    ///
    /// The table name is validated before the file is touched.
    pub fn open_with_table(path: impl AsRef<Path>, table_name: &str) -> StoreResult<Self> {
        SettingsConfig::default().with_table_name(table_name)?;

        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        let store = Self {
            db,
            table_name: table_name.to_string(),
        };

        // Create the table eagerly so later read txns don't fail
        let write_txn = store.db.begin_write()?;
        {
            let _t = write_txn.open_table(store.table())?;
        }
        write_txn.commit()?;

        Ok(store)
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Distinct categories that currently have at least one row
    pub fn list_categories(&self) -> StoreResult<BTreeSet<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(self.table())?;
        let mut categories = BTreeSet::new();
        for entry in table.iter()? {
            let (key, _) = entry?;
            categories.insert(key.value().0.to_string());
        }
        Ok(categories)
    }

    fn table(&self) -> RowsTable<'_> {
        TableDefinition::new(&self.table_name)
    }
}

impl SettingsStore for RedbStore {
    fn load_category(&self, category: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(self.table())?;
        let mut rows = Vec::new();
        for entry in table.range((category, "")..)? {
            let (key, value) = entry?;
            let (row_category, row_key) = key.value();
            if row_category != category {
                break;
            }
            rows.push((row_key.to_string(), value.value().to_vec()));
        }
        Ok(rows)
    }

    fn row_exists(&self, category: &str, key: &str) -> StoreResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(self.table())?;
        Ok(table.get((category, key))?.is_some())
    }

    fn insert_row(&self, category: &str, key: &str, value: &[u8]) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(self.table())?;
            if table.get((category, key))?.is_some() {
                return Err(StoreError::RowExists {
                    category: category.to_string(),
                    key: key.to_string(),
                });
            }
            table.insert((category, key), value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn update_row(&self, category: &str, key: &str, value: &[u8]) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(self.table())?;
            if table.get((category, key))?.is_none() {
                return Err(StoreError::RowNotFound {
                    category: category.to_string(),
                    key: key.to_string(),
                });
            }
            table.insert((category, key), value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    // Existence check and write share one transaction
    fn upsert_row(&self, category: &str, key: &str, value: &[u8]) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(self.table())?;
            table.insert((category, key), value)?.is_some()
        };
        write_txn.commit()?;
        debug!(
            "{} row {}/{}",
            if existed { "Updated" } else { "Inserted" },
            category,
            key
        );
        Ok(())
    }

    fn delete_rows(&self, category: &str, keys: &[String]) -> StoreResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(self.table())?;
            for key in keys {
                table.remove((category, key.as_str()))?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn delete_category(&self, category: &str) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(self.table())?;

            // Collect keys first, then delete
            let mut to_delete = Vec::new();
            for entry in table.range((category, "")..)? {
                let (key, _) = entry?;
                let (row_category, row_key) = key.value();
                if row_category != category {
                    break;
                }
                to_delete.push(row_key.to_string());
            }

            for key in &to_delete {
                table.remove((category, key.as_str()))?;
            }
            debug!("Deleted {} rows of category '{}'", to_delete.len(), category);
        }
        write_txn.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_store(dir: &Path) -> RedbStore {
        RedbStore::open(dir.join("settings.redb")).unwrap()
    }

    #[test]
    fn test_upsert_and_load_category() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());

        store.upsert_row("system", "theme", b"dark").unwrap();
        store.upsert_row("system", "lang", b"en").unwrap();
        store.upsert_row("ui", "theme", b"light").unwrap();
        store.upsert_row("system", "theme", b"darker").unwrap();

        let rows = store.load_category("system").unwrap();
        assert_eq!(
            rows,
            vec![
                ("lang".to_string(), b"en".to_vec()),
                ("theme".to_string(), b"darker".to_vec()),
            ]
        );
        assert_eq!(store.load_category("ui").unwrap().len(), 1);
        assert!(store.load_category("missing").unwrap().is_empty());
    }

    #[test]
    fn test_category_prefix_does_not_leak() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());

        store.upsert_row("ui", "a", b"1").unwrap();
        store.upsert_row("ui_extra", "a", b"2").unwrap();
        store.upsert_row("u", "z", b"3").unwrap();

        assert_eq!(store.load_category("ui").unwrap(), vec![("a".to_string(), b"1".to_vec())]);

        store.delete_category("ui").unwrap();
        assert!(store.load_category("ui").unwrap().is_empty());
        assert_eq!(store.load_category("ui_extra").unwrap().len(), 1);
        assert_eq!(store.load_category("u").unwrap().len(), 1);
    }

    #[test]
    fn test_insert_and_update_guards() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());

        assert!(matches!(
            store.update_row("system", "k", b"v"),
            Err(StoreError::RowNotFound { .. })
        ));
        store.insert_row("system", "k", b"v").unwrap();
        assert!(store.row_exists("system", "k").unwrap());
        assert!(matches!(
            store.insert_row("system", "k", b"v2"),
            Err(StoreError::RowExists { .. })
        ));
        store.update_row("system", "k", b"v2").unwrap();
        assert_eq!(store.load_category("system").unwrap()[0].1, b"v2".to_vec());
    }

    #[test]
    fn test_delete_rows_batch() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());

        for key in ["a", "b", "c"] {
            store.upsert_row("ui", key, key.as_bytes()).unwrap();
        }
        store
            .delete_rows("ui", &["a".to_string(), "c".to_string(), "zz".to_string()])
            .unwrap();

        let rows = store.load_category("ui").unwrap();
        assert_eq!(rows, vec![("b".to_string(), b"b".to_vec())]);
    }

    #[test]
    fn test_reopen_persists_rows() {
        let dir = tempdir().unwrap();
        {
            let store = open_store(dir.path());
            store.upsert_row("system", "theme", b"dark").unwrap();
        }
        let store = open_store(dir.path());
        assert!(store.row_exists("system", "theme").unwrap());
        assert_eq!(
            store.list_categories().unwrap().into_iter().collect::<Vec<_>>(),
            vec!["system".to_string()]
        );
    }

    #[test]
    fn test_custom_table_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.redb");

        let store = RedbStore::open_with_table(&path, "tenant_settings").unwrap();
        assert_eq!(store.table_name(), "tenant_settings");
        store.upsert_row("system", "k", b"v").unwrap();
        drop(store);

        // Same file, default table: rows are separate
        let store = RedbStore::open(&path).unwrap();
        assert!(store.load_category("system").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_table_name_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.redb");
        let result = RedbStore::open_with_table(&path, "bad name");
        assert!(matches!(result, Err(StoreError::Config(_))));
        assert!(!path.exists());
    }
}
