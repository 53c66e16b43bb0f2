use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Tabular payload exchanged with the backing store: an ordered header and
/// rows of raw cell values, the way a spreadsheet hands them back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub header: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// Cell at (row, col); ragged rows read as null past their end.
    pub fn cell(&self, row: usize, col: usize) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Value::Null)
    }

    /// SHA-256 over the canonical JSON form. Informational only.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let digest = Sha256::digest(&canonical);
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Always hit the database.
    Fresh,
    /// May be served from the store's short-lived read cache.
    AllowCached,
}

pub trait Store {
    fn read_table(&mut self, name: &str, mode: ReadMode) -> anyhow::Result<Table>;

    /// Full replace. Either the whole table lands or nothing changes.
    fn write_table(&mut self, name: &str, table: &Table) -> anyhow::Result<()>;
}

#[cfg(test)]
pub mod memory {
    use super::{ReadMode, Store, Table};
    use anyhow::anyhow;
    use std::collections::HashMap;

    /// In-memory store for engine tests. `fail_writes` makes every write
    /// error out before touching the stored copy.
    #[derive(Debug, Default)]
    pub struct MemoryStore {
        pub tables: HashMap<String, Table>,
        pub fail_writes: bool,
        pub reads: usize,
    }

    impl MemoryStore {
        pub fn with_table(name: &str, table: Table) -> Self {
            let mut store = MemoryStore::default();
            store.tables.insert(name.to_string(), table);
            store
        }
    }

    impl Store for MemoryStore {
        fn read_table(&mut self, name: &str, _mode: ReadMode) -> anyhow::Result<Table> {
            self.reads += 1;
            self.tables
                .get(name)
                .cloned()
                .ok_or_else(|| anyhow!("table not found: {}", name))
        }

        fn write_table(&mut self, name: &str, table: &Table) -> anyhow::Result<()> {
            if self.fail_writes {
                return Err(anyhow!("quota exceeded"));
            }
            self.tables.insert(name.to_string(), table.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ragged_rows_read_as_null() {
        let t = Table {
            header: vec!["a".into(), "b".into()],
            rows: vec![vec![json!(1)]],
        };
        assert_eq!(t.cell(0, 0), &json!(1));
        assert_eq!(t.cell(0, 1), &Value::Null);
        assert_eq!(t.cell(5, 0), &Value::Null);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = Table {
            header: vec!["name".into()],
            rows: vec![vec![json!("Amy")]],
        };
        let mut b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.rows[0][0] = json!("Ben");
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }
}
