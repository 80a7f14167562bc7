//! Table store abstraction and the paginated reader built on it.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{Error, Result};

/// One schemaless table item, attribute name to value.
pub type Record = serde_json::Map<String, Value>;

/// Attribute-equals-string predicate applied by the store during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFilter {
    pub attribute: String,
    pub value: String,
}

impl ScanFilter {
    pub fn eq(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        matches!(record.get(&self.attribute), Some(Value::String(v)) if *v == self.value)
    }
}

/// One page of a scan.
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    pub items: Vec<Record>,
    /// Where the next page starts; `None` once the table is exhausted
    pub continuation: Option<Record>,
}

/// Key/value table operations used by the survey functions.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn get_item(&self, table: &str, key: &str, value: &str) -> Result<Option<Record>>;

    /// Insert or fully replace the item with the same primary key.
    async fn put_item(&self, table: &str, record: Record) -> Result<()>;

    async fn delete_item(&self, table: &str, key: &str, value: &str) -> Result<()>;

    async fn scan_page(
        &self,
        table: &str,
        filter: Option<&ScanFilter>,
        start: Option<Record>,
    ) -> Result<ScanPage>;
}

/// Read every matching record, following continuation tokens until the
/// store reports none left.
///
/// Items keep the order the store returned them in. Any failed page aborts
/// the whole scan.
pub async fn scan_all(
    store: &dyn TableStore,
    table: &str,
    filter: Option<&ScanFilter>,
) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    let mut start = None;

    loop {
        let page = store.scan_page(table, filter, start).await?;
        records.extend(page.items);

        match page.continuation {
            Some(next) => start = Some(next),
            None => break,
        }
    }

    Ok(records)
}

/// In-process store for local runs and tests.
///
/// Items keep insertion order; replacing an item keeps its position.
pub struct MemoryStore {
    /// Primary key attribute per table
    keys: HashMap<String, String>,
    tables: RwLock<HashMap<String, Vec<Record>>>,
    page_size: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            keys: HashMap::new(),
            tables: RwLock::new(HashMap::new()),
            page_size: 100,
        }
    }

    /// Register a table and its primary key attribute.
    pub fn with_table(mut self, table: &str, key: &str) -> Self {
        self.keys.insert(table.to_string(), key.to_string());
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub async fn len(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map_or(0, Vec::len)
    }

    fn key_attribute(&self, table: &str) -> Result<&str> {
        self.keys
            .get(table)
            .map(String::as_str)
            .ok_or_else(|| Error::Storage(format!("Table not found: {}", table)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn key_matches(record: &Record, key: &str, value: &str) -> bool {
    matches!(record.get(key), Some(Value::String(v)) if v == value)
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn get_item(&self, table: &str, key: &str, value: &str) -> Result<Option<Record>> {
        self.key_attribute(table)?;
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .and_then(|items| items.iter().find(|r| key_matches(r, key, value)))
            .cloned())
    }

    async fn put_item(&self, table: &str, record: Record) -> Result<()> {
        let key = self.key_attribute(table)?;
        let value = match record.get(key) {
            Some(Value::String(v)) if !v.is_empty() => v.clone(),
            _ => return Err(Error::Storage(format!("Item is missing key {}", key))),
        };

        let mut tables = self.tables.write().await;
        let items = tables.entry(table.to_string()).or_default();
        match items.iter_mut().find(|r| key_matches(r, key, &value)) {
            Some(existing) => *existing = record,
            None => items.push(record),
        }
        Ok(())
    }

    async fn delete_item(&self, table: &str, key: &str, value: &str) -> Result<()> {
        self.key_attribute(table)?;
        let mut tables = self.tables.write().await;
        if let Some(items) = tables.get_mut(table) {
            items.retain(|r| !key_matches(r, key, value));
        }
        Ok(())
    }

    async fn scan_page(
        &self,
        table: &str,
        filter: Option<&ScanFilter>,
        start: Option<Record>,
    ) -> Result<ScanPage> {
        let key = self.key_attribute(table)?;
        let tables = self.tables.read().await;
        let items = tables.get(table).map(Vec::as_slice).unwrap_or_default();

        // Like DynamoDB, the page size bounds items read, not items returned.
        let offset = match start.as_ref().and_then(|s| s.get(key)) {
            Some(Value::String(last)) => items
                .iter()
                .position(|r| key_matches(r, key, last))
                .map_or(items.len(), |i| i + 1),
            _ => 0,
        };
        let end = (offset + self.page_size).min(items.len());
        let read = &items[offset..end];

        let continuation = if end < items.len() {
            read.last().and_then(|r| r.get(key)).map(|v| {
                let mut next = Record::new();
                next.insert(key.to_string(), v.clone());
                next
            })
        } else {
            None
        };

        Ok(ScanPage {
            items: read
                .iter()
                .filter(|r| filter.map_or(true, |f| f.matches(r)))
                .cloned()
                .collect(),
            continuation,
        })
    }
}
