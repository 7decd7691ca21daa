//! In-process implementations of the store traits, used by tests and local
//! development.

use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
};

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    error::{StoreError, StoreResult},
    query::{Filter, Query},
    storage::{ImageFile, ObjectStore},
    store::RowStore,
};

/// Tables held in memory, with the same filter semantics as the REST store.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<&'static str, Vec<Value>>>,
    failing: Mutex<HashSet<&'static str>>,
    failing_reads: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a row directly (bypassing failure injection), assigning an id
    /// if the row has none. Returns the stored row.
    pub fn seed(&self, table: &'static str, row: Value) -> Value {
        let row = with_generated_fields(row);
        self.tables
            .lock()
            .entry(table)
            .or_default()
            .push(row.clone());
        row
    }

    pub fn rows(&self, table: &'static str) -> Vec<Value> {
        self.tables.lock().get(table).cloned().unwrap_or_default()
    }

    /// Makes every subsequent write to `table` fail.
    pub fn fail_writes_to(&self, table: &'static str) {
        self.failing.lock().insert(table);
    }

    /// Makes every subsequent read fail (or succeed again).
    pub fn fail_reads(&self, failing: bool) {
        *self.failing_reads.lock() = failing;
    }

    fn check_readable(&self) -> StoreResult<()> {
        if *self.failing_reads.lock() {
            Err(StoreError::Rejected {
                status: 503,
                body: "reads are failing".to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn check_writable(&self, table: &'static str) -> StoreResult<()> {
        if self.failing.lock().contains(table) {
            Err(StoreError::Rejected {
                status: 503,
                body: format!("writes to `{table}` are failing"),
            })
        } else {
            Ok(())
        }
    }
}

fn with_generated_fields(row: Value) -> Value {
    let mut object = match row {
        Value::Object(object) => object,
        _ => Map::new(),
    };
    object
        .entry("id")
        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
    object
        .entry("created_at")
        .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
    Value::Object(object)
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (a, b) => a.to_string().cmp(&b.to_string()),
    }
}

#[rocket::async_trait]
impl RowStore for MemoryStore {
    async fn select(&self, query: &Query) -> StoreResult<Vec<Value>> {
        self.check_readable()?;
        let tables = self.tables.lock();
        let mut rows: Vec<Value> = tables
            .get(query.table)
            .map(|rows| {
                rows.iter().filter(|row| query.matches(row)).cloned().collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare(
                    a.get(&order.column).unwrap_or(&Value::Null),
                    b.get(&order.column).unwrap_or(&Value::Null),
                );
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        if let Some(embed) = &query.embed {
            let parents = tables.get(embed.table);
            for row in rows.iter_mut() {
                let parent = row
                    .get(embed.foreign_key)
                    .and_then(|fk| {
                        parents?.iter().find(|p| p.get("id") == Some(fk))
                    })
                    .cloned()
                    .unwrap_or(Value::Null);
                if let Value::Object(object) = row {
                    object.insert(embed.table.to_string(), parent);
                }
            }
        }

        Ok(rows)
    }

    async fn count(&self, query: &Query) -> StoreResult<usize> {
        self.check_readable()?;
        Ok(self
            .tables
            .lock()
            .get(query.table)
            .map(|rows| rows.iter().filter(|row| query.matches(row)).count())
            .unwrap_or(0))
    }

    async fn insert(
        &self,
        table: &'static str,
        row: Value,
    ) -> StoreResult<Value> {
        self.check_writable(table)?;
        if !row.is_object() {
            return Err(StoreError::Rejected {
                status: 400,
                body: "rows must be JSON objects".to_string(),
            });
        }
        Ok(self.seed(table, row))
    }

    async fn update(
        &self,
        table: &'static str,
        id: &str,
        guard: &[Filter],
        patch: Value,
    ) -> StoreResult<Option<Value>> {
        self.check_writable(table)?;
        let mut tables = self.tables.lock();
        let row = tables.get_mut(table).and_then(|rows| {
            rows.iter_mut().find(|row| {
                row.get("id").and_then(Value::as_str) == Some(id)
                    && guard.iter().all(|filter| filter.matches(row))
            })
        });

        let Some(row) = row else {
            return Ok(None);
        };

        if let (Value::Object(row), Value::Object(patch)) = (&mut *row, patch)
        {
            for (key, value) in patch {
                row.insert(key, value);
            }
        }
        Ok(Some(row.clone()))
    }

    async fn delete(&self, table: &'static str, id: &str) -> StoreResult<()> {
        self.check_writable(table)?;
        if let Some(rows) = self.tables.lock().get_mut(table) {
            rows.retain(|row| row.get("id").and_then(Value::as_str) != Some(id));
        }
        Ok(())
    }
}

/// Keeps uploads in memory and hands out URLs under a fixed base.
pub struct MemoryObjectStore {
    base_url: String,
    objects: Mutex<HashMap<String, ImageFile>>,
    failing: Mutex<bool>,
}

impl MemoryObjectStore {
    pub fn new(base_url: &str) -> Self {
        MemoryObjectStore {
            base_url: base_url.trim_end_matches('/').to_string(),
            objects: Mutex::new(HashMap::new()),
            failing: Mutex::new(false),
        }
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> =
            self.objects.lock().keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }
}

#[rocket::async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(&self, path: &str, file: &ImageFile) -> StoreResult<String> {
        if *self.failing.lock() {
            return Err(StoreError::Rejected {
                status: 500,
                body: "object storage unavailable".to_string(),
            });
        }
        self.objects.lock().insert(path.to_string(), file.clone());
        Ok(format!("{}/{path}", self.base_url))
    }
}
