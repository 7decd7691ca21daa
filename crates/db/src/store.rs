use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    case::{to_camel, to_snake},
    error::{StoreError, StoreResult},
    query::{Filter, Query},
};

/// Generic table-scoped access to the relational store.
///
/// Rows cross this boundary exactly as the store holds them (`snake_case`
/// keys). Use [`Db`] for typed access.
#[rocket::async_trait]
pub trait RowStore: Send + Sync {
    async fn select(&self, query: &Query) -> StoreResult<Vec<Value>>;

    async fn count(&self, query: &Query) -> StoreResult<usize>;

    /// Inserts a row and returns it as stored (with its generated id).
    async fn insert(&self, table: &'static str, row: Value)
        -> StoreResult<Value>;

    /// Applies `patch` to the row with this id, provided the row also
    /// satisfies every filter in `guard`. Returns `None` when no row matched.
    async fn update(
        &self,
        table: &'static str,
        id: &str,
        guard: &[Filter],
        patch: Value,
    ) -> StoreResult<Option<Value>>;

    async fn delete(&self, table: &'static str, id: &str) -> StoreResult<()>;
}

/// A type stored in a table of its own.
pub trait Row: DeserializeOwned + Send {
    const TABLE: &'static str;
}

/// Typed facade over a [`RowStore`]. Every payload is converted to the
/// store's field names on the way in and every row back to the
/// application's on the way out.
#[derive(Clone)]
pub struct Db {
    store: Arc<dyn RowStore>,
}

impl Db {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Db { store }
    }

    pub fn store(&self) -> &Arc<dyn RowStore> {
        &self.store
    }

    #[tracing::instrument(skip(self), fields(table = query.table))]
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        query: Query,
    ) -> StoreResult<Vec<T>> {
        let rows = self.store.select(&query).await?;
        tracing::trace!("fetched {} rows", rows.len());
        rows.into_iter()
            .map(|row| decode(query.table, row))
            .collect()
    }

    pub async fn fetch_one<T: DeserializeOwned>(
        &self,
        query: Query,
    ) -> StoreResult<Option<T>> {
        let mut rows = self.fetch::<T>(query.limit(1)).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    #[tracing::instrument(skip(self), fields(table = query.table))]
    pub async fn count(&self, query: Query) -> StoreResult<usize> {
        self.store.count(&query).await
    }

    #[tracing::instrument(skip(self, input), fields(table = T::TABLE))]
    pub async fn insert<T: Row, I: Serialize + Sync>(
        &self,
        input: &I,
    ) -> StoreResult<T> {
        let row = encode(T::TABLE, input)?;
        let stored = self.store.insert(T::TABLE, row).await?;
        decode(T::TABLE, stored)
    }

    pub async fn update<T: Row, P: Serialize + Sync>(
        &self,
        id: &str,
        patch: &P,
    ) -> StoreResult<Option<T>> {
        self.update_guarded(id, Vec::new(), patch).await
    }

    /// Updates the row only while it still satisfies `guard`.
    #[tracing::instrument(skip(self, patch), fields(table = T::TABLE))]
    pub async fn update_guarded<T: Row, P: Serialize + Sync>(
        &self,
        id: &str,
        guard: Vec<Filter>,
        patch: &P,
    ) -> StoreResult<Option<T>> {
        let patch = encode(T::TABLE, patch)?;
        match self.store.update(T::TABLE, id, &guard, patch).await? {
            Some(row) => Ok(Some(decode(T::TABLE, row)?)),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self), fields(table = T::TABLE))]
    pub async fn delete<T: Row>(&self, id: &str) -> StoreResult<()> {
        self.store.delete(T::TABLE, id).await
    }
}

fn encode<I: Serialize>(table: &str, input: &I) -> StoreResult<Value> {
    serde_json::to_value(input).map(to_snake).map_err(|source| {
        StoreError::Encode {
            table: table.to_string(),
            source,
        }
    })
}

fn decode<T: DeserializeOwned>(table: &str, row: Value) -> StoreResult<T> {
    serde_json::from_value(to_camel(row)).map_err(|source| StoreError::Decode {
        table: table.to_string(),
        source,
    })
}
