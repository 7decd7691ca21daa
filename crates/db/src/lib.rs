//! Storage layer: entity types, the row-store abstraction (with a REST and
//! an in-memory implementation), object storage and configuration.

pub mod case;
pub mod company;
pub mod config;
pub mod error;
pub mod event;
pub mod memory;
pub mod organizer;
pub mod participant;
pub mod query;
pub mod raffle;
pub mod rest;
pub mod storage;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use query::Query;
pub use store::{Db, Row, RowStore};

use serde::{Deserialize, Deserializer};

/// Treats an explicit `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
