//! Table stores: the seam between the record layer and DynamoDB.
//!
//! [`TableStore`] is the handful of table and item calls the record layer
//! issues. [`DynamoClient`] forwards them to the AWS SDK; `MemoryStore` (behind
//! the `memory` feature) answers them in-process for offline runs.

use std::fmt;

use async_trait::async_trait;
use dynarecord_model::Item;
use dynarecord_model::StoreError;
use dynarecord_model::input::{CreateTableInput, PutCondition, UpdateTableInput};
use dynarecord_model::types::TableDescription;

mod dynamo;
#[cfg(any(test, feature = "memory"))]
mod memory;

pub use dynamo::DynamoClient;
#[cfg(any(test, feature = "memory"))]
pub use memory::MemoryStore;

/// Result type of every store call.
pub type StoreResult<T> = Result<T, StoreError>;

/// Table lifecycle and single-item operations against a key-value store.
///
/// Every call is one round trip; implementations must not cache.
#[async_trait]
pub trait TableStore: fmt::Debug + Send + Sync {
    /// Create a table. Returns as soon as the request is accepted.
    async fn create_table(&self, input: CreateTableInput) -> StoreResult<TableDescription>;

    /// Change billing mode or throughput of an existing table.
    async fn update_table(&self, input: UpdateTableInput) -> StoreResult<TableDescription>;

    /// Delete a table.
    async fn delete_table(&self, table_name: &str) -> StoreResult<()>;

    /// Describe a table.
    async fn describe_table(&self, table_name: &str) -> StoreResult<TableDescription>;

    /// Write a whole item, optionally guarded by a condition.
    async fn put_item(
        &self,
        table_name: &str,
        item: Item,
        condition: Option<PutCondition>,
    ) -> StoreResult<()>;

    /// Read an item by its full primary key (strongly consistent).
    async fn get_item(&self, table_name: &str, key: Item) -> StoreResult<Option<Item>>;

    /// Delete an item by its full primary key. Deleting a missing item succeeds.
    async fn delete_item(&self, table_name: &str, key: Item) -> StoreResult<()>;
}
