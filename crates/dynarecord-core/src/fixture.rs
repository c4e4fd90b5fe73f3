//! Ephemeral tables created for one scenario and torn down afterwards.

use std::sync::Arc;

use dynarecord_model::input::CreateTableInput;
use dynarecord_model::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ProvisionedThroughput,
    ScalarAttributeType,
};
use dynarecord_model::{Item, StoreErrorCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{RecordError, RecordResult};
use crate::store::TableStore;
use crate::waiter::Waiter;

/// Generate a table name unique for the lifetime of the test run.
#[must_use]
pub fn unique_table_name(base: &str) -> String {
    format!("{base}_{}", uuid::Uuid::new_v4())
}

/// One row of a table fixture: an attribute definition and its key role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    /// Attribute name.
    pub attribute_name: String,
    /// Scalar type of the attribute.
    pub attribute_type: ScalarAttributeType,
    /// Key role of the attribute.
    pub key_type: KeyType,
}

/// A table created for the current scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFixture {
    /// Unique table name.
    pub name: String,
    /// Attribute definitions, in fixture order.
    pub attribute_definitions: Vec<AttributeDefinition>,
    /// Key schema, in fixture order.
    pub key_schema: Vec<KeySchemaElement>,
}

/// Creates scenario tables, waits for them, and deletes them again.
#[derive(Debug, Clone)]
pub struct FixtureManager {
    store: Arc<dyn TableStore>,
    waiter: Waiter,
    teardown_max_retries: u32,
}

impl FixtureManager {
    /// Create a manager over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn TableStore>, waiter: Waiter, teardown_max_retries: u32) -> Self {
        Self {
            store,
            waiter,
            teardown_max_retries,
        }
    }

    /// Create a uniquely named table from `rows` and block until it is active.
    ///
    /// The table is provisioned with one read and one write capacity unit.
    pub async fn create_table(&self, base_name: &str, rows: &[TableRow]) -> RecordResult<TableFixture> {
        let fixture = TableFixture {
            name: unique_table_name(base_name),
            attribute_definitions: rows
                .iter()
                .map(|r| AttributeDefinition::new(&r.attribute_name, r.attribute_type))
                .collect(),
            key_schema: rows
                .iter()
                .map(|r| KeySchemaElement::new(&r.attribute_name, r.key_type))
                .collect(),
        };

        self.store
            .create_table(CreateTableInput {
                table_name: fixture.name.clone(),
                attribute_definitions: fixture.attribute_definitions.clone(),
                key_schema: fixture.key_schema.clone(),
                billing_mode: BillingMode::Provisioned,
                provisioned_throughput: Some(ProvisionedThroughput::new(1, 1)),
            })
            .await?;
        info!(table = %fixture.name, "created fixture table");

        self.waiter
            .until_table_exists(self.store.as_ref(), &fixture.name)
            .await?;
        Ok(fixture)
    }

    /// Write a raw item, given as a plain JSON object, straight into a table.
    ///
    /// Strings become `S` values, numbers `N`, booleans `BOOL`, arrays `L`
    /// and objects `M`. No model is involved.
    pub async fn put_item(&self, table_name: &str, data: &Value) -> RecordResult<()> {
        let item: Item = serde_dynamo::to_item(data)?;
        self.store.put_item(table_name, item, None).await?;
        Ok(())
    }

    /// Delete a table, tolerating a table that is already gone.
    ///
    /// While the service reports the table as in use, waits for it to become
    /// active and retries, at most `teardown_max_retries` times.
    pub async fn delete_table(&self, table_name: &str) -> RecordResult<()> {
        let mut retries = 0;
        loop {
            match self.store.delete_table(table_name).await {
                Ok(()) => {
                    info!(table = %table_name, "cleaned up table");
                    return Ok(());
                }
                Err(e) if e.is(StoreErrorCode::ResourceNotFound) => {
                    info!(table = %table_name, "table doesn't exist, continuing");
                    return Ok(());
                }
                Err(e) if e.is(StoreErrorCode::ResourceInUse) => {
                    if retries >= self.teardown_max_retries {
                        return Err(RecordError::ResourceBusy(format!(
                            "table {table_name} still in use after {retries} retries: {}",
                            e.message
                        )));
                    }
                    retries += 1;
                    warn!(table = %table_name, retries, "table in use, waiting before retrying delete");
                    self.waiter
                        .until_table_exists(self.store.as_ref(), table_name)
                        .await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
