//! Request inputs for the table and item operations a store must support.

use serde::{Deserialize, Serialize};

use crate::types::{AttributeDefinition, BillingMode, KeySchemaElement, ProvisionedThroughput};

/// Input for `CreateTable`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateTableInput {
    /// The name of the table to create.
    pub table_name: String,
    /// Attribute definitions for every key attribute.
    pub attribute_definitions: Vec<AttributeDefinition>,
    /// The primary key: one `HASH` element and an optional `RANGE` element.
    pub key_schema: Vec<KeySchemaElement>,
    /// Capacity mode. Defaults to provisioned.
    #[serde(default)]
    pub billing_mode: BillingMode,
    /// Required in provisioned mode, forbidden on demand.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioned_throughput: Option<ProvisionedThroughput>,
}

/// Input for `UpdateTable`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTableInput {
    /// The name of the table to update.
    pub table_name: String,
    /// New capacity mode, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_mode: Option<BillingMode>,
    /// New provisioned throughput, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioned_throughput: Option<ProvisionedThroughput>,
}

impl UpdateTableInput {
    /// Whether the input requests no change at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.billing_mode.is_none() && self.provisioned_throughput.is_none()
    }
}

/// Condition attached to a `PutItem`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutCondition {
    /// Only write if no item with this key exists yet
    /// (`attribute_not_exists(<attribute>)`).
    AttributeNotExists(String),
}
