//! Table-level DynamoDB types.
//!
//! Struct field names use the snake_case spelling that scenario fixtures are
//! written in (`attribute_name`, `read_capacity_units`, ...). Enum variants use
//! idiomatic Rust naming with `#[serde(rename)]` attributes mapping to the
//! `SCREAMING_SNAKE_CASE` values DynamoDB uses.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Key type within a key schema element.
///
/// `Hash` denotes the partition key; `Range` denotes the sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// Partition key.
    #[serde(rename = "HASH")]
    Hash,
    /// Sort key.
    #[serde(rename = "RANGE")]
    Range,
}

/// Scalar attribute types allowed in key schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarAttributeType {
    /// String type.
    S,
    /// Number type.
    N,
    /// Binary type.
    B,
}

/// Current status of a DynamoDB table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableStatus {
    /// The table is being created.
    #[serde(rename = "CREATING")]
    Creating,
    /// The table is ready for use.
    #[serde(rename = "ACTIVE")]
    Active,
    /// The table is being deleted.
    #[serde(rename = "DELETING")]
    Deleting,
    /// The table is being updated (throughput, billing mode, indexes).
    #[serde(rename = "UPDATING")]
    Updating,
    /// Any status this crate does not model (archival, lost credentials).
    #[serde(other, rename = "UNKNOWN")]
    Other,
}

impl TableStatus {
    /// Returns the DynamoDB wire-format string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creating => "CREATING",
            Self::Active => "ACTIVE",
            Self::Deleting => "DELETING",
            Self::Updating => "UPDATING",
            Self::Other => "UNKNOWN",
        }
    }

    /// Whether the table is in a state that rejects structural changes.
    #[must_use]
    pub fn is_transitional(&self) -> bool {
        matches!(self, Self::Creating | Self::Deleting | Self::Updating)
    }
}

impl std::fmt::Display for TableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing mode for a DynamoDB table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BillingMode {
    /// Provisioned capacity mode with explicit RCU/WCU settings.
    #[default]
    #[serde(rename = "PROVISIONED")]
    Provisioned,
    /// On-demand capacity mode (pay per request).
    #[serde(rename = "PAY_PER_REQUEST")]
    PayPerRequest,
}

// ---------------------------------------------------------------------------
// Structs
// ---------------------------------------------------------------------------

/// An element of the key schema for a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySchemaElement {
    /// The name of the key attribute.
    pub attribute_name: String,
    /// The role of the attribute in the key schema (`HASH` or `RANGE`).
    pub key_type: KeyType,
}

impl KeySchemaElement {
    /// Create a key schema element.
    #[must_use]
    pub fn new(attribute_name: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            key_type,
        }
    }
}

/// An attribute definition specifying the attribute name and its scalar type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// The name of the attribute.
    pub attribute_name: String,
    /// The scalar data type of the attribute (`S`, `N`, or `B`).
    pub attribute_type: ScalarAttributeType,
}

impl AttributeDefinition {
    /// Create an attribute definition.
    #[must_use]
    pub fn new(attribute_name: impl Into<String>, attribute_type: ScalarAttributeType) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            attribute_type,
        }
    }
}

/// Provisioned throughput settings for a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProvisionedThroughput {
    /// The maximum number of strongly consistent reads per second.
    pub read_capacity_units: i64,
    /// The maximum number of writes per second.
    pub write_capacity_units: i64,
}

impl ProvisionedThroughput {
    /// Create throughput settings.
    #[must_use]
    pub fn new(read_capacity_units: i64, write_capacity_units: i64) -> Self {
        Self {
            read_capacity_units,
            write_capacity_units,
        }
    }
}

/// The parts of a `DescribeTable` response this crate consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableDescription {
    /// The name of the table.
    pub table_name: String,
    /// The current status of the table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_status: Option<TableStatus>,
    /// The key schema for the table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_schema: Vec<KeySchemaElement>,
    /// The attribute definitions for the table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute_definitions: Vec<AttributeDefinition>,
    /// The billing mode in effect, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_mode: Option<BillingMode>,
    /// The provisioned throughput settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioned_throughput: Option<ProvisionedThroughput>,
}

impl TableDescription {
    /// Whether the table is `ACTIVE`.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.table_status == Some(TableStatus::Active)
    }
}
