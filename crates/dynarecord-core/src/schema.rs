//! Model definitions: which attributes a record has and how they map to items.
//!
//! A [`ModelDefinition`] is built once from a list of [`AttributeSpec`]s and
//! then shared immutably between records and migrations.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use dynarecord_model::types::{AttributeDefinition, KeySchemaElement, KeyType, ScalarAttributeType};
use serde::{Deserialize, Serialize};

use crate::error::{RecordError, RecordResult};

/// The type of a model attribute, named after the declaring method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeKind {
    /// `string_attr`
    #[serde(rename = "string_attr")]
    String,
    /// `integer_attr`
    #[serde(rename = "integer_attr")]
    Integer,
    /// `float_attr`
    #[serde(rename = "float_attr")]
    Float,
    /// `boolean_attr`
    #[serde(rename = "boolean_attr")]
    Boolean,
    /// `date_attr`
    #[serde(rename = "date_attr")]
    Date,
    /// `datetime_attr`
    #[serde(rename = "datetime_attr")]
    DateTime,
    /// `epoch_time_attr`
    #[serde(rename = "epoch_time_attr")]
    EpochTime,
    /// `list_attr`
    #[serde(rename = "list_attr")]
    List,
    /// `map_attr`
    #[serde(rename = "map_attr")]
    Map,
    /// `string_set_attr`
    #[serde(rename = "string_set_attr")]
    StringSet,
    /// `numeric_set_attr`
    #[serde(rename = "numeric_set_attr")]
    NumericSet,
}

impl AttributeKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::String,
        Self::Integer,
        Self::Float,
        Self::Boolean,
        Self::Date,
        Self::DateTime,
        Self::EpochTime,
        Self::List,
        Self::Map,
        Self::StringSet,
        Self::NumericSet,
    ];

    /// The declaring method name.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::String => "string_attr",
            Self::Integer => "integer_attr",
            Self::Float => "float_attr",
            Self::Boolean => "boolean_attr",
            Self::Date => "date_attr",
            Self::DateTime => "datetime_attr",
            Self::EpochTime => "epoch_time_attr",
            Self::List => "list_attr",
            Self::Map => "map_attr",
            Self::StringSet => "string_set_attr",
            Self::NumericSet => "numeric_set_attr",
        }
    }

    /// The scalar type used when this kind is part of a primary key, if it can be.
    #[must_use]
    pub fn key_type(&self) -> Option<ScalarAttributeType> {
        match self {
            Self::String | Self::Date | Self::DateTime => Some(ScalarAttributeType::S),
            Self::Integer | Self::Float | Self::EpochTime => Some(ScalarAttributeType::N),
            Self::Boolean | Self::List | Self::Map | Self::StringSet | Self::NumericSet => None,
        }
    }
}

impl FromStr for AttributeKind {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.method() == s)
            .ok_or_else(|| RecordError::InvalidSchema(format!("unknown attribute method {s}")))
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

/// Declaration of one model attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSpec {
    /// Name the record exposes.
    pub name: String,
    /// Attribute kind.
    pub kind: AttributeKind,
    /// Name stored in the table, when it differs from `name`.
    pub database_name: Option<String>,
    /// Whether this is the partition key.
    pub hash_key: bool,
    /// Whether this is the sort key.
    pub range_key: bool,
}

impl AttributeSpec {
    /// Declare a plain attribute.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            database_name: None,
            hash_key: false,
            range_key: false,
        }
    }

    /// Store the attribute under a different name.
    #[must_use]
    pub fn database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = Some(name.into());
        self
    }

    /// Mark as partition key.
    #[must_use]
    pub fn hash_key(mut self) -> Self {
        self.hash_key = true;
        self
    }

    /// Mark as sort key.
    #[must_use]
    pub fn range_key(mut self) -> Self {
        self.range_key = true;
        self
    }

    /// The attribute name used in stored items.
    #[must_use]
    pub fn storage_name(&self) -> &str {
        self.database_name.as_deref().unwrap_or(&self.name)
    }
}

/// Attribute declaration as written in fixtures:
/// `{"method": "string_attr", "name": "id", "database_name": "uid", "hash_key": true}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRow {
    /// Declaring method, e.g. `string_attr`.
    pub method: String,
    /// Exposed attribute name.
    pub name: String,
    /// Optional stored name.
    #[serde(default)]
    pub database_name: Option<String>,
    /// Partition key flag.
    #[serde(default)]
    pub hash_key: Option<bool>,
    /// Sort key flag.
    #[serde(default)]
    pub range_key: Option<bool>,
}

impl TryFrom<&AttributeRow> for AttributeSpec {
    type Error = RecordError;

    fn try_from(row: &AttributeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            name: row.name.clone(),
            kind: row.method.parse()?,
            database_name: row.database_name.clone(),
            hash_key: row.hash_key.unwrap_or(false),
            range_key: row.range_key.unwrap_or(false),
        })
    }
}

/// An immutable, validated model schema bound to a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDefinition {
    table_name: String,
    attributes: Vec<AttributeSpec>,
    hash_key: usize,
    range_key: Option<usize>,
}

impl ModelDefinition {
    /// Start building a definition for `table_name`.
    #[must_use]
    pub fn builder(table_name: impl Into<String>) -> ModelDefinitionBuilder {
        ModelDefinitionBuilder {
            table_name: table_name.into(),
            attributes: Vec::new(),
        }
    }

    /// Build a definition straight from fixture rows.
    pub fn from_rows(table_name: impl Into<String>, rows: &[AttributeRow]) -> RecordResult<Self> {
        let mut builder = Self::builder(table_name);
        for row in rows {
            builder = builder.attribute(AttributeSpec::try_from(row)?);
        }
        builder.build()
    }

    /// The backing table.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// All attributes, in declaration order.
    #[must_use]
    pub fn attributes(&self) -> &[AttributeSpec] {
        &self.attributes
    }

    /// Look up an attribute by exposed name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Look up an attribute by stored name.
    #[must_use]
    pub fn attribute_by_storage_name(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.storage_name() == name)
    }

    /// The partition key attribute.
    #[must_use]
    pub fn hash_key(&self) -> &AttributeSpec {
        &self.attributes[self.hash_key]
    }

    /// The sort key attribute, if any.
    #[must_use]
    pub fn range_key(&self) -> Option<&AttributeSpec> {
        self.range_key.map(|i| &self.attributes[i])
    }

    /// Key attributes: the partition key, then the sort key.
    pub fn key_attributes(&self) -> impl Iterator<Item = &AttributeSpec> {
        std::iter::once(self.hash_key()).chain(self.range_key())
    }

    /// Key schema using stored names.
    #[must_use]
    pub fn key_schema(&self) -> Vec<KeySchemaElement> {
        let mut schema = vec![KeySchemaElement::new(
            self.hash_key().storage_name(),
            KeyType::Hash,
        )];
        if let Some(range) = self.range_key() {
            schema.push(KeySchemaElement::new(range.storage_name(), KeyType::Range));
        }
        schema
    }

    /// Attribute definitions for the key attributes.
    #[must_use]
    pub fn attribute_definitions(&self) -> Vec<AttributeDefinition> {
        self.key_attributes()
            .filter_map(|a| {
                a.kind
                    .key_type()
                    .map(|t| AttributeDefinition::new(a.storage_name(), t))
            })
            .collect()
    }
}

/// Collects attribute specs and validates them into a [`ModelDefinition`].
#[derive(Debug, Clone)]
pub struct ModelDefinitionBuilder {
    table_name: String,
    attributes: Vec<AttributeSpec>,
}

impl ModelDefinitionBuilder {
    /// Add an attribute.
    #[must_use]
    pub fn attribute(mut self, spec: AttributeSpec) -> Self {
        self.attributes.push(spec);
        self
    }

    /// Validate and freeze the definition.
    ///
    /// Exactly one hash key and at most one range key are allowed; names and
    /// stored names must be unique; key attributes must be of a scalar kind.
    pub fn build(self) -> RecordResult<ModelDefinition> {
        if self.table_name.is_empty() {
            return Err(RecordError::InvalidSchema("table name is empty".to_owned()));
        }

        let mut names = HashSet::new();
        let mut storage_names = HashSet::new();
        for attr in &self.attributes {
            if !names.insert(attr.name.as_str()) {
                return Err(RecordError::InvalidSchema(format!(
                    "attribute {} declared twice",
                    attr.name
                )));
            }
            if !storage_names.insert(attr.storage_name()) {
                return Err(RecordError::InvalidSchema(format!(
                    "stored name {} used by more than one attribute",
                    attr.storage_name()
                )));
            }
            if attr.hash_key && attr.range_key {
                return Err(RecordError::InvalidSchema(format!(
                    "attribute {} cannot be both hash and range key",
                    attr.name
                )));
            }
            if (attr.hash_key || attr.range_key) && attr.kind.key_type().is_none() {
                return Err(RecordError::InvalidSchema(format!(
                    "{} attribute {} cannot be a key",
                    attr.kind, attr.name
                )));
            }
        }

        let hash_keys: Vec<usize> = positions(&self.attributes, |a| a.hash_key);
        let range_keys: Vec<usize> = positions(&self.attributes, |a| a.range_key);
        let hash_key = match hash_keys.as_slice() {
            [i] => *i,
            [] => return Err(RecordError::InvalidSchema("no hash key declared".to_owned())),
            _ => {
                return Err(RecordError::InvalidSchema(
                    "more than one hash key declared".to_owned(),
                ));
            }
        };
        if range_keys.len() > 1 {
            return Err(RecordError::InvalidSchema(
                "more than one range key declared".to_owned(),
            ));
        }

        Ok(ModelDefinition {
            table_name: self.table_name,
            attributes: self.attributes,
            hash_key,
            range_key: range_keys.first().copied(),
        })
    }
}

fn positions(attrs: &[AttributeSpec], pred: impl Fn(&AttributeSpec) -> bool) -> Vec<usize> {
    attrs
        .iter()
        .enumerate()
        .filter(|(_, a)| pred(a))
        .map(|(i, _)| i)
        .collect()
}
