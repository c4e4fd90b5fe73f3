//! In-process [`TableStore`].
//!
//! Tables live in a `DashMap` keyed by name; items are keyed by the canonical
//! rendering of their primary-key attributes, so `N "1"` and `N "1.0"` address
//! the same item. Only the behavior the record layer depends on is modeled:
//! key validation, the `attribute_not_exists` put condition, and table status
//! transitions.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use dynarecord_model::input::{CreateTableInput, PutCondition, UpdateTableInput};
use dynarecord_model::types::{
    BillingMode, KeyType, ScalarAttributeType, TableDescription, TableStatus,
};
use dynarecord_model::{AttributeValue, Item, StoreError};

use super::{StoreResult, TableStore};

/// Thread-safe in-memory table store.
///
/// With [`MemoryStore::with_transition_polls`], created and updated tables
/// report `CREATING`/`UPDATING` for that many `DescribeTable` calls before
/// turning `ACTIVE`, so waiters and busy-table handling can be exercised.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: DashMap<String, MemoryTable>,
    transition_polls: u32,
}

#[derive(Debug)]
struct MemoryTable {
    description: TableDescription,
    items: HashMap<Vec<String>, Item>,
    pending_polls: u32,
}

impl MemoryStore {
    /// Create an empty store whose tables are immediately `ACTIVE`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store whose tables stay transitional for `polls` describes.
    #[must_use]
    pub fn with_transition_polls(polls: u32) -> Self {
        Self {
            tables: DashMap::new(),
            transition_polls: polls,
        }
    }

    /// Number of tables currently held.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    fn transitional_status(&self, status: TableStatus) -> TableStatus {
        if self.transition_polls > 0 {
            status
        } else {
            TableStatus::Active
        }
    }
}

fn not_found(table_name: &str) -> StoreError {
    StoreError::resource_not_found(format!(
        "Requested resource not found: Table: {table_name} not found"
    ))
}

fn in_use(table_name: &str, status: &TableStatus) -> StoreError {
    StoreError::resource_in_use(format!(
        "Attempt to change a resource which is still in use: Table {table_name} is {status}"
    ))
}

fn validate_key_schema(input: &CreateTableInput) -> StoreResult<()> {
    let hash_keys = input
        .key_schema
        .iter()
        .filter(|k| k.key_type == KeyType::Hash)
        .count();
    let range_keys = input.key_schema.len() - hash_keys;
    if hash_keys != 1 || range_keys > 1 {
        return Err(StoreError::validation(
            "Key schema must contain exactly one HASH element and at most one RANGE element",
        ));
    }
    for key in &input.key_schema {
        if !input
            .attribute_definitions
            .iter()
            .any(|d| d.attribute_name == key.attribute_name)
        {
            return Err(StoreError::validation(format!(
                "Key attribute {} is not defined in AttributeDefinitions",
                key.attribute_name
            )));
        }
    }
    match (input.billing_mode, input.provisioned_throughput) {
        (BillingMode::Provisioned, None) => Err(StoreError::validation(
            "ProvisionedThroughput must be specified in PROVISIONED mode",
        )),
        (BillingMode::PayPerRequest, Some(_)) => Err(StoreError::validation(
            "ProvisionedThroughput cannot be specified in PAY_PER_REQUEST mode",
        )),
        _ => Ok(()),
    }
}

/// Render the primary key of `item`. With `exact`, extra attributes are rejected.
///
/// Key values must match the scalar type of their attribute definition.
fn item_key(description: &TableDescription, item: &Item, exact: bool) -> StoreResult<Vec<String>> {
    let schema = &description.key_schema;
    if exact && item.len() != schema.len() {
        return Err(StoreError::validation(
            "The provided key element does not match the schema",
        ));
    }
    let mut parts = Vec::with_capacity(schema.len());
    for key in schema {
        let name = &key.attribute_name;
        let value = item.get(name).ok_or_else(|| {
            StoreError::validation(format!(
                "One of the required keys was not given a value: {name}"
            ))
        })?;
        let expected = description
            .attribute_definitions
            .iter()
            .find(|d| &d.attribute_name == name)
            .map(|d| d.attribute_type)
            .ok_or_else(|| {
                StoreError::validation(format!("Key attribute {name} has no attribute definition"))
            })?;
        let part = match (expected, value) {
            (ScalarAttributeType::S, AttributeValue::S(s)) => Some(s.clone()),
            (ScalarAttributeType::N, AttributeValue::N(n)) => canonical_number(n),
            (ScalarAttributeType::B, AttributeValue::B(b)) => Some(format!("{:?}", b.as_ref())),
            _ => None,
        };
        parts.push(part.ok_or_else(|| {
            StoreError::validation(format!(
                "One or more parameter values were invalid: Type mismatch for key {name} \
                 expected: {expected:?} actual: {}",
                type_name(value)
            ))
        })?);
    }
    Ok(parts)
}

/// Canonical form of a number string: `0.<significant digits>e<exponent>`.
///
/// Returns `None` for anything that is not a decimal number.
fn canonical_number(n: &str) -> Option<String> {
    let n = n.trim();
    let (negative, unsigned) = match n.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, n.strip_prefix('+').unwrap_or(n)),
    };
    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(i) => (&unsigned[..i], unsigned[i + 1..].parse::<i64>().ok()?),
        None => (unsigned, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part
        .bytes()
        .chain(frac_part.bytes())
        .all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let digits = format!("{int_part}{frac_part}");
    let significant = digits.trim_matches('0');
    if significant.is_empty() {
        return Some("0".to_owned());
    }
    let leading_zeros = digits.len() - digits.trim_start_matches('0').len();
    let point = i64::try_from(int_part.len()).ok()? - i64::try_from(leading_zeros).ok()? + exponent;
    let sign = if negative { "-" } else { "" };
    Some(format!("{sign}0.{significant}e{point}"))
}

fn type_name(value: &AttributeValue) -> &'static str {
    match value {
        AttributeValue::S(_) => "S",
        AttributeValue::N(_) => "N",
        AttributeValue::B(_) => "B",
        AttributeValue::Ss(_) => "SS",
        AttributeValue::Ns(_) => "NS",
        AttributeValue::Bs(_) => "BS",
        AttributeValue::Bool(_) => "BOOL",
        AttributeValue::Null(_) => "NULL",
        AttributeValue::L(_) => "L",
        AttributeValue::M(_) => "M",
        _ => "unknown",
    }
}

impl MemoryTable {
    fn require_active(&self) -> StoreResult<()> {
        match &self.description.table_status {
            Some(TableStatus::Creating) => Err(not_found(&self.description.table_name)),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn create_table(&self, input: CreateTableInput) -> StoreResult<TableDescription> {
        validate_key_schema(&input)?;
        match self.tables.entry(input.table_name.clone()) {
            Entry::Occupied(e) => Err(StoreError::resource_in_use(format!(
                "Table already exists: {}",
                e.key()
            ))),
            Entry::Vacant(e) => {
                let description = TableDescription {
                    table_name: input.table_name,
                    table_status: Some(self.transitional_status(TableStatus::Creating)),
                    key_schema: input.key_schema,
                    attribute_definitions: input.attribute_definitions,
                    billing_mode: Some(input.billing_mode),
                    provisioned_throughput: input.provisioned_throughput,
                };
                e.insert(MemoryTable {
                    description: description.clone(),
                    items: HashMap::new(),
                    pending_polls: self.transition_polls,
                });
                Ok(description)
            }
        }
    }

    async fn update_table(&self, input: UpdateTableInput) -> StoreResult<TableDescription> {
        if input.is_empty() {
            return Err(StoreError::validation(
                "At least one of ProvisionedThroughput or BillingMode must be given",
            ));
        }
        let mut table = self
            .tables
            .get_mut(&input.table_name)
            .ok_or_else(|| not_found(&input.table_name))?;
        if let Some(status) = &table.description.table_status {
            if status.is_transitional() {
                return Err(in_use(&input.table_name, status));
            }
        }

        if let Some(mode) = input.billing_mode {
            table.description.billing_mode = Some(mode);
            if mode == BillingMode::PayPerRequest {
                table.description.provisioned_throughput = None;
            }
        }
        if let Some(pt) = input.provisioned_throughput {
            table.description.provisioned_throughput = Some(pt);
        }
        table.description.table_status = Some(self.transitional_status(TableStatus::Updating));
        table.pending_polls = self.transition_polls;
        Ok(table.description.clone())
    }

    async fn delete_table(&self, table_name: &str) -> StoreResult<()> {
        match self.tables.entry(table_name.to_owned()) {
            Entry::Vacant(_) => Err(not_found(table_name)),
            Entry::Occupied(e) => {
                if let Some(status) = &e.get().description.table_status {
                    if status.is_transitional() {
                        return Err(in_use(table_name, status));
                    }
                }
                e.remove();
                Ok(())
            }
        }
    }

    async fn describe_table(&self, table_name: &str) -> StoreResult<TableDescription> {
        let mut table = self
            .tables
            .get_mut(table_name)
            .ok_or_else(|| not_found(table_name))?;
        if table.pending_polls > 0 {
            table.pending_polls -= 1;
        } else {
            table.description.table_status = Some(TableStatus::Active);
        }
        Ok(table.description.clone())
    }

    async fn put_item(
        &self,
        table_name: &str,
        item: Item,
        condition: Option<PutCondition>,
    ) -> StoreResult<()> {
        let mut table = self
            .tables
            .get_mut(table_name)
            .ok_or_else(|| not_found(table_name))?;
        table.require_active()?;
        let key = item_key(&table.description, &item, false)?;

        if let Some(PutCondition::AttributeNotExists(_)) = condition {
            if table.items.contains_key(&key) {
                return Err(StoreError::conditional_check_failed(
                    "The conditional request failed",
                ));
            }
        }

        table.items.insert(key, item);
        Ok(())
    }

    async fn get_item(&self, table_name: &str, key: Item) -> StoreResult<Option<Item>> {
        let table = self
            .tables
            .get(table_name)
            .ok_or_else(|| not_found(table_name))?;
        table.require_active()?;
        let key = item_key(&table.description, &key, true)?;
        Ok(table.items.get(&key).cloned())
    }

    async fn delete_item(&self, table_name: &str, key: Item) -> StoreResult<()> {
        let mut table = self
            .tables
            .get_mut(table_name)
            .ok_or_else(|| not_found(table_name))?;
        table.require_active()?;
        let key = item_key(&table.description, &key, true)?;
        table.items.remove(&key);
        Ok(())
    }
}
