//! Table migrations: create, update and delete the table behind a model.

use std::sync::Arc;

use dynarecord_model::StoreErrorCode;
use dynarecord_model::input::{CreateTableInput, UpdateTableInput};
use dynarecord_model::types::{BillingMode, ProvisionedThroughput, TableDescription};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::error::{RecordError, RecordResult};
use crate::schema::ModelDefinition;
use crate::store::TableStore;
use crate::waiter::Waiter;

/// Capacity options for [`TableMigration::create`] and [`TableMigration::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationOptions {
    /// Read/write capacity units.
    #[serde(default)]
    pub provisioned_throughput: Option<ProvisionedThroughput>,
    /// Capacity mode.
    #[serde(default)]
    pub billing_mode: Option<BillingMode>,
}

impl MigrationOptions {
    /// Provisioned options with the given capacity.
    #[must_use]
    pub fn provisioned(read_capacity_units: i64, write_capacity_units: i64) -> Self {
        Self {
            provisioned_throughput: Some(ProvisionedThroughput::new(
                read_capacity_units,
                write_capacity_units,
            )),
            billing_mode: None,
        }
    }

    /// On-demand options.
    #[must_use]
    pub fn pay_per_request() -> Self {
        Self {
            provisioned_throughput: None,
            billing_mode: Some(BillingMode::PayPerRequest),
        }
    }

    fn validate(&self) -> RecordResult<()> {
        match (self.billing_mode.unwrap_or_default(), self.provisioned_throughput) {
            (BillingMode::Provisioned, None) => Err(RecordError::InvalidOptions(
                "provisioned_throughput is required in PROVISIONED mode".to_owned(),
            )),
            (BillingMode::PayPerRequest, Some(_)) => Err(RecordError::InvalidOptions(
                "provisioned_throughput cannot be set in PAY_PER_REQUEST mode".to_owned(),
            )),
            _ => Ok(()),
        }
    }
}

/// Structural operations on the table of one model.
#[derive(Debug, Clone)]
pub struct TableMigration {
    definition: Arc<ModelDefinition>,
    store: Arc<dyn TableStore>,
    waiter: Waiter,
}

impl TableMigration {
    /// Create a migration handle.
    #[must_use]
    pub fn new(definition: Arc<ModelDefinition>, store: Arc<dyn TableStore>, waiter: Waiter) -> Self {
        Self {
            definition,
            store,
            waiter,
        }
    }

    /// The model being migrated.
    #[must_use]
    pub fn definition(&self) -> &Arc<ModelDefinition> {
        &self.definition
    }

    /// Create the table from the model's key schema. Does not wait.
    pub async fn create(&self, opts: &MigrationOptions) -> RecordResult<()> {
        opts.validate()?;
        let table_name = self.definition.table_name();
        self.store
            .create_table(CreateTableInput {
                table_name: table_name.to_owned(),
                attribute_definitions: self.definition.attribute_definitions(),
                key_schema: self.definition.key_schema(),
                billing_mode: opts.billing_mode.unwrap_or_default(),
                provisioned_throughput: opts.provisioned_throughput,
            })
            .await?;
        info!(table = %table_name, "create table requested");
        Ok(())
    }

    /// Change capacity settings. The table turns `UPDATING` for a while.
    pub async fn update(&self, opts: &MigrationOptions) -> RecordResult<()> {
        if opts.billing_mode.is_none() && opts.provisioned_throughput.is_none() {
            return Err(RecordError::InvalidOptions(
                "update requires provisioned_throughput or billing_mode".to_owned(),
            ));
        }
        if opts.billing_mode.is_some() {
            opts.validate()?;
        }
        let table_name = self.definition.table_name();
        self.store
            .update_table(UpdateTableInput {
                table_name: table_name.to_owned(),
                billing_mode: opts.billing_mode,
                provisioned_throughput: opts.provisioned_throughput,
            })
            .await?;
        info!(table = %table_name, "update table requested");
        Ok(())
    }

    /// Delete the table. Does not wait.
    pub async fn delete(&self) -> RecordResult<()> {
        let table_name = self.definition.table_name();
        self.store.delete_table(table_name).await?;
        info!(table = %table_name, "delete table requested");
        Ok(())
    }

    /// Block until the table is `ACTIVE`.
    pub async fn wait_until_available(&self) -> RecordResult<TableDescription> {
        self.waiter
            .until_table_exists(self.store.as_ref(), self.definition.table_name())
            .await
    }
}

/// Whether the model's table exists and is `ACTIVE` right now.
pub async fn table_exists(definition: &ModelDefinition, store: &dyn TableStore) -> RecordResult<bool> {
    match store.describe_table(definition.table_name()).await {
        Ok(desc) => Ok(desc.is_active()),
        Err(e) if e.is(StoreErrorCode::ResourceNotFound) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// The table's current provisioned throughput. On-demand tables report zero.
pub async fn provisioned_throughput(
    definition: &ModelDefinition,
    store: &dyn TableStore,
) -> RecordResult<ProvisionedThroughput> {
    let desc = store.describe_table(definition.table_name()).await?;
    Ok(desc.provisioned_throughput.unwrap_or_default())
}

/// Answer a named question about the model, as JSON.
///
/// Supported: `provisioned_throughput`, `table_exists?`, `table_name`,
/// `hash_key`, `range_key`.
pub async fn query_model(
    definition: &ModelDefinition,
    store: &dyn TableStore,
    method: &str,
) -> RecordResult<Value> {
    match method {
        "provisioned_throughput" => {
            let pt = provisioned_throughput(definition, store).await?;
            Ok(json!({
                "read_capacity_units": pt.read_capacity_units,
                "write_capacity_units": pt.write_capacity_units,
            }))
        }
        "table_exists?" => Ok(Value::Bool(table_exists(definition, store).await?)),
        "table_name" => Ok(Value::String(definition.table_name().to_owned())),
        "hash_key" => Ok(Value::String(definition.hash_key().name.clone())),
        "range_key" => Ok(definition
            .range_key()
            .map_or(Value::Null, |r| Value::String(r.name.clone()))),
        other => Err(RecordError::UnknownModelMethod(other.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::schema::{AttributeKind, AttributeSpec};
    use crate::store::MemoryStore;

    fn model() -> Arc<ModelDefinition> {
        Arc::new(
            ModelDefinition::builder("Migrations")
                .attribute(AttributeSpec::new("id", AttributeKind::String).hash_key())
                .attribute(AttributeSpec::new("at", AttributeKind::EpochTime).range_key())
                .build()
                .unwrap(),
        )
    }

    fn migration(store: Arc<MemoryStore>) -> TableMigration {
        TableMigration::new(model(), store, Waiter::new(Duration::from_millis(1), 10))
    }

    #[tokio::test]
    async fn test_should_create_and_wait_for_table() {
        let store = Arc::new(MemoryStore::with_transition_polls(2));
        let migration = migration(store.clone());

        migration.create(&MigrationOptions::provisioned(1, 1)).await.unwrap();
        assert!(!table_exists(migration.definition(), store.as_ref()).await.unwrap());

        migration.wait_until_available().await.unwrap();
        assert!(table_exists(migration.definition(), store.as_ref()).await.unwrap());
        assert_eq!(
            query_model(migration.definition(), store.as_ref(), "provisioned_throughput")
                .await
                .unwrap(),
            json!({"read_capacity_units": 1, "write_capacity_units": 1})
        );
    }

    #[tokio::test]
    async fn test_should_delete_table() {
        let store = Arc::new(MemoryStore::new());
        let migration = migration(store.clone());
        migration.create(&MigrationOptions::pay_per_request()).await.unwrap();
        migration.wait_until_available().await.unwrap();

        migration.delete().await.unwrap();
        Waiter::new(Duration::from_millis(1), 3)
            .until_table_not_exists(store.as_ref(), "Migrations")
            .await
            .unwrap();
        assert!(!table_exists(migration.definition(), store.as_ref()).await.unwrap());
    }

    #[tokio::test]
    async fn test_should_update_throughput() {
        let store = Arc::new(MemoryStore::with_transition_polls(1));
        let migration = migration(store.clone());
        migration.create(&MigrationOptions::provisioned(1, 1)).await.unwrap();
        migration.wait_until_available().await.unwrap();

        migration.update(&MigrationOptions::provisioned(2, 4)).await.unwrap();
        migration.wait_until_available().await.unwrap();
        assert_eq!(
            provisioned_throughput(migration.definition(), store.as_ref())
                .await
                .unwrap(),
            ProvisionedThroughput::new(2, 4)
        );
    }

    #[tokio::test]
    async fn test_should_validate_options() {
        let migration = migration(Arc::new(MemoryStore::new()));
        assert!(matches!(
            migration.create(&MigrationOptions::default()).await,
            Err(RecordError::InvalidOptions(_))
        ));
        let both = MigrationOptions {
            billing_mode: Some(BillingMode::PayPerRequest),
            ..MigrationOptions::provisioned(1, 1)
        };
        assert!(matches!(
            migration.create(&both).await,
            Err(RecordError::InvalidOptions(_))
        ));
        assert!(matches!(
            migration.update(&MigrationOptions::default()).await,
            Err(RecordError::InvalidOptions(_))
        ));
    }

    #[tokio::test]
    async fn test_should_answer_model_queries() {
        let def = model();
        let store = MemoryStore::new();
        assert_eq!(query_model(&def, &store, "hash_key").await.unwrap(), json!("id"));
        assert_eq!(query_model(&def, &store, "range_key").await.unwrap(), json!("at"));
        assert_eq!(
            query_model(&def, &store, "table_exists?").await.unwrap(),
            json!(false)
        );
        assert!(matches!(
            query_model(&def, &store, "scan").await,
            Err(RecordError::UnknownModelMethod(_))
        ));
    }

    #[test]
    fn test_should_parse_fixture_options() {
        let opts: MigrationOptions = serde_json::from_str(
            r#"{"provisioned_throughput": {"read_capacity_units": 1, "write_capacity_units": 1}}"#,
        )
        .unwrap();
        assert_eq!(opts, MigrationOptions::provisioned(1, 1));
        assert!(serde_json::from_str::<MigrationOptions>(r#"{"gsi": []}"#).is_err());
    }
}
