//! Scenario state for the dynarecord cucumber suite.
//!
//! Scenarios run against the in-process store by default. Set
//! `DYNARECORD_BACKEND=dynamodb` (and optionally `DYNAMODB_ENDPOINT_URL`) to
//! run them against DynamoDB:
//! ```text
//! DYNARECORD_BACKEND=dynamodb cargo test -p dynarecord-features
//! ```

use std::sync::{Arc, Once};

use anyhow::Context;
use cucumber::World;
use dynarecord_core::fixture::unique_table_name;
use dynarecord_core::{
    Backend, DynamoClient, FixtureManager, HarnessConfig, MemoryStore, ModelDefinition,
    ModelInstance, RecordResult, TableMigration, TableStore, Waiter,
};
use tracing::info;

static INIT: Once = Once::new();

/// Initialize tracing (once), honoring `RUST_LOG` before `log_level`.
pub fn init_tracing(log_level: &str) {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
            )
            .with_test_writer()
            .init();
    });
}

/// Everything one scenario creates, threaded through its steps.
#[derive(Debug)]
pub struct ScenarioContext {
    /// Loaded configuration.
    pub config: HarnessConfig,
    /// Store client shared by every step of the scenario.
    pub store: Arc<dyn TableStore>,
    /// Creates and tears down fixture tables.
    pub fixtures: FixtureManager,
    /// Table the scenario works on, once known.
    pub table_name: Option<String>,
    /// Model defined by the scenario.
    pub model: Option<Arc<ModelDefinition>>,
    /// Record under test.
    pub instance: Option<ModelInstance>,
    /// Migration under test.
    pub migration: Option<TableMigration>,
}

impl ScenarioContext {
    /// Build a context and its store client from `config`.
    pub async fn connect(config: HarnessConfig) -> Self {
        let store: Arc<dyn TableStore> = match config.backend {
            Backend::Memory => Arc::new(MemoryStore::new()),
            Backend::Dynamodb => Arc::new(DynamoClient::from_config(&config).await),
        };
        let fixtures = FixtureManager::new(store.clone(), config.waiter(), config.teardown_max_retries);
        Self {
            config,
            store,
            fixtures,
            table_name: None,
            model: None,
            instance: None,
            migration: None,
        }
    }

    /// Waiter policy from the configuration.
    #[must_use]
    pub fn waiter(&self) -> Waiter {
        self.config.waiter()
    }

    /// The scenario's table.
    pub fn table_name(&self) -> anyhow::Result<&str> {
        self.table_name
            .as_deref()
            .context("no table has been created or named in this scenario")
    }

    /// The scenario's table, naming a fresh one if none exists yet.
    pub fn table_name_or_default(&mut self) -> String {
        self.table_name
            .get_or_insert_with(|| unique_table_name("test_table"))
            .clone()
    }

    /// The scenario's model.
    pub fn model(&self) -> anyhow::Result<&Arc<ModelDefinition>> {
        self.model
            .as_ref()
            .context("no model has been defined in this scenario")
    }

    /// The scenario's migration.
    pub fn migration(&self) -> anyhow::Result<&TableMigration> {
        self.migration
            .as_ref()
            .context("no table migration has been created in this scenario")
    }

    /// Delete the scenario's table, if any.
    pub async fn teardown(&mut self) -> RecordResult<()> {
        if let Some(table_name) = self.table_name.take() {
            self.fixtures.delete_table(&table_name).await?;
            info!(table = %table_name, "scenario teardown finished");
        }
        Ok(())
    }
}

/// Cucumber world: holds the context created by the before hook.
#[derive(Debug, Default, World)]
pub struct RecordWorld {
    ctx: Option<ScenarioContext>,
}

impl RecordWorld {
    /// Install the scenario context.
    pub fn start(&mut self, ctx: ScenarioContext) {
        self.ctx = Some(ctx);
    }

    /// The scenario context.
    pub fn ctx(&mut self) -> anyhow::Result<&mut ScenarioContext> {
        self.ctx
            .as_mut()
            .context("scenario context was not initialized")
    }

    /// Remove the scenario context for teardown.
    pub fn finish(&mut self) -> Option<ScenarioContext> {
        self.ctx.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_should_name_default_table_once() {
        let mut ctx = ScenarioContext::connect(HarnessConfig::default()).await;
        assert!(ctx.table_name().is_err());
        let name = ctx.table_name_or_default();
        assert!(name.starts_with("test_table_"));
        assert_eq!(ctx.table_name_or_default(), name);
    }

    #[tokio::test]
    async fn test_should_tolerate_teardown_without_table() {
        let mut ctx = ScenarioContext::connect(HarnessConfig::default()).await;
        ctx.teardown().await.unwrap();
        ctx.table_name = Some("never_created".to_owned());
        ctx.teardown().await.unwrap();
        assert!(ctx.table_name.is_none());
    }
}
