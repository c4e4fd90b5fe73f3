//! Step definitions for record, fixture and migration scenarios.

use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use cucumber::gherkin::Step;
use cucumber::{World, given, then, when};
use dynarecord_core::assert::{
    assert_attributes_equal, assert_item_absent, assert_item_present, key_from_pairs, values_equal,
};
use dynarecord_core::migration::{query_model, table_exists};
use dynarecord_core::{
    AttributeRow, HarnessConfig, MigrationOptions, ModelDefinition, ModelInstance, TableMigration,
    TableRow,
};
use dynarecord_features::{RecordWorld, ScenarioContext, init_tracing};
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{error, warn};

/// Parse the step's doc string as JSON.
fn doc<T: DeserializeOwned>(step: &Step) -> Result<T> {
    let text = step
        .docstring
        .as_deref()
        .with_context(|| format!("step '{}' needs a doc string", step.value))?;
    serde_json::from_str(text).with_context(|| format!("invalid JSON in doc string of '{}'", step.value))
}

// ---------------------------------------------------------------------------
// Fixtures and models
// ---------------------------------------------------------------------------

#[given(regex = r"^a DynamoDB table named '([^']*)' with data:$")]
async fn table_with_data(world: &mut RecordWorld, base_name: String, step: &Step) -> Result<()> {
    let rows: Vec<TableRow> = doc(step)?;
    let ctx = world.ctx()?;
    let fixture = ctx
        .fixtures
        .create_table(&base_name, &rows)
        .await
        .with_context(|| format!("creating fixture table {base_name}"))?;
    ctx.table_name = Some(fixture.name);
    Ok(())
}

#[given(regex = r"^an aws-record model with data:$")]
async fn model_with_data(world: &mut RecordWorld, step: &Step) -> Result<()> {
    let rows: Vec<AttributeRow> = doc(step)?;
    let ctx = world.ctx()?;
    let table_name = ctx.table_name_or_default();
    let model = ModelDefinition::from_rows(table_name, &rows).context("defining model")?;
    ctx.model = Some(Arc::new(model));
    Ok(())
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[when(regex = r"^we create a new instance of the model with attribute value pairs:$")]
async fn new_instance(world: &mut RecordWorld, step: &Step) -> Result<()> {
    let pairs: Vec<(String, Value)> = doc(step)?;
    let ctx = world.ctx()?;
    let mut instance = ModelInstance::new(ctx.model()?.clone());
    for (name, value) in &pairs {
        instance
            .set(name, value)
            .with_context(|| format!("setting {name}"))?;
    }
    ctx.instance = Some(instance);
    Ok(())
}

#[when(regex = r"^we save the model instance$")]
async fn save_instance(world: &mut RecordWorld) -> Result<()> {
    let ctx = world.ctx()?;
    let store = ctx.store.clone();
    let instance = ctx.instance.as_mut().context("no model instance")?;
    instance.save(store.as_ref()).await.context("saving model instance")?;
    Ok(())
}

#[then(regex = r"^the DynamoDB table should have an object with key values:$")]
async fn table_has_object(world: &mut RecordWorld, step: &Step) -> Result<()> {
    let pairs: Vec<(String, Value)> = doc(step)?;
    let ctx = world.ctx()?;
    assert_item_present(ctx.store.as_ref(), ctx.table_name()?, key_from_pairs(&pairs)?).await?;
    Ok(())
}

#[given(regex = r"^an item exists in the DynamoDB table with item data:$")]
async fn item_exists(world: &mut RecordWorld, step: &Step) -> Result<()> {
    let data: Value = doc(step)?;
    let ctx = world.ctx()?;
    ctx.fixtures
        .put_item(ctx.table_name()?, &data)
        .await
        .with_context(|| format!("putting fixture item {data}"))?;
    Ok(())
}

#[when(regex = r"^we call the 'find' class method with parameter data:$")]
async fn find_record(world: &mut RecordWorld, step: &Step) -> Result<()> {
    let key: Map<String, Value> = doc(step)?;
    let ctx = world.ctx()?;
    let instance = ModelInstance::find(ctx.model()?.clone(), ctx.store.as_ref(), &key)
        .await
        .context("finding record")?;
    ctx.instance = Some(instance);
    Ok(())
}

#[then(regex = r"^we should receive an aws-record item with attribute data:$")]
async fn record_has_attributes(world: &mut RecordWorld, step: &Step) -> Result<()> {
    let expected: Map<String, Value> = doc(step)?;
    let ctx = world.ctx()?;
    let instance = ctx.instance.as_ref().context("no model instance")?;
    assert_attributes_equal(instance, &expected)?;
    Ok(())
}

#[when(regex = r"^we call 'delete!' on the aws-record item instance$")]
async fn delete_instance(world: &mut RecordWorld) -> Result<()> {
    let ctx = world.ctx()?;
    let store = ctx.store.clone();
    let instance = ctx.instance.as_mut().context("no model instance")?;
    instance.delete(store.as_ref()).await.context("deleting record")?;
    Ok(())
}

#[then(regex = r"^the DynamoDB table should not have an object with key values:$")]
async fn table_lacks_object(world: &mut RecordWorld, step: &Step) -> Result<()> {
    let pairs: Vec<(String, Value)> = doc(step)?;
    let ctx = world.ctx()?;
    assert_item_absent(ctx.store.as_ref(), ctx.table_name()?, key_from_pairs(&pairs)?).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Migrations
// ---------------------------------------------------------------------------

#[when(regex = r"^we create a table migration for the model$")]
async fn create_migration(world: &mut RecordWorld) -> Result<()> {
    let ctx = world.ctx()?;
    let migration = TableMigration::new(ctx.model()?.clone(), ctx.store.clone(), ctx.waiter());
    ctx.migration = Some(migration);
    Ok(())
}

#[when(regex = r"^we call 'create!' with parameters:$")]
async fn migration_create(world: &mut RecordWorld, step: &Step) -> Result<()> {
    let opts: MigrationOptions = doc(step)?;
    let ctx = world.ctx()?;
    ctx.migration()?.create(&opts).await.context("creating table")?;
    Ok(())
}

#[then(regex = r"^eventually the table should exist in DynamoDB$")]
async fn eventually_exists(world: &mut RecordWorld) -> Result<()> {
    let ctx = world.ctx()?;
    ctx.waiter()
        .until_table_exists(ctx.store.as_ref(), ctx.table_name()?)
        .await?;
    Ok(())
}

#[then(regex = r#"^calling 'table_exists\?' on the model should return "([^"]*)"$"#)]
async fn table_exists_returns(world: &mut RecordWorld, expected: String) -> Result<()> {
    let expected = expected != "false";
    let ctx = world.ctx()?;
    let actual = table_exists(ctx.model()?, ctx.store.as_ref()).await?;
    ensure!(actual == expected, "table_exists? returned {actual}, expected {expected}");
    Ok(())
}

#[when(regex = r"^we call 'delete!' on the migration$")]
async fn migration_delete(world: &mut RecordWorld) -> Result<()> {
    let ctx = world.ctx()?;
    ctx.migration()?.delete().await.context("deleting table")?;
    Ok(())
}

#[then(regex = r"^eventually the table should not exist in DynamoDB$")]
async fn eventually_gone(world: &mut RecordWorld) -> Result<()> {
    let ctx = world.ctx()?;
    ctx.waiter()
        .until_table_not_exists(ctx.store.as_ref(), ctx.table_name()?)
        .await?;
    Ok(())
}

#[when(regex = r"^we call 'wait_until_available' on the migration$")]
async fn migration_wait(world: &mut RecordWorld) -> Result<()> {
    let ctx = world.ctx()?;
    ctx.migration()?.wait_until_available().await?;
    Ok(())
}

#[when(regex = r"^we call 'update!' on the migration with parameters:$")]
async fn migration_update(world: &mut RecordWorld, step: &Step) -> Result<()> {
    let opts: MigrationOptions = doc(step)?;
    let ctx = world.ctx()?;
    ctx.migration()?.update(&opts).await.context("updating table")?;
    ctx.waiter()
        .until_table_exists(ctx.store.as_ref(), ctx.table_name()?)
        .await?;
    Ok(())
}

#[then(regex = r#"^calling "([^"]*)" on the model should return:$"#)]
async fn model_query_returns(world: &mut RecordWorld, method: String, step: &Step) -> Result<()> {
    let expected: Value = doc(step)?;
    let ctx = world.ctx()?;
    let actual = query_model(ctx.model()?, ctx.store.as_ref(), &method).await?;
    ensure!(
        values_equal(&actual, &expected),
        "{method} returned {actual}, expected {expected}"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

fn has_cleanup_tag(tags: &[String]) -> bool {
    tags.iter()
        .map(|t| t.trim_start_matches('@'))
        .any(|t| t == "item" || t == "table")
}

#[tokio::main]
async fn main() {
    let config = match HarnessConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            std::process::exit(2);
        }
    };
    init_tracing(&config.log_level);

    RecordWorld::cucumber()
        .before(move |_feature, _rule, _scenario, world| {
            let config = config.clone();
            async move {
                world.start(ScenarioContext::connect(config).await);
            }
            .boxed_local()
        })
        .after(|feature, _rule, scenario, _ev, world| {
            let cleanup = has_cleanup_tag(&scenario.tags) || has_cleanup_tag(&feature.tags);
            async move {
                let Some(mut ctx) = world.and_then(RecordWorld::finish) else {
                    return;
                };
                if !cleanup {
                    if let Some(table) = &ctx.table_name {
                        warn!(table = %table, "untagged scenario leaves its table behind");
                    }
                    return;
                }
                if let Err(e) = ctx.teardown().await {
                    error!(error = %e, "scenario teardown failed");
                }
            }
            .boxed_local()
        })
        .run_and_exit(concat!(env!("CARGO_MANIFEST_DIR"), "/features"))
        .await;
}
