//! [`TableStore`] backed by `aws-sdk-dynamodb`.

use std::fmt;

use async_trait::async_trait;
use aws_sdk_dynamodb::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::types as sdk;
use dynarecord_model::input::{CreateTableInput, PutCondition, UpdateTableInput};
use dynarecord_model::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ProvisionedThroughput,
    ScalarAttributeType, TableDescription, TableStatus,
};
use dynarecord_model::{Item, StoreError, StoreErrorCode};
use tracing::debug;

use super::{StoreResult, TableStore};
use crate::config::HarnessConfig;

/// DynamoDB client wrapper.
#[derive(Debug, Clone)]
pub struct DynamoClient {
    client: aws_sdk_dynamodb::Client,
}

impl DynamoClient {
    /// Wrap an existing SDK client.
    #[must_use]
    pub fn new(client: aws_sdk_dynamodb::Client) -> Self {
        Self { client }
    }

    /// Build a client from the harness configuration.
    ///
    /// Uses the default credential chain, or static `test` credentials when
    /// [`HarnessConfig::test_credentials`] is set.
    pub async fn from_config(config: &HarnessConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        if config.test_credentials {
            loader = loader.credentials_provider(Credentials::new(
                "test",
                "test",
                None,
                None,
                "dynarecord",
            ));
        }

        let sdk_config = loader.load().await;
        Self::new(aws_sdk_dynamodb::Client::new(&sdk_config))
    }

    /// The underlying SDK client.
    #[must_use]
    pub fn inner(&self) -> &aws_sdk_dynamodb::Client {
        &self.client
    }
}

#[async_trait]
impl TableStore for DynamoClient {
    async fn create_table(&self, input: CreateTableInput) -> StoreResult<TableDescription> {
        debug!(table = %input.table_name, "CreateTable");

        let attribute_definitions = input
            .attribute_definitions
            .iter()
            .map(to_sdk_attribute_definition)
            .collect::<StoreResult<Vec<_>>>()?;
        let key_schema = input
            .key_schema
            .iter()
            .map(to_sdk_key_schema_element)
            .collect::<StoreResult<Vec<_>>>()?;
        let throughput = input
            .provisioned_throughput
            .as_ref()
            .map(to_sdk_throughput)
            .transpose()?;

        let resp = self
            .client
            .create_table()
            .table_name(&input.table_name)
            .set_attribute_definitions(Some(attribute_definitions))
            .set_key_schema(Some(key_schema))
            .billing_mode(to_sdk_billing_mode(input.billing_mode))
            .set_provisioned_throughput(throughput)
            .send()
            .await
            .map_err(store_error)?;

        resp.table_description()
            .map(from_sdk_table_description)
            .ok_or_else(|| missing_description(&input.table_name))
    }

    async fn update_table(&self, input: UpdateTableInput) -> StoreResult<TableDescription> {
        debug!(table = %input.table_name, "UpdateTable");

        let throughput = input
            .provisioned_throughput
            .as_ref()
            .map(to_sdk_throughput)
            .transpose()?;

        let resp = self
            .client
            .update_table()
            .table_name(&input.table_name)
            .set_billing_mode(input.billing_mode.map(to_sdk_billing_mode))
            .set_provisioned_throughput(throughput)
            .send()
            .await
            .map_err(store_error)?;

        resp.table_description()
            .map(from_sdk_table_description)
            .ok_or_else(|| missing_description(&input.table_name))
    }

    async fn delete_table(&self, table_name: &str) -> StoreResult<()> {
        debug!(table = %table_name, "DeleteTable");
        self.client
            .delete_table()
            .table_name(table_name)
            .send()
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn describe_table(&self, table_name: &str) -> StoreResult<TableDescription> {
        debug!(table = %table_name, "DescribeTable");
        let resp = self
            .client
            .describe_table()
            .table_name(table_name)
            .send()
            .await
            .map_err(store_error)?;

        resp.table()
            .map(from_sdk_table_description)
            .ok_or_else(|| missing_description(table_name))
    }

    async fn put_item(
        &self,
        table_name: &str,
        item: Item,
        condition: Option<PutCondition>,
    ) -> StoreResult<()> {
        debug!(table = %table_name, attributes = item.len(), "PutItem");
        let mut req = self
            .client
            .put_item()
            .table_name(table_name)
            .set_item(Some(item));

        if let Some(PutCondition::AttributeNotExists(attribute)) = condition {
            req = req
                .condition_expression("attribute_not_exists(#key)")
                .expression_attribute_names("#key", attribute);
        }

        req.send().await.map_err(store_error)?;
        Ok(())
    }

    async fn get_item(&self, table_name: &str, key: Item) -> StoreResult<Option<Item>> {
        debug!(table = %table_name, "GetItem");
        let resp = self
            .client
            .get_item()
            .table_name(table_name)
            .set_key(Some(key))
            .consistent_read(true)
            .send()
            .await
            .map_err(store_error)?;

        Ok(resp.item)
    }

    async fn delete_item(&self, table_name: &str, key: Item) -> StoreResult<()> {
        debug!(table = %table_name, "DeleteItem");
        self.client
            .delete_item()
            .table_name(table_name)
            .set_key(Some(key))
            .send()
            .await
            .map_err(store_error)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Classify an SDK error by its service error code.
fn store_error<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: fmt::Debug + Send + Sync + 'static,
{
    let code = err
        .code()
        .map_or(StoreErrorCode::Unknown, StoreErrorCode::from_code);
    let message = err
        .message()
        .map_or_else(|| DisplayErrorContext(&err).to_string(), ToOwned::to_owned);
    StoreError::with_message(code, message).with_source(err)
}

fn build_error(e: aws_sdk_dynamodb::error::BuildError) -> StoreError {
    StoreError::validation(e.to_string()).with_source(e)
}

fn missing_description(table_name: &str) -> StoreError {
    StoreError::with_message(
        StoreErrorCode::Unknown,
        format!("response for table {table_name} carried no table description"),
    )
}

// ---------------------------------------------------------------------------
// Model -> SDK
// ---------------------------------------------------------------------------

fn to_sdk_attribute_definition(def: &AttributeDefinition) -> StoreResult<sdk::AttributeDefinition> {
    let attribute_type = match def.attribute_type {
        ScalarAttributeType::S => sdk::ScalarAttributeType::S,
        ScalarAttributeType::N => sdk::ScalarAttributeType::N,
        ScalarAttributeType::B => sdk::ScalarAttributeType::B,
    };
    sdk::AttributeDefinition::builder()
        .attribute_name(&def.attribute_name)
        .attribute_type(attribute_type)
        .build()
        .map_err(build_error)
}

fn to_sdk_key_schema_element(elem: &KeySchemaElement) -> StoreResult<sdk::KeySchemaElement> {
    let key_type = match elem.key_type {
        KeyType::Hash => sdk::KeyType::Hash,
        KeyType::Range => sdk::KeyType::Range,
    };
    sdk::KeySchemaElement::builder()
        .attribute_name(&elem.attribute_name)
        .key_type(key_type)
        .build()
        .map_err(build_error)
}

fn to_sdk_throughput(pt: &ProvisionedThroughput) -> StoreResult<sdk::ProvisionedThroughput> {
    sdk::ProvisionedThroughput::builder()
        .read_capacity_units(pt.read_capacity_units)
        .write_capacity_units(pt.write_capacity_units)
        .build()
        .map_err(build_error)
}

fn to_sdk_billing_mode(mode: BillingMode) -> sdk::BillingMode {
    match mode {
        BillingMode::Provisioned => sdk::BillingMode::Provisioned,
        BillingMode::PayPerRequest => sdk::BillingMode::PayPerRequest,
    }
}

// ---------------------------------------------------------------------------
// SDK -> Model
// ---------------------------------------------------------------------------

fn from_sdk_table_description(desc: &sdk::TableDescription) -> TableDescription {
    let table_status = desc.table_status().map(|s| match s {
        sdk::TableStatus::Creating => TableStatus::Creating,
        sdk::TableStatus::Active => TableStatus::Active,
        sdk::TableStatus::Deleting => TableStatus::Deleting,
        sdk::TableStatus::Updating => TableStatus::Updating,
        _ => TableStatus::Other,
    });

    let key_schema = desc
        .key_schema()
        .iter()
        .filter_map(|k| {
            let key_type = match k.key_type() {
                sdk::KeyType::Hash => KeyType::Hash,
                sdk::KeyType::Range => KeyType::Range,
                _ => return None,
            };
            Some(KeySchemaElement::new(k.attribute_name(), key_type))
        })
        .collect();

    let attribute_definitions = desc
        .attribute_definitions()
        .iter()
        .filter_map(|a| {
            let attribute_type = match a.attribute_type() {
                sdk::ScalarAttributeType::S => ScalarAttributeType::S,
                sdk::ScalarAttributeType::N => ScalarAttributeType::N,
                sdk::ScalarAttributeType::B => ScalarAttributeType::B,
                _ => return None,
            };
            Some(AttributeDefinition::new(a.attribute_name(), attribute_type))
        })
        .collect();

    let billing_mode = desc
        .billing_mode_summary()
        .and_then(|s| s.billing_mode())
        .and_then(|m| match m {
            sdk::BillingMode::Provisioned => Some(BillingMode::Provisioned),
            sdk::BillingMode::PayPerRequest => Some(BillingMode::PayPerRequest),
            _ => None,
        });

    let provisioned_throughput = desc.provisioned_throughput().map(|pt| {
        ProvisionedThroughput::new(
            pt.read_capacity_units().unwrap_or_default(),
            pt.write_capacity_units().unwrap_or_default(),
        )
    });

    TableDescription {
        table_name: desc.table_name().unwrap_or_default().to_owned(),
        table_status,
        key_schema,
        attribute_definitions,
        billing_mode,
        provisioned_throughput,
    }
}
