//! Bounded polling for table readiness and absence.

use std::time::Duration;

use dynarecord_model::StoreErrorCode;
use dynarecord_model::types::TableDescription;
use tracing::{debug, info};

use crate::error::{RecordError, RecordResult};
use crate::store::TableStore;

/// Fixed-delay, fixed-attempt polling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waiter {
    /// Delay between two polls.
    pub delay: Duration,
    /// Number of polls before giving up.
    pub max_attempts: u32,
}

impl Default for Waiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), 25)
    }
}

impl Waiter {
    /// Create a polling policy.
    #[must_use]
    pub fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts,
        }
    }

    /// Poll until the table is `ACTIVE`.
    ///
    /// A missing table is retried, since a freshly created table may not be
    /// visible yet. Any other store error aborts the wait.
    pub async fn until_table_exists(
        &self,
        store: &dyn TableStore,
        table_name: &str,
    ) -> RecordResult<TableDescription> {
        for attempt in 1..=self.max_attempts {
            match store.describe_table(table_name).await {
                Ok(desc) if desc.is_active() => {
                    info!(table = %table_name, attempt, "table is active");
                    return Ok(desc);
                }
                Ok(desc) => {
                    debug!(table = %table_name, attempt, status = ?desc.table_status, "table not active yet");
                }
                Err(e) if e.is(StoreErrorCode::ResourceNotFound) => {
                    debug!(table = %table_name, attempt, "table not visible yet");
                }
                Err(e) => return Err(e.into()),
            }
            self.pause(attempt).await;
        }

        Err(RecordError::ResourceTimeout {
            table: table_name.to_owned(),
            condition: "table_exists",
            attempts: self.max_attempts,
        })
    }

    /// Poll until describing the table reports it missing.
    pub async fn until_table_not_exists(
        &self,
        store: &dyn TableStore,
        table_name: &str,
    ) -> RecordResult<()> {
        for attempt in 1..=self.max_attempts {
            match store.describe_table(table_name).await {
                Err(e) if e.is(StoreErrorCode::ResourceNotFound) => {
                    info!(table = %table_name, attempt, "table is gone");
                    return Ok(());
                }
                Ok(desc) => {
                    debug!(table = %table_name, attempt, status = ?desc.table_status, "table still present");
                }
                Err(e) => return Err(e.into()),
            }
            self.pause(attempt).await;
        }

        Err(RecordError::ResourceTimeout {
            table: table_name.to_owned(),
            condition: "table_not_exists",
            attempts: self.max_attempts,
        })
    }

    async fn pause(&self, attempt: u32) {
        if attempt < self.max_attempts {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use dynarecord_model::input::CreateTableInput;
    use dynarecord_model::types::{
        AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType,
    };

    use super::*;
    use crate::store::MemoryStore;

    fn fast(max_attempts: u32) -> Waiter {
        Waiter::new(Duration::from_millis(1), max_attempts)
    }

    async fn create(store: &MemoryStore, name: &str) {
        store
            .create_table(CreateTableInput {
                table_name: name.to_owned(),
                attribute_definitions: vec![AttributeDefinition::new("pk", ScalarAttributeType::S)],
                key_schema: vec![KeySchemaElement::new("pk", KeyType::Hash)],
                billing_mode: BillingMode::PayPerRequest,
                provisioned_throughput: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_should_wait_for_creating_table() {
        let store = MemoryStore::with_transition_polls(3);
        create(&store, "t").await;

        let desc = fast(5).until_table_exists(&store, "t").await.unwrap();
        assert!(desc.is_active());
    }

    #[tokio::test]
    async fn test_should_time_out_when_attempts_run_out() {
        let store = MemoryStore::with_transition_polls(10);
        create(&store, "t").await;

        let err = fast(3).until_table_exists(&store, "t").await.unwrap_err();
        assert!(matches!(
            err,
            RecordError::ResourceTimeout { condition: "table_exists", attempts: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_should_time_out_waiting_for_missing_table() {
        let store = MemoryStore::new();
        let err = fast(2).until_table_exists(&store, "missing").await.unwrap_err();
        assert!(matches!(err, RecordError::ResourceTimeout { .. }));
    }

    #[tokio::test]
    async fn test_should_detect_absent_table() {
        let store = MemoryStore::new();
        create(&store, "t").await;

        let err = fast(2).until_table_not_exists(&store, "t").await.unwrap_err();
        assert!(matches!(
            err,
            RecordError::ResourceTimeout { condition: "table_not_exists", .. }
        ));

        store.delete_table("t").await.unwrap();
        fast(2).until_table_not_exists(&store, "t").await.unwrap();
    }
}
