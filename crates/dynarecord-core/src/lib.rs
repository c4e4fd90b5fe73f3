//! Schema-driven records, table fixtures and table migrations over DynamoDB.
//!
//! Everything talks to the database through [`store::TableStore`], so the same
//! record and migration code runs against a live endpoint ([`DynamoClient`]) or
//! in-process (`MemoryStore`, behind the `memory` feature).
#![allow(clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod assert;
pub mod config;
pub mod error;
pub mod fixture;
mod marshal;
pub mod migration;
pub mod record;
pub mod schema;
pub mod store;
pub mod waiter;

pub use config::{Backend, HarnessConfig};
pub use error::{RecordError, RecordResult};
pub use fixture::{FixtureManager, TableFixture, TableRow};
pub use migration::{MigrationOptions, TableMigration};
pub use record::{ModelInstance, SaveOptions};
pub use schema::{AttributeKind, AttributeRow, AttributeSpec, ModelDefinition};
pub use store::{DynamoClient, TableStore};
#[cfg(any(test, feature = "memory"))]
pub use store::MemoryStore;
pub use waiter::Waiter;
