//! DynamoDB model types for dynarecord.
//!
//! Hand-written types for the handful of DynamoDB operations the record
//! layer issues, shared by the store implementations and the record layer.
//! Attribute values are the SDK's own [`AttributeValue`].
// "DynamoDB" appears in virtually every doc comment in this crate.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

use std::collections::HashMap;

pub mod error;
pub mod input;
pub mod types;

pub use aws_sdk_dynamodb::types::AttributeValue;
pub use error::{StoreError, StoreErrorCode};

/// A stored item or key: attribute name to value.
pub type Item = HashMap<String, AttributeValue>;
