//! Mapped records: typed instances of a [`ModelDefinition`] persisted as items.

use std::collections::BTreeMap;
use std::sync::Arc;

use dynarecord_model::Item;
use dynarecord_model::input::PutCondition;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{RecordError, RecordResult};
use crate::schema::{AttributeSpec, ModelDefinition};
use crate::store::TableStore;

/// Options for [`ModelInstance::save_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Overwrite an existing item even if this instance was never persisted.
    pub force: bool,
}

/// One record of a model: exposed attribute name to canonical value.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInstance {
    definition: Arc<ModelDefinition>,
    values: BTreeMap<String, Value>,
    persisted: bool,
    destroyed: bool,
}

impl ModelInstance {
    /// A new, unsaved instance with every attribute unset.
    #[must_use]
    pub fn new(definition: Arc<ModelDefinition>) -> Self {
        Self {
            definition,
            values: BTreeMap::new(),
            persisted: false,
            destroyed: false,
        }
    }

    /// The model this instance belongs to.
    #[must_use]
    pub fn definition(&self) -> &Arc<ModelDefinition> {
        &self.definition
    }

    /// Whether the instance was loaded or saved and not deleted since.
    #[must_use]
    pub fn persisted(&self) -> bool {
        self.persisted
    }

    /// Whether [`delete`](Self::delete) was called on this instance.
    #[must_use]
    pub fn destroyed(&self) -> bool {
        self.destroyed
    }

    /// Cast and assign an attribute. `null` unsets it.
    pub fn set(&mut self, name: &str, value: &Value) -> RecordResult<()> {
        let spec = self.spec(name)?;
        let cast = spec.kind.cast(name, value)?;
        match cast {
            Some(v) => {
                self.values.insert(name.to_owned(), v);
            }
            None => {
                self.values.remove(name);
            }
        }
        Ok(())
    }

    /// The value of an attribute, if set.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// All set attributes as a JSON object keyed by exposed name.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<_, _>>(),
        )
    }

    /// The primary key of this instance, using stored names.
    pub fn key(&self) -> RecordResult<Item> {
        let mut key = Item::new();
        for spec in self.definition.key_attributes() {
            let value = match self.values.get(&spec.name) {
                Some(v) => spec.kind.marshal(v)?,
                None => None,
            }
            .ok_or_else(|| RecordError::KeyMissing {
                attribute: spec.name.clone(),
            })?;
            key.insert(spec.storage_name().to_owned(), value);
        }
        Ok(key)
    }

    /// The full stored item. Unset attributes and empty sets are left out.
    pub fn to_item(&self) -> RecordResult<Item> {
        let mut item = self.key()?;
        for spec in self.definition.attributes() {
            if let Some(value) = self.values.get(&spec.name) {
                if let Some(av) = spec.kind.marshal(value)? {
                    item.insert(spec.storage_name().to_owned(), av);
                }
            }
        }
        Ok(item)
    }

    /// Save the instance.
    ///
    /// An instance that was never persisted must not overwrite an existing
    /// item, so it is written with an `attribute_not_exists` condition on the
    /// hash key and fails with [`RecordError::ConditionalCheckFailed`].
    pub async fn save(&mut self, store: &dyn TableStore) -> RecordResult<()> {
        self.save_with(store, SaveOptions::default()).await
    }

    /// Save with explicit options.
    pub async fn save_with(&mut self, store: &dyn TableStore, opts: SaveOptions) -> RecordResult<()> {
        let item = self.to_item()?;
        let condition = (!self.persisted && !opts.force).then(|| {
            PutCondition::AttributeNotExists(self.definition.hash_key().storage_name().to_owned())
        });
        debug!(table = %self.definition.table_name(), conditional = condition.is_some(), "saving record");
        store
            .put_item(self.definition.table_name(), item, condition)
            .await?;
        self.persisted = true;
        self.destroyed = false;
        Ok(())
    }

    /// Load the record whose key attributes match `key`.
    ///
    /// `key` maps exposed key names to loose values; other entries are
    /// ignored. A missing item is [`RecordError::RecordNotFound`].
    pub async fn find(
        definition: Arc<ModelDefinition>,
        store: &dyn TableStore,
        key: &Map<String, Value>,
    ) -> RecordResult<Self> {
        let mut lookup = Self::new(definition);
        for spec in lookup.definition.clone().key_attributes() {
            let value = key.get(&spec.name).ok_or_else(|| RecordError::KeyMissing {
                attribute: spec.name.clone(),
            })?;
            lookup.set(&spec.name, value)?;
        }
        let key_item = lookup.key()?;

        let table_name = lookup.definition.table_name().to_owned();
        match store.get_item(&table_name, key_item).await? {
            Some(item) => Self::from_item(lookup.definition, &item),
            None => Err(RecordError::RecordNotFound {
                table: table_name,
                key: Value::Object(key.clone()).to_string(),
            }),
        }
    }

    /// Build a persisted instance from a stored item.
    ///
    /// Stored attributes the model does not declare are ignored.
    pub fn from_item(definition: Arc<ModelDefinition>, item: &Item) -> RecordResult<Self> {
        let mut values = BTreeMap::new();
        for spec in definition.attributes() {
            if let Some(stored) = item.get(spec.storage_name()) {
                if let Some(v) = spec.kind.unmarshal(&spec.name, stored)? {
                    values.insert(spec.name.clone(), v);
                }
            }
        }
        Ok(Self {
            definition,
            values,
            persisted: true,
            destroyed: false,
        })
    }

    /// Delete the stored item. Deleting an item that is already gone succeeds.
    pub async fn delete(&mut self, store: &dyn TableStore) -> RecordResult<()> {
        let key = self.key()?;
        store.delete_item(self.definition.table_name(), key).await?;
        debug!(table = %self.definition.table_name(), "deleted record");
        self.persisted = false;
        self.destroyed = true;
        Ok(())
    }

    fn spec(&self, name: &str) -> RecordResult<&AttributeSpec> {
        self.definition
            .attribute(name)
            .ok_or_else(|| RecordError::UnknownAttribute {
                attribute: name.to_owned(),
            })
    }
}
