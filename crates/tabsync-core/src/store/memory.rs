//! In-memory [`DocumentStore`] implementation for tests and dry runs.
//!
//! Collections are `Vec`s of documents in a `HashMap` behind
//! `std::sync::RwLock`. Views keep their [`JoinSpec`] and are evaluated on
//! every read, so they always reflect the current collections.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::lookup::{apply_lookups, JoinSpec};
use crate::table::{Record, IDENTITY_FIELD};

use super::DocumentStore;

enum StoredObject {
    Collection(Vec<Record>),
    View(JoinSpec),
}

/// In-memory store for testing.
pub struct InMemoryStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn with_identity(documents: Vec<Record>) -> Vec<Record> {
    documents
        .into_iter()
        .map(|mut doc| {
            if !doc.contains_key(IDENTITY_FIELD) {
                doc.insert(
                    IDENTITY_FIELD.to_string(),
                    Value::String(Uuid::new_v4().to_string()),
                );
            }
            doc
        })
        .collect()
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn list_collections(&self) -> Result<Vec<String>> {
        let objects = self.objects.read().map_err(poisoned)?;
        let mut names: Vec<String> = objects.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn replace_collection(&self, name: &str, documents: Vec<Record>) -> Result<u64> {
        // Staged outside the lock; the swap below is a single insert.
        let staged = with_identity(documents);
        let written = staged.len() as u64;
        let mut objects = self.objects.write().map_err(poisoned)?;
        if let Some(StoredObject::View(_)) = objects.get(name) {
            bail!("'{}' is a view and cannot be replaced by a collection", name);
        }
        objects.insert(name.to_string(), StoredObject::Collection(staged));
        Ok(written)
    }

    async fn insert_documents(&self, name: &str, documents: Vec<Record>) -> Result<u64> {
        let staged = with_identity(documents);
        let written = staged.len() as u64;
        let mut objects = self.objects.write().map_err(poisoned)?;
        match objects
            .entry(name.to_string())
            .or_insert_with(|| StoredObject::Collection(Vec::new()))
        {
            StoredObject::Collection(docs) => docs.extend(staged),
            StoredObject::View(_) => bail!("cannot insert into view '{}'", name),
        }
        Ok(written)
    }

    async fn read_collection(&self, name: &str) -> Result<Vec<Record>> {
        let objects = self.objects.read().map_err(poisoned)?;
        let collection = |n: &str| match objects.get(n) {
            Some(StoredObject::Collection(docs)) => Some(docs.as_slice()),
            _ => None,
        };
        match objects.get(name) {
            Some(StoredObject::Collection(docs)) => Ok(docs.clone()),
            Some(StoredObject::View(spec)) => {
                let base = collection(&spec.base).unwrap_or(&[]);
                Ok(apply_lookups(base, &spec.lookups, collection))
            }
            None => Ok(Vec::new()),
        }
    }

    async fn count_documents(&self, name: &str) -> Result<u64> {
        Ok(self.read_collection(name).await?.len() as u64)
    }

    async fn drop_object(&self, name: &str) -> Result<bool> {
        let mut objects = self.objects.write().map_err(poisoned)?;
        Ok(objects.remove(name).is_some())
    }

    async fn create_view(&self, name: &str, spec: &JoinSpec) -> Result<()> {
        let mut objects = self.objects.write().map_err(poisoned)?;
        if objects.contains_key(name) {
            bail!("object '{}' already exists", name);
        }
        objects.insert(name.to_string(), StoredObject::View(spec.clone()));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::LookupStep;
    use serde_json::json;

    fn doc(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn replace_discards_previous_content() {
        let store = InMemoryStore::new();
        store
            .replace_collection("c", vec![doc(json!({"a": 1})), doc(json!({"a": 2}))])
            .await
            .unwrap();
        store
            .replace_collection("c", vec![doc(json!({"a": 3}))])
            .await
            .unwrap();
        let docs = store.read_collection("c").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["a"], json!(3));
        assert!(docs[0].contains_key("_id"));
    }

    #[tokio::test]
    async fn view_reflects_later_inserts() {
        let store = InMemoryStore::new();
        store
            .replace_collection("info", vec![doc(json!({"Name": "Thor"}))])
            .await
            .unwrap();
        store.replace_collection("stats", vec![]).await.unwrap();
        let spec = JoinSpec {
            base: "info".into(),
            lookups: vec![LookupStep::new("stats", "Name", "Name", "Stats")],
        };
        store.create_view("sheet", &spec).await.unwrap();

        let before = store.read_collection("sheet").await.unwrap();
        assert_eq!(before[0]["Stats"], json!([]));

        store
            .insert_documents("stats", vec![doc(json!({"Name": "Thor", "Power": 9}))])
            .await
            .unwrap();
        let after = store.read_collection("sheet").await.unwrap();
        assert_eq!(after[0]["Stats"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_view_over_existing_name_fails() {
        let store = InMemoryStore::new();
        store.replace_collection("v", vec![]).await.unwrap();
        let spec = JoinSpec {
            base: "x".into(),
            lookups: vec![],
        };
        assert!(store.create_view("v", &spec).await.is_err());
        assert!(store.drop_object("v").await.unwrap());
        store.create_view("v", &spec).await.unwrap();
    }
}
