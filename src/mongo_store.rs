//! MongoDB-backed [`DocumentStore`] implementation.
//!
//! Maps each store operation onto the driver: full replacement inserts
//! into a uniquely named staging collection and renames it over the
//! destination with `dropTarget`, views are registered with
//! `create_collection(..).view_on(..).pipeline(..)` and one `$lookup`
//! stage per join step.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::{Client, Database};
use tabsync_core::store::DocumentStore;
use tabsync_core::{JoinSpec, Record};
use tracing::debug;
use uuid::Uuid;

const STAGING_MARKER: &str = "__staging_";

/// MongoDB implementation of the [`DocumentStore`] trait.
///
/// Holds the client for the whole run; [`DocumentStore::close`] shuts it
/// down.
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub fn new(client: Client, db_name: &str) -> Self {
        let db = client.database(db_name);
        Self { client, db }
    }
}

/// The `$lookup` pipeline that computes a view.
pub fn lookup_pipeline(spec: &JoinSpec) -> Vec<Document> {
    spec.lookups
        .iter()
        .map(|step| {
            doc! {
                "$lookup": {
                    "from": step.from.as_str(),
                    "localField": step.local_field.as_str(),
                    "foreignField": step.foreign_field.as_str(),
                    "as": step.as_field.as_str(),
                }
            }
        })
        .collect()
}

fn to_documents(records: Vec<Record>) -> Result<Vec<Document>> {
    records
        .iter()
        .map(|r| bson::to_document(r).context("Failed to convert record to BSON"))
        .collect()
}

fn to_record(document: Document) -> Record {
    match Bson::Document(document).into_relaxed_extjson() {
        serde_json::Value::Object(map) => map,
        _ => Record::new(),
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn list_collections(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .db
            .list_collection_names()
            .await?
            .into_iter()
            .filter(|n| !n.starts_with("system.") && !n.contains(STAGING_MARKER))
            .collect();
        names.sort();
        Ok(names)
    }

    async fn replace_collection(&self, name: &str, documents: Vec<Record>) -> Result<u64> {
        let staging = format!("{}{}{}", name, STAGING_MARKER, Uuid::new_v4().simple());
        let docs = to_documents(documents)?;
        let count = docs.len() as u64;

        self.db
            .create_collection(staging.as_str())
            .await
            .with_context(|| format!("Failed to create staging collection '{}'", staging))?;
        debug!(collection = name, staging = %staging, count, "staging documents");

        let staged = self.db.collection::<Document>(&staging);
        if !docs.is_empty() {
            if let Err(e) = staged.insert_many(docs).await {
                let _ = staged.drop().await;
                return Err(e).with_context(|| format!("Failed to stage documents for '{}'", name));
            }
        }

        let db_name = self.db.name();
        let rename = doc! {
            "renameCollection": format!("{}.{}", db_name, staging),
            "to": format!("{}.{}", db_name, name),
            "dropTarget": true,
        };
        if let Err(e) = self.client.database("admin").run_command(rename).await {
            let _ = staged.drop().await;
            return Err(e).with_context(|| format!("Failed to swap staged content into '{}'", name));
        }
        Ok(count)
    }

    async fn insert_documents(&self, name: &str, documents: Vec<Record>) -> Result<u64> {
        let docs = to_documents(documents)?;
        if docs.is_empty() {
            return Ok(0);
        }
        let result = self
            .db
            .collection::<Document>(name)
            .insert_many(docs)
            .await?;
        Ok(result.inserted_ids.len() as u64)
    }

    async fn read_collection(&self, name: &str) -> Result<Vec<Record>> {
        let cursor = self.db.collection::<Document>(name).find(doc! {}).await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(to_record).collect())
    }

    async fn count_documents(&self, name: &str) -> Result<u64> {
        Ok(self
            .db
            .collection::<Document>(name)
            .count_documents(doc! {})
            .await?)
    }

    async fn drop_object(&self, name: &str) -> Result<bool> {
        let existed = self.list_collections().await?.iter().any(|n| n == name);
        if existed {
            self.db.collection::<Document>(name).drop().await?;
        }
        Ok(existed)
    }

    async fn create_view(&self, name: &str, spec: &JoinSpec) -> Result<()> {
        let pipeline = lookup_pipeline(spec);
        debug!(view = name, base = %spec.base, stages = pipeline.len(), "creating view");
        self.db
            .create_collection(name)
            .view_on(spec.base.clone())
            .pipeline(pipeline)
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.client.clone().shutdown().await;
        Ok(())
    }
}
