//! Imperative join engine: merges collections into a snapshot collection.
//!
//! Unlike a view, the output is computed once and written with the same
//! full-replace contract as the loader. Later changes to the inputs are
//! not reflected until the merge runs again.

use anyhow::{Context, Result};
use tabsync_core::merge::merge_chain;
use tabsync_core::store::DocumentStore;
use tabsync_core::{JoinHow, MergePlan, Table};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedTable {
    pub output: String,
    pub how: JoinHow,
    pub inputs: Vec<(String, usize)>,
    pub rows: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub tables: Vec<MaterializedTable>,
}

impl MergeReport {
    pub fn print(&self) {
        println!("merge");
        for t in &self.tables {
            let inputs: Vec<String> = t
                .inputs
                .iter()
                .map(|(name, rows)| format!("{} ({})", name, rows))
                .collect();
            println!("  {} = {} join of {}: {} rows", t.output, t.how, inputs.join(", "), t.rows);
        }
        println!("  materialized: {}", self.tables.len());
        println!("ok");
    }
}

/// Reads a collection back into its original tabular shape, without the
/// store identity and ordinal fields. `target` names the object that needs
/// it, for the error when the collection is absent.
pub async fn read_table(
    store: &dyn DocumentStore,
    name: &str,
    ordinal_field: &str,
    target: &str,
) -> Result<Table> {
    let existing = store.list_collections().await?;
    if !existing.iter().any(|n| n == name) {
        return Err(SyncError::MissingCollection {
            target: target.to_string(),
            collection: name.to_string(),
        }
        .into());
    }
    let documents = store
        .read_collection(name)
        .await
        .with_context(|| format!("Failed to read collection '{}'", name))?;
    Ok(Table::from_documents(documents, ordinal_field))
}

pub async fn materialize_join(
    store: &dyn DocumentStore,
    plan: &MergePlan,
    ordinal_field: &str,
) -> Result<MaterializedTable> {
    plan.validate()?;

    let mut tables = Vec::with_capacity(plan.tables.len());
    let mut inputs = Vec::with_capacity(plan.tables.len());
    for name in &plan.tables {
        let table = read_table(store, name, ordinal_field, &plan.output).await?;
        debug!(output = %plan.output, input = %name, rows = table.len(), "merge input");
        inputs.push((name.clone(), table.len()));
        tables.push(table);
    }

    let merged = merge_chain(&tables, &plan.on, plan.how)
        .with_context(|| format!("Failed to compute merge '{}'", plan.output))?;
    let columns = merged.columns().len();

    let rows = store
        .replace_collection(&plan.output, merged.into_records())
        .await
        .with_context(|| format!("Failed to write collection '{}'", plan.output))?;
    info!(output = %plan.output, how = %plan.how, rows, columns, "merge materialized");

    Ok(MaterializedTable {
        output: plan.output.clone(),
        how: plan.how,
        inputs,
        rows,
    })
}

/// Runs every configured merge in order.
pub async fn run_merges(config: &Config, store: &dyn DocumentStore) -> Result<MergeReport> {
    let mut report = MergeReport::default();
    for plan in &config.merges {
        report
            .tables
            .push(materialize_join(store, plan, &config.source.ordinal_field).await?);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabsync_core::store::memory::InMemoryStore;
    use tabsync_core::Record;

    fn records(value: serde_json::Value) -> Vec<Record> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    fn plan(how: JoinHow) -> MergePlan {
        MergePlan {
            output: "ab".to_string(),
            tables: vec!["a".to_string(), "b".to_string()],
            on: vec!["id".to_string()],
            how,
        }
    }

    #[tokio::test]
    async fn read_table_strips_identity_and_ordinal() {
        let store = InMemoryStore::new();
        store
            .replace_collection("a", records(json!([{"id": 1, "index": 0}])))
            .await
            .unwrap();
        let table = read_table(&store, "a", "index", "test").await.unwrap();
        assert_eq!(table.columns(), &["id".to_string()]);
        assert_eq!(table.rows()[0]["id"], json!(1));
    }

    #[tokio::test]
    async fn inner_merge_is_written_as_a_collection() {
        let store = InMemoryStore::new();
        store
            .replace_collection(
                "a",
                records(json!([{"id": 1, "x": "a1", "index": 0}, {"id": 2, "x": "a2", "index": 1}])),
            )
            .await
            .unwrap();
        store
            .replace_collection(
                "b",
                records(json!([
                    {"id": 1, "y": "b1", "index": 0},
                    {"id": 1, "y": "b2", "index": 1},
                    {"id": 3, "y": "b3", "index": 2}
                ])),
            )
            .await
            .unwrap();

        let result = materialize_join(&store, &plan(JoinHow::Inner), "index").await.unwrap();
        assert_eq!(result.rows, 2);
        assert_eq!(result.inputs, vec![("a".to_string(), 2), ("b".to_string(), 3)]);

        let docs = store.read_collection("ab").await.unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| d["id"] == json!(1) && !d.contains_key("index")));
    }

    #[tokio::test]
    async fn missing_input_names_collection_and_output() {
        let store = InMemoryStore::new();
        store
            .replace_collection("a", records(json!([{"id": 1}])))
            .await
            .unwrap();
        let err = materialize_join(&store, &plan(JoinHow::Left), "index")
            .await
            .unwrap_err();
        match err.downcast_ref::<SyncError>() {
            Some(SyncError::MissingCollection { target, collection }) => {
                assert_eq!(target, "ab");
                assert_eq!(collection, "b");
            }
            other => panic!("expected missing collection, got {:?}", other),
        }
        assert!(!store.list_collections().await.unwrap().contains(&"ab".to_string()));
    }

    #[tokio::test]
    async fn rerunning_replaces_the_snapshot() {
        let store = InMemoryStore::new();
        store
            .replace_collection("a", records(json!([{"id": 1}])))
            .await
            .unwrap();
        store
            .replace_collection("b", records(json!([{"id": 1, "y": 0}])))
            .await
            .unwrap();
        materialize_join(&store, &plan(JoinHow::Left), "index").await.unwrap();
        materialize_join(&store, &plan(JoinHow::Left), "index").await.unwrap();
        assert_eq!(store.count_documents("ab").await.unwrap(), 1);
    }
}
