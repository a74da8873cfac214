//! Declarative join engine: registers `$lookup` views.
//!
//! A view is a live query. It stores no documents of its own, so reading
//! it after the backing collections change shows the new content without
//! redefining anything. Views cannot be modified in place; defining one
//! drops whatever object already holds the name.

use anyhow::{Context, Result};
use tabsync_core::store::DocumentStore;
use tracing::info;

use crate::config::{Config, ViewSpec};
use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinedView {
    pub name: String,
    pub base: String,
    pub lookups: usize,
    /// An earlier object under the same name was dropped first.
    pub replaced: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ViewReport {
    pub views: Vec<DefinedView>,
}

impl ViewReport {
    pub fn print(&self) {
        println!("views");
        for v in &self.views {
            println!(
                "  {} over {} ({} lookup{}{})",
                v.name,
                v.base,
                v.lookups,
                if v.lookups == 1 { "" } else { "s" },
                if v.replaced { ", replaced" } else { "" }
            );
        }
        println!("  defined: {}", self.views.len());
        println!("ok");
    }
}

/// Fails with [`SyncError::MissingCollection`] naming the first collection
/// the view reads that the store does not hold.
async fn check_references(store: &dyn DocumentStore, view: &ViewSpec) -> Result<()> {
    let existing = store.list_collections().await?;
    for collection in view.spec.referenced_collections() {
        if !existing.iter().any(|n| n == collection) {
            return Err(SyncError::MissingCollection {
                target: view.name.clone(),
                collection: collection.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

pub async fn define_view(store: &dyn DocumentStore, view: &ViewSpec) -> Result<DefinedView> {
    check_references(store, view).await?;

    let replaced = store.drop_object(&view.name).await?;
    store
        .create_view(&view.name, &view.spec)
        .await
        .with_context(|| format!("Failed to create view '{}'", view.name))?;
    info!(
        view = %view.name,
        base = %view.spec.base,
        lookups = view.spec.lookups.len(),
        replaced,
        "view defined"
    );

    Ok(DefinedView {
        name: view.name.clone(),
        base: view.spec.base.clone(),
        lookups: view.spec.lookups.len(),
        replaced,
    })
}

/// Defines every configured view in order.
pub async fn run_views(config: &Config, store: &dyn DocumentStore) -> Result<ViewReport> {
    let mut report = ViewReport::default();
    for view in &config.views {
        report.views.push(define_view(store, view).await?);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabsync_core::store::memory::InMemoryStore;
    use tabsync_core::{JoinSpec, LookupStep, Record};

    fn records(value: serde_json::Value) -> Vec<Record> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    fn name_view() -> ViewSpec {
        ViewSpec {
            name: "people_view".to_string(),
            spec: JoinSpec {
                base: "people".to_string(),
                lookups: vec![LookupStep::new("scores", "name", "name", "scores")],
            },
        }
    }

    #[tokio::test]
    async fn missing_lookup_collection_is_named() {
        let store = InMemoryStore::new();
        store
            .replace_collection("people", records(json!([{"name": "A"}])))
            .await
            .unwrap();

        let err = define_view(&store, &name_view()).await.unwrap_err();
        match err.downcast_ref::<SyncError>() {
            Some(SyncError::MissingCollection { target, collection }) => {
                assert_eq!(target, "people_view");
                assert_eq!(collection, "scores");
            }
            other => panic!("expected missing collection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_base_collection_is_named() {
        let store = InMemoryStore::new();
        store
            .replace_collection("scores", records(json!([{"name": "A"}])))
            .await
            .unwrap();

        let err = define_view(&store, &name_view()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::MissingCollection { collection, .. }) if collection == "people"
        ));
        assert_eq!(store.list_collections().await.unwrap(), vec!["scores".to_string()]);
    }

    #[tokio::test]
    async fn redefining_replaces_the_previous_view() {
        let store = InMemoryStore::new();
        store
            .replace_collection("people", records(json!([{"name": "A"}, {"name": "B"}])))
            .await
            .unwrap();
        store
            .replace_collection("scores", records(json!([{"name": "A", "score": 3}])))
            .await
            .unwrap();

        let first = define_view(&store, &name_view()).await.unwrap();
        assert!(!first.replaced);
        let second = define_view(&store, &name_view()).await.unwrap();
        assert!(second.replaced);

        let rows = store.read_collection("people_view").await.unwrap();
        assert_eq!(rows.len(), 2);
        let b = rows.iter().find(|r| r["name"] == json!("B")).unwrap();
        assert_eq!(b["scores"], json!([]));
    }
}
