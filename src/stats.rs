//! Store overview.
//!
//! Lists every collection and view in the target database with its
//! document count. Used by `tabsync stats` to confirm what a run wrote.

use anyhow::Result;
use tabsync_core::store::DocumentStore;

/// Name and document count of one stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionStats {
    pub name: String,
    pub documents: u64,
}

pub async fn collect_stats(store: &dyn DocumentStore) -> Result<Vec<CollectionStats>> {
    let mut out = Vec::new();
    for name in store.list_collections().await? {
        let documents = store.count_documents(&name).await?;
        out.push(CollectionStats { name, documents });
    }
    Ok(out)
}

/// Run the stats command: count every object and print a summary.
pub async fn run_stats(database: &str, store: &dyn DocumentStore) -> Result<()> {
    let stats = collect_stats(store).await?;
    let total: u64 = stats.iter().map(|s| s.documents).sum();

    println!("tabsync - store stats");
    println!("=====================");
    println!();
    println!("  Database:    {}", database);
    println!("  Objects:     {}", stats.len());
    println!("  Documents:   {}", total);

    if !stats.is_empty() {
        println!();
        println!("  {:<36} {:>10}", "COLLECTION", "DOCUMENTS");
        println!("  {}", "-".repeat(47));
        for s in &stats {
            println!("  {:<36} {:>10}", s.name, s.documents);
        }
    }

    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabsync_core::store::memory::InMemoryStore;
    use tabsync_core::{JoinSpec, LookupStep};

    #[tokio::test]
    async fn counts_collections_and_views() {
        let store = InMemoryStore::new();
        let doc = json!({"id": 1}).as_object().unwrap().clone();
        store
            .replace_collection("a", vec![doc.clone(), doc.clone()])
            .await
            .unwrap();
        store.replace_collection("b", vec![doc]).await.unwrap();
        store
            .create_view(
                "a_view",
                &JoinSpec {
                    base: "a".into(),
                    lookups: vec![LookupStep::new("b", "id", "id", "bs")],
                },
            )
            .await
            .unwrap();

        let stats = collect_stats(&store).await.unwrap();
        let find = |n: &str| stats.iter().find(|s| s.name == n).unwrap().documents;
        assert_eq!(stats.len(), 3);
        assert_eq!(find("a"), 2);
        assert_eq!(find("b"), 1);
        assert_eq!(find("a_view"), 2);
    }
}
