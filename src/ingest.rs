//! Loader: file to collection, full replace.
//!
//! Each source file is parsed into a [`Table`], given a row-ordinal column,
//! and written as the complete new content of its destination collection.
//! The store swaps the content in one step, so a failed load leaves the
//! previous content in place.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tabsync_core::store::DocumentStore;
use tabsync_core::table::IDENTITY_FIELD;
use tabsync_core::Table;
use tracing::{debug, info, warn};

use crate::config::{Config, UnknownFormatPolicy};
use crate::connector_fs;
use crate::error::SyncError;
use crate::extract;
use crate::models::SourceFile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedCollection {
    pub collection: String,
    pub path: PathBuf,
    pub documents: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(LoadedCollection),
    Skipped(PathBuf),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: Vec<LoadedCollection>,
    pub skipped: Vec<PathBuf>,
}

impl LoadReport {
    pub fn documents_written(&self) -> u64 {
        self.loaded.iter().map(|l| l.documents).sum()
    }

    pub fn print(&self) {
        println!("load");
        for l in &self.loaded {
            println!("  {} <- {} ({} documents)", l.collection, l.path.display(), l.documents);
        }
        println!("  loaded: {} collections", self.loaded.len());
        println!("  documents written: {}", self.documents_written());
        println!("  skipped (unknown format): {}", self.skipped.len());
        println!("ok");
    }
}

/// Parses `source` and fully replaces its destination collection.
///
/// Files without a recognized format are handled by `policy`.
pub async fn load_source(
    store: &dyn DocumentStore,
    source: &SourceFile,
    ordinal_field: &str,
    policy: UnknownFormatPolicy,
) -> Result<LoadOutcome> {
    let format = match source.format {
        Some(f) => f,
        None => {
            match policy {
                UnknownFormatPolicy::Error => {
                    return Err(SyncError::UnknownFormat(source.path.clone()).into())
                }
                UnknownFormatPolicy::Warn => {
                    warn!(path = %source.path.display(), "skipping file with unrecognized format")
                }
                UnknownFormatPolicy::Skip => {
                    debug!(path = %source.path.display(), "skipping file with unrecognized format")
                }
            }
            return Ok(LoadOutcome::Skipped(source.path.clone()));
        }
    };

    let table: Table = extract::read_table(&source.path, format)
        .with_context(|| format!("Failed to parse {}", source.path.display()))?;
    if table.has_column(IDENTITY_FIELD) {
        return Err(SyncError::IdentityCollision(source.path.clone()).into());
    }
    if table.has_column(ordinal_field) {
        return Err(SyncError::OrdinalCollision {
            path: source.path.clone(),
            field: ordinal_field.to_string(),
        }
        .into());
    }
    let table = table.with_ordinal(ordinal_field)?;
    debug!(
        collection = %source.collection,
        columns = table.columns().len(),
        rows = table.len(),
        format = format.as_str(),
        "parsed source"
    );

    let documents = store
        .replace_collection(&source.collection, table.into_records())
        .await
        .with_context(|| format!("Failed to write collection '{}'", source.collection))?;
    info!(collection = %source.collection, documents, "collection replaced");

    Ok(LoadOutcome::Loaded(LoadedCollection {
        collection: source.collection.clone(),
        path: source.path.clone(),
        documents,
    }))
}

/// Loads every configured source in order.
pub async fn run_load(config: &Config, store: &dyn DocumentStore) -> Result<LoadReport> {
    let sources = connector_fs::discover_sources(&config.source)?;
    let mut report = LoadReport::default();

    for source in &sources {
        match load_source(
            store,
            source,
            &config.source.ordinal_field,
            config.source.unknown_format,
        )
        .await?
        {
            LoadOutcome::Loaded(l) => report.loaded.push(l),
            LoadOutcome::Skipped(p) => report.skipped.push(p),
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tabsync_core::store::memory::InMemoryStore;
    use tempfile::TempDir;

    fn csv_source(dir: &TempDir, name: &str, body: &str) -> SourceFile {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        SourceFile::new(path, None)
    }

    #[tokio::test]
    async fn load_appends_ordinal_and_round_trips() {
        let tmp = TempDir::new().unwrap();
        let src = csv_source(&tmp, "characters.csv", "characterID,name\n10,Thor\n11,Loki\n12,Hela\n");
        let store = InMemoryStore::new();

        let outcome = load_source(&store, &src, "index", UnknownFormatPolicy::Warn)
            .await
            .unwrap();
        assert!(matches!(outcome, LoadOutcome::Loaded(ref l) if l.documents == 3));

        let docs = store.read_collection("characters").await.unwrap();
        let mut ordinals: Vec<_> = docs.iter().map(|d| d["index"].clone()).collect();
        ordinals.sort_by_key(|v| v.as_u64());
        assert_eq!(ordinals, vec![json!(0), json!(1), json!(2)]);

        let back = Table::from_documents(docs, "index");
        let original = extract::read_csv(&fs::read(&src.path).unwrap()).unwrap();
        assert_eq!(back.len(), original.len());
        for row in original.rows() {
            assert!(back.rows().contains(row));
        }
    }

    #[tokio::test]
    async fn loading_twice_does_not_duplicate() {
        let tmp = TempDir::new().unwrap();
        let src = csv_source(&tmp, "comics.csv", "comicID,title\n1,A\n2,B\n");
        let store = InMemoryStore::new();
        load_source(&store, &src, "index", UnknownFormatPolicy::Warn).await.unwrap();
        load_source(&store, &src, "index", UnknownFormatPolicy::Warn).await.unwrap();
        assert_eq!(store.count_documents("comics").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unknown_format_follows_policy() {
        let tmp = TempDir::new().unwrap();
        let src = csv_source(&tmp, "notes.json", "{}");
        let store = InMemoryStore::new();

        let skipped = load_source(&store, &src, "index", UnknownFormatPolicy::Skip)
            .await
            .unwrap();
        assert_eq!(skipped, LoadOutcome::Skipped(src.path.clone()));
        assert!(store.list_collections().await.unwrap().is_empty());

        let err = load_source(&store, &src, "index", UnknownFormatPolicy::Error)
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<SyncError>().is_some());
    }

    #[tokio::test]
    async fn parse_failure_leaves_previous_content() {
        let tmp = TempDir::new().unwrap();
        let store = InMemoryStore::new();
        let good = csv_source(&tmp, "sheet.csv", "a\n1\n");
        load_source(&store, &good, "index", UnknownFormatPolicy::Warn).await.unwrap();

        let broken = tmp.path().join("sheet.xlsx");
        fs::write(&broken, "definitely not a zip").unwrap();
        let broken = SourceFile::new(broken, None);
        assert!(load_source(&store, &broken, "index", UnknownFormatPolicy::Warn)
            .await
            .is_err());
        assert_eq!(store.count_documents("sheet").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn ordinal_column_clash_is_reported() {
        let tmp = TempDir::new().unwrap();
        let src = csv_source(&tmp, "clash.csv", "index,name\n0,a\n");
        let store = InMemoryStore::new();
        let err = load_source(&store, &src, "index", UnknownFormatPolicy::Warn)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::OrdinalCollision { .. })
        ));
        assert!(store.list_collections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn identity_column_in_source_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let src = csv_source(&tmp, "ids.csv", "_id,name\n7,a\n");
        let store = InMemoryStore::new();
        let err = load_source(&store, &src, "index", UnknownFormatPolicy::Warn)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::IdentityCollision(p)) if p == &src.path
        ));
        assert!(store.list_collections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn repeated_headers_survive_the_round_trip() {
        let tmp = TempDir::new().unwrap();
        let src = csv_source(&tmp, "stats.csv", "Name,Power,Power\nThor,1,2\nLoki,3,4\n");
        let store = InMemoryStore::new();
        load_source(&store, &src, "index", UnknownFormatPolicy::Warn)
            .await
            .unwrap();

        let back = Table::from_documents(store.read_collection("stats").await.unwrap(), "index");
        assert_eq!(back.len(), 2);
        let thor = back.rows().iter().find(|r| r["Name"] == json!("Thor")).unwrap();
        assert_eq!(thor["Power"], json!(1));
        assert_eq!(thor["Power.1"], json!(2));
    }

    #[tokio::test]
    async fn run_load_reports_skips() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("comics.csv"), "comicID\n1\n").unwrap();
        fs::write(tmp.path().join("readme.md"), "hi").unwrap();
        let mut config = Config::default();
        config.source.dir = tmp.path().to_path_buf();
        config.source.files = vec![
            crate::config::FileSpec { path: "comics.csv".into(), collection: None },
            crate::config::FileSpec { path: "readme.md".into(), collection: None },
        ];
        let store = InMemoryStore::new();
        let report = run_load(&config, &store).await.unwrap();
        assert_eq!(report.loaded.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.documents_written(), 1);
    }
}
