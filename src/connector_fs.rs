//! Source file discovery.
//!
//! The configured file list is authoritative: each entry is resolved
//! against `source.dir` and must exist. Only when that list is empty is
//! the directory walked with the include/exclude globs.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::config::SourceConfig;
use crate::error::SyncError;
use crate::models::SourceFile;

pub fn discover_sources(source: &SourceConfig) -> Result<Vec<SourceFile>> {
    if source.files.is_empty() {
        return scan_directory(source);
    }

    let files = source.source_files();
    for file in &files {
        if !file.path.is_file() {
            return Err(SyncError::MissingSource(file.path.clone()).into());
        }
    }
    Ok(files)
}

fn scan_directory(source: &SourceConfig) -> Result<Vec<SourceFile>> {
    let root = &source.dir;
    if !root.exists() {
        bail!("Source directory does not exist: {}", root.display());
    }

    let include_set = build_globset(&source.include_globs)?;
    let exclude_set = build_globset(&source.exclude_globs)?;

    let mut items = Vec::new();
    for entry in WalkDir::new(root).follow_links(source.follow_symlinks) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        items.push(SourceFile::new(path.to_path_buf(), None));
    }

    // Sort for deterministic ordering
    items.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(items)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileSpec;
    use crate::models::SourceFormat;
    use std::fs;
    use tempfile::TempDir;

    fn source_config(dir: &std::path::Path, files: Vec<FileSpec>) -> SourceConfig {
        SourceConfig {
            dir: dir.to_path_buf(),
            files,
            ..SourceConfig::default()
        }
    }

    #[test]
    fn explicit_list_keeps_order_and_unknown_formats() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.csv"), "x\n1\n").unwrap();
        fs::write(tmp.path().join("a.json"), "{}").unwrap();
        let cfg = source_config(
            tmp.path(),
            vec![
                FileSpec { path: "b.csv".into(), collection: None },
                FileSpec { path: "a.json".into(), collection: None },
            ],
        );
        let found = discover_sources(&cfg).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].collection, "b");
        assert_eq!(found[0].format, Some(SourceFormat::Csv));
        assert_eq!(found[1].format, None);
    }

    #[test]
    fn missing_listed_file_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let cfg = source_config(
            tmp.path(),
            vec![FileSpec { path: "nope.csv".into(), collection: None }],
        );
        let err = discover_sources(&cfg).unwrap_err();
        assert!(err.to_string().contains("nope.csv"));
    }

    #[test]
    fn empty_list_walks_directory_with_globs() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("comics.csv"), "comicID\n1\n").unwrap();
        fs::write(tmp.path().join("nested/people.xlsx"), "").unwrap();
        fs::write(tmp.path().join("notes.txt"), "ignore me").unwrap();
        let cfg = SourceConfig {
            exclude_globs: vec!["nested/**".to_string()],
            ..source_config(tmp.path(), vec![])
        };
        let found = discover_sources(&cfg).unwrap();
        let names: Vec<_> = found.iter().map(|s| s.collection.as_str()).collect();
        assert_eq!(names, vec!["comics"]);
    }
}
