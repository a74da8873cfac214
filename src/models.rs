//! Core data types that flow from discovery into the loader.

use std::path::{Path, PathBuf};

/// Tabular file formats the loader can parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Comma-delimited text (`.csv`).
    Csv,
    /// Office Open XML workbook (`.xlsx`).
    Xlsx,
}

impl SourceFormat {
    /// Dispatch on the final extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("csv") {
            Some(SourceFormat::Csv)
        } else if ext.eq_ignore_ascii_case("xlsx") {
            Some(SourceFormat::Xlsx)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceFormat::Csv => "csv",
            SourceFormat::Xlsx => "xlsx",
        }
    }
}

/// A discovered input file and where it will be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// `None` when the extension is not recognized.
    pub format: Option<SourceFormat>,
    /// Destination collection.
    pub collection: String,
}

impl SourceFile {
    pub fn new(path: PathBuf, collection: Option<String>) -> Self {
        let format = SourceFormat::from_path(&path);
        let collection = collection.unwrap_or_else(|| collection_name(&path));
        Self {
            path,
            format,
            collection,
        }
    }
}

/// File name without directory or final extension.
pub fn collection_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_name_strips_directory_and_final_extension() {
        assert_eq!(collection_name(Path::new("./data/comics.csv")), "comics");
        assert_eq!(
            collection_name(Path::new("/x/marvel_dc_characters.xlsx")),
            "marvel_dc_characters"
        );
        assert_eq!(collection_name(Path::new("a/b.backup.csv")), "b.backup");
    }

    #[test]
    fn format_dispatch_by_extension() {
        assert_eq!(SourceFormat::from_path(Path::new("a.CSV")), Some(SourceFormat::Csv));
        assert_eq!(SourceFormat::from_path(Path::new("a.xlsx")), Some(SourceFormat::Xlsx));
        assert_eq!(SourceFormat::from_path(Path::new("a.json")), None);
        assert_eq!(SourceFormat::from_path(Path::new("README")), None);
    }

    #[test]
    fn explicit_collection_overrides_stem() {
        let src = SourceFile::new(PathBuf::from("data/charcters_stats.csv"), Some("stats".into()));
        assert_eq!(src.collection, "stats");
        assert_eq!(src.format, Some(SourceFormat::Csv));
    }
}
