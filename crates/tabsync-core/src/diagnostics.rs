//! Link-table coverage diagnostics.
//!
//! Before merging two entity tables through a linking table, these counts
//! show how much of each side the link actually covers and how many link
//! rows point at entities that do not exist. They never alter a merge.

use std::collections::HashSet;

use anyhow::{bail, Result};

use crate::table::{key_of, Table};

/// Distinct-key set differences between two entity tables and the table
/// linking them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkageReport {
    /// Left entities whose key never appears in the link table.
    pub left_unlinked: usize,
    /// Right entities whose key never appears in the link table.
    pub right_unlinked: usize,
    /// Link references to left keys missing from the left table.
    pub dangling_left: usize,
    /// Link references to right keys missing from the right table.
    pub dangling_right: usize,
}

fn key_set(table: &Table, column: &str, label: &str) -> Result<HashSet<String>> {
    if !table.has_column(column) && !table.is_empty() {
        bail!("{} table has no key column '{}'", label, column);
    }
    Ok(table.column_values(column).filter_map(key_of).collect())
}

/// Computes the four coverage counts. The link table must carry both
/// `left_key` and `right_key`.
pub fn linkage_report(
    left: &Table,
    left_key: &str,
    right: &Table,
    right_key: &str,
    link: &Table,
) -> Result<LinkageReport> {
    let left_keys = key_set(left, left_key, "left")?;
    let right_keys = key_set(right, right_key, "right")?;
    let link_left = key_set(link, left_key, "link")?;
    let link_right = key_set(link, right_key, "link")?;

    Ok(LinkageReport {
        left_unlinked: left_keys.difference(&link_left).count(),
        right_unlinked: right_keys.difference(&link_right).count(),
        dangling_left: link_left.difference(&left_keys).count(),
        dangling_right: link_right.difference(&right_keys).count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn table(rows: Value) -> Table {
        Table::from_records(
            rows.as_array()
                .unwrap()
                .iter()
                .map(|r| r.as_object().cloned().unwrap())
                .collect(),
        )
    }

    #[test]
    fn counts_unlinked_entities_on_both_sides() {
        let characters = table(json!([{"characterID": "A"}, {"characterID": "B"}, {"characterID": "C"}]));
        let comics = table(json!([{"comicID": "X"}, {"comicID": "Y"}]));
        let links = table(json!([{"comicID": "X", "characterID": "A"}]));

        let report = linkage_report(&comics, "comicID", &characters, "characterID", &links).unwrap();
        assert_eq!(report.left_unlinked, 1);
        assert_eq!(report.right_unlinked, 2);
        assert_eq!(report.dangling_left, 0);
        assert_eq!(report.dangling_right, 0);
    }

    #[test]
    fn counts_dangling_link_references() {
        let comics = table(json!([{"comicID": 1}]));
        let characters = table(json!([{"characterID": 7}]));
        let links = table(json!([
            {"comicID": 1, "characterID": 7},
            {"comicID": 2, "characterID": 8},
            {"comicID": 3, "characterID": 8}
        ]));
        let report = linkage_report(&comics, "comicID", &characters, "characterID", &links).unwrap();
        assert_eq!(report.dangling_left, 2);
        assert_eq!(report.dangling_right, 1);
    }

    #[test]
    fn link_without_key_column_is_an_error() {
        let comics = table(json!([{"comicID": 1}]));
        let characters = table(json!([{"characterID": 7}]));
        let links = table(json!([{"comicID": 1}]));
        assert!(linkage_report(&comics, "comicID", &characters, "characterID", &links).is_err());
    }
}
