//! Relational merge engine.
//!
//! Combines [`Table`]s on a shared key column with inner, left, right, or
//! full-outer semantics. Every left row pairs with every right row of equal
//! key; unmatched rows on an outer side yield one row with the other side
//! null-filled. The key column is coalesced into a single output column.
//! Other columns present on both sides get `_x` / `_y` suffixes.
//!
//! Null keys never match anything, including other null keys.

use std::collections::HashMap;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::table::{key_of, Record, Table};

const LEFT_SUFFIX: &str = "_x";
const RIGHT_SUFFIX: &str = "_y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinHow {
    Inner,
    Left,
    Right,
    #[serde(alias = "full")]
    Outer,
}

impl JoinHow {
    fn keeps_left(self) -> bool {
        matches!(self, JoinHow::Left | JoinHow::Outer)
    }

    fn keeps_right(self) -> bool {
        matches!(self, JoinHow::Right | JoinHow::Outer)
    }
}

impl std::fmt::Display for JoinHow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JoinHow::Inner => "inner",
            JoinHow::Left => "left",
            JoinHow::Right => "right",
            JoinHow::Outer => "outer",
        };
        f.write_str(s)
    }
}

/// A materialized join: `tables[0]` merged with `tables[1]` on `on[0]`,
/// that result merged with `tables[2]` on `on[1]`, and so on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergePlan {
    /// Destination collection for the merged table.
    pub output: String,
    pub tables: Vec<String>,
    pub on: Vec<String>,
    pub how: JoinHow,
}

impl MergePlan {
    pub fn validate(&self) -> Result<()> {
        if self.tables.len() < 2 {
            bail!("merge '{}' needs at least two tables", self.output);
        }
        if self.on.len() != self.tables.len() - 1 {
            bail!(
                "merge '{}' joins {} tables and needs {} keys, got {}",
                self.output,
                self.tables.len(),
                self.tables.len() - 1,
                self.on.len()
            );
        }
        Ok(())
    }
}

/// Output column layout for one merge.
struct Layout {
    columns: Vec<String>,
    /// (source column, output column) for the left side, key excluded.
    left: Vec<(String, String)>,
    right: Vec<(String, String)>,
}

fn layout(left: &Table, right: &Table, on: &str) -> Layout {
    let mut columns = Vec::new();
    let mut left_map = Vec::new();
    let mut right_map = Vec::new();

    for col in left.columns() {
        if col == on {
            columns.push(col.clone());
            continue;
        }
        let out = if right.has_column(col) {
            format!("{}{}", col, LEFT_SUFFIX)
        } else {
            col.clone()
        };
        columns.push(out.clone());
        left_map.push((col.clone(), out));
    }
    if !left.has_column(on) {
        columns.insert(0, on.to_string());
    }
    for col in right.columns() {
        if col == on {
            continue;
        }
        let out = if left.has_column(col) {
            format!("{}{}", col, RIGHT_SUFFIX)
        } else {
            col.clone()
        };
        columns.push(out.clone());
        right_map.push((col.clone(), out));
    }

    Layout {
        columns,
        left: left_map,
        right: right_map,
    }
}

fn combine(layout: &Layout, on: &str, left: Option<&Record>, right: Option<&Record>) -> Record {
    let mut row = Record::with_capacity(layout.columns.len());
    let key = left
        .and_then(|l| l.get(on))
        .filter(|v| !v.is_null())
        .or_else(|| right.and_then(|r| r.get(on)))
        .cloned()
        .unwrap_or(Value::Null);

    for column in &layout.columns {
        row.insert(column.clone(), Value::Null);
    }
    row.insert(on.to_string(), key);
    for (src, out) in &layout.left {
        if let Some(v) = left.and_then(|l| l.get(src)) {
            row.insert(out.clone(), v.clone());
        }
    }
    for (src, out) in &layout.right {
        if let Some(v) = right.and_then(|r| r.get(src)) {
            row.insert(out.clone(), v.clone());
        }
    }
    row
}

/// Merges two tables on the shared column `on`.
pub fn merge(left: &Table, right: &Table, on: &str, how: JoinHow) -> Result<Table> {
    // An empty table may carry no header at all; only reject a missing key
    // when there are rows that should have had it.
    if !left.has_column(on) && !left.is_empty() {
        bail!("left table has no key column '{}'", on);
    }
    if !right.has_column(on) && !right.is_empty() {
        bail!("right table has no key column '{}'", on);
    }

    let layout = layout(left, right, on);

    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, row) in right.rows().iter().enumerate() {
        if let Some(k) = row.get(on).and_then(key_of) {
            index.entry(k).or_default().push(i);
        }
    }

    let mut out = Table::new(layout.columns.clone());
    let mut right_matched = vec![false; right.len()];

    for l in left.rows() {
        let matches = l
            .get(on)
            .and_then(key_of)
            .and_then(|k| index.get(&k))
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        if matches.is_empty() {
            if how.keeps_left() {
                out.push_row(combine(&layout, on, Some(l), None));
            }
            continue;
        }
        for &r in matches {
            right_matched[r] = true;
            out.push_row(combine(&layout, on, Some(l), Some(&right.rows()[r])));
        }
    }

    if how.keeps_right() {
        for (r, matched) in right_matched.iter().enumerate() {
            if !matched {
                out.push_row(combine(&layout, on, None, Some(&right.rows()[r])));
            }
        }
    }

    Ok(out)
}

/// Folds [`merge`] over a chain of tables, `keys[i]` joining the running
/// result with `tables[i + 1]`.
pub fn merge_chain(tables: &[Table], keys: &[String], how: JoinHow) -> Result<Table> {
    let (first, rest) = match tables.split_first() {
        Some(split) => split,
        None => bail!("nothing to merge"),
    };
    if keys.len() != rest.len() {
        bail!(
            "{} tables need {} join keys, got {}",
            tables.len(),
            rest.len(),
            keys.len()
        );
    }
    let mut acc = first.clone();
    for (table, key) in rest.iter().zip(keys) {
        acc = merge(&acc, table, key, how)?;
    }
    Ok(acc)
}
