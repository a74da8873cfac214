//! Uniform in-memory tabular representation.
//!
//! A [`Table`] is an ordered list of records plus the ordered set of column
//! names seen across them. Cells are plain JSON scalars; a column may hold
//! mixed types. Tables are produced by the file parsers and by reading a
//! collection back from the store, and consumed by the loader and the merge
//! engine.

use anyhow::{bail, Result};
use serde_json::{Map, Value};

/// One row: column name to scalar value, in column order.
pub type Record = Map<String, Value>;

/// Field the store assigns as document identity.
pub const IDENTITY_FIELD: &str = "_id";

/// Default name of the synthetic row-ordinal column appended on load.
pub const DEFAULT_ORDINAL_FIELD: &str = "index";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl Table {
    /// Empty table with a fixed header.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a table from records, taking the union of their fields in
    /// first-seen order as the header.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in &records {
            for key in record.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        Self {
            columns,
            rows: records,
        }
    }

    /// Rebuilds a table from documents read out of the store, dropping the
    /// identity field and the ordinal field so the original shape returns.
    pub fn from_documents(documents: Vec<Record>, ordinal_field: &str) -> Self {
        let records = documents
            .into_iter()
            .map(|mut doc| {
                doc.shift_remove(IDENTITY_FIELD);
                doc.shift_remove(ordinal_field);
                doc
            })
            .collect();
        Self::from_records(records)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Appends a row. Fields missing from the header are added to it;
    /// header columns missing from the row are filled with null.
    pub fn push_row(&mut self, mut row: Record) {
        for key in row.keys() {
            if !self.columns.iter().any(|c| c == key) {
                self.columns.push(key.clone());
            }
        }
        let mut ordered = Record::with_capacity(self.columns.len());
        for column in &self.columns {
            let value = row.shift_remove(column).unwrap_or(Value::Null);
            ordered.insert(column.clone(), value);
        }
        self.rows.push(ordered);
    }

    /// Values of one column in row order; null where a row lacks the field.
    pub fn column_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows
            .iter()
            .map(move |row| row.get(name).unwrap_or(&Value::Null))
    }

    /// Appends a column holding each row's zero-based position.
    pub fn with_ordinal(mut self, field: &str) -> Result<Self> {
        if self.has_column(field) {
            bail!("column '{}' already exists; cannot add row ordinal", field);
        }
        self.columns.push(field.to_string());
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.insert(field.to_string(), Value::from(i as u64));
        }
        Ok(self)
    }

    pub fn into_records(self) -> Vec<Record> {
        self.rows
    }
}

/// Canonical hashable form of a key cell. Null keys have none.
///
/// Integral floats collapse onto integers so `1` and `1.0` join.
pub fn key_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(format!("b:{}", b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(format!("n:{}", i))
            } else if let Some(u) = n.as_u64() {
                Some(format!("n:{}", u))
            } else {
                let f = n.as_f64()?;
                if f.fract() == 0.0 && f.abs() < 9.0e15 {
                    Some(format!("n:{}", f as i64))
                } else {
                    Some(format!("n:{}", f))
                }
            }
        }
        Value::String(s) => Some(format!("s:{}", s)),
        other => Some(format!("j:{}", other)),
    }
}
