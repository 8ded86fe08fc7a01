//! Domain model for the conversion pipeline.
//!
//! - [`InvoiceTable`] - An ordered table of invoice rows, all cells as text

use serde::{Deserialize, Serialize};

use crate::error::{TransformError, TransformResult};

// =============================================================================
// Invoice Table
// =============================================================================

/// One parsed Comprobantes file.
///
/// Columns are kept in file order and every row holds exactly one cell per
/// column. Cells stay as text so amounts keep whatever decimal and thousands
/// punctuation the source used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl InvoiceTable {
    /// Build a table, padding short rows with empty cells and cutting long ones.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Position of the first column with this name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Values of a column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }

    /// Remove every column with this name. Returns whether anything was removed.
    pub fn drop_column(&mut self, name: &str) -> bool {
        let keep: Vec<bool> = self.headers.iter().map(|h| h != name).collect();
        if keep.iter().all(|k| *k) {
            return false;
        }
        self.retain_columns(&keep);
        true
    }

    /// Append a column built from one value per row.
    ///
    /// Replaces the values in place when the column already exists.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) {
        debug_assert_eq!(values.len(), self.rows.len());
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
    }

    /// Rename the first column called `from`. Returns whether it existed.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.column_index(from) {
            Some(idx) => {
                self.headers[idx] = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Keep exactly the given columns, in the given order.
    ///
    /// Fails on the first requested name that is not present.
    pub fn select(&self, names: &[String]) -> TransformResult<InvoiceTable> {
        let indices = names
            .iter()
            .map(|n| {
                self.column_index(n)
                    .ok_or_else(|| TransformError::MissingColumn {
                        column: n.clone(),
                        available: self.headers.clone(),
                    })
            })
            .collect::<TransformResult<Vec<usize>>>()?;

        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(InvoiceTable {
            headers: names.to_vec(),
            rows,
        })
    }

    /// Apply `f` to every cell of a column. Returns whether the column existed.
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> bool
    where
        F: FnMut(&str) -> String,
    {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        true
    }

    fn retain_columns(&mut self, keep: &[bool]) {
        let mut flags = keep.iter();
        self.headers.retain(|_| *flags.next().unwrap_or(&true));
        for row in &mut self.rows {
            let mut flags = keep.iter();
            row.retain(|_| *flags.next().unwrap_or(&true));
        }
    }
}
