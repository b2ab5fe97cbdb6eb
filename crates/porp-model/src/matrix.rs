//! Row-major respondent data
//!
//! Row 0 names the data columns; every following row holds one respondent's
//! cells as strings. All rows have the same width as row 0, which is checked
//! on construction so callers can index freely.

use serde::{Deserialize, Serialize};

/// Row width does not match the header row
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    /// Matrix has no header row
    #[error("matrix has no header row")]
    MissingHeader,

    /// A data row differs in width from the header
    #[error("row {row} has {actual} cells, header has {expected}")]
    RaggedRow {
        /// Offending row index
        row: usize,
        /// Header width
        expected: usize,
        /// Width of the offending row
        actual: usize,
    },
}

/// Row-major string matrix with a header row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TabularMatrix {
    rows: Vec<Vec<String>>,
}

impl TabularMatrix {
    /// Build matrix from rows, first row being the header
    ///
    /// # Errors
    /// - `ShapeError::MissingHeader` if `rows` is empty
    /// - `ShapeError::RaggedRow` if any row's width differs from row 0
    pub fn new(rows: Vec<Vec<String>>) -> Result<Self, ShapeError> {
        let width = rows.first().ok_or(ShapeError::MissingHeader)?.len();
        if let Some((row, cells)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(ShapeError::RaggedRow {
                row,
                expected: width,
                actual: cells.len(),
            });
        }
        Ok(Self { rows })
    }

    /// Build matrix from a header and data rows
    ///
    /// # Errors
    /// Returns `ShapeError::RaggedRow` if a data row differs in width.
    pub fn from_parts(header: Vec<String>, data: Vec<Vec<String>>) -> Result<Self, ShapeError> {
        let mut rows = Vec::with_capacity(data.len() + 1);
        rows.push(header);
        rows.extend(data);
        Self::new(rows)
    }

    /// Column names (row 0)
    #[inline]
    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.rows[0]
    }

    /// Data rows (everything after row 0)
    #[inline]
    #[must_use]
    pub fn data_rows(&self) -> &[Vec<String>] {
        &self.rows[1..]
    }

    /// All rows including the header
    #[inline]
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Total row count including the header
    #[inline]
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    #[inline]
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.rows[0].len()
    }

    /// Index of a named column
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header().iter().position(|c| c == name)
    }

    /// Cell at data row `row` (0-based, excluding header) and column `col`
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.data_rows()
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
    }

    /// Consume matrix, returning rows
    #[inline]
    #[must_use]
    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.rows
    }
}

impl<'de> Deserialize<'de> for TabularMatrix {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let rows = Vec::<Vec<String>>::deserialize(deserializer)?;
        Self::new(rows).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<Vec<Vec<String>>> for TabularMatrix {
    type Error = ShapeError;

    fn try_from(rows: Vec<Vec<String>>) -> Result<Self, Self::Error> {
        Self::new(rows)
    }
}
