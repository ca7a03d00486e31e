//! Feature Matrix

use crate::error::ValidationError;

/// Client-supplied feature rows, one row per item to score.
///
/// Always holds at least one row and every row holds at least one value.
/// Rows are not required to share a width; see
/// [`ValidationConfig`](crate::ValidationConfig) for that check.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Build a matrix from raw rows
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self, ValidationError> {
        if rows.is_empty() {
            return Err(ValidationError::NoFeatures);
        }
        if let Some(row) = rows.iter().position(|r| r.is_empty()) {
            return Err(ValidationError::EmptyRow { row });
        }
        Ok(Self { rows })
    }

    /// Rows in input order
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Shared row width, or `None` when rows are jagged
    pub fn width(&self) -> Option<usize> {
        let first = self.rows[0].len();
        self.rows
            .iter()
            .all(|r| r.len() == first)
            .then_some(first)
    }

    /// Total number of values across all rows
    pub fn value_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }
}
