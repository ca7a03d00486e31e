//! Validation Error Types

use thiserror::Error;

/// Errors raised while validating a prediction request.
///
/// Every variant is a client fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// `features` is absent, null, or an empty list
    #[error("No features provided")]
    NoFeatures,

    /// Body is not parseable JSON
    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),

    /// Body parsed, but is not a JSON object
    #[error("Request body must be a JSON object")]
    NotAnObject,

    /// `features` is present but is not a list
    #[error("Features must be a list of rows")]
    NotAList,

    /// A row is not a list
    #[error("Feature row {row} must be a list of numbers")]
    RowNotAList { row: usize },

    /// A row has no values
    #[error("Feature row {row} is empty")]
    EmptyRow { row: usize },

    /// A value is not a JSON number
    #[error("Feature value at row {row}, column {column} is not a number")]
    NonNumeric { row: usize, column: usize },

    /// A row's width differs from the first row's
    #[error("Feature row {row} has {actual} values, expected {expected} like row 0")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// A row's width differs from the configured model width
    #[error("Feature row {row} has {actual} values, model expects {expected}")]
    WidthMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },
}
