//! Prediction Request Validator

use crate::error::ValidationError;
use crate::matrix::FeatureMatrix;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Name of the request body field holding the feature rows
pub const FEATURES_FIELD: &str = "features";

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Reject matrices whose rows differ in width
    pub require_uniform_width: bool,
    /// Number of features the hosted model expects per row, if known
    pub expected_width: Option<usize>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            require_uniform_width: true,
            expected_width: None,
        }
    }
}

impl ValidationConfig {
    /// Accept jagged rows and leave shape checks to the backend
    pub fn permissive() -> Self {
        Self {
            require_uniform_width: false,
            expected_width: None,
        }
    }
}

/// Validator for `POST /predict` request bodies
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Parse a raw request body into a feature matrix.
    ///
    /// The body must be a JSON object whose `features` field is a non-empty
    /// list of non-empty lists of numbers.
    pub fn parse_request(&self, body: &[u8]) -> Result<FeatureMatrix, ValidationError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ValidationError::InvalidJson(e.to_string()))?;
        self.parse_value(&value)
    }

    /// Same as [`parse_request`](Self::parse_request), for an already parsed body
    pub fn parse_value(&self, body: &Value) -> Result<FeatureMatrix, ValidationError> {
        let object = body.as_object().ok_or(ValidationError::NotAnObject)?;

        let rows = match object.get(FEATURES_FIELD) {
            None | Some(Value::Null) => return Err(ValidationError::NoFeatures),
            Some(Value::Array(rows)) => rows,
            Some(_) => return Err(ValidationError::NotAList),
        };

        let rows = rows
            .iter()
            .enumerate()
            .map(|(row, value)| parse_row(row, value))
            .collect::<Result<Vec<_>, _>>()?;

        let matrix = FeatureMatrix::new(rows)?;
        self.validate_shape(&matrix)?;

        debug!(
            rows = matrix.row_count(),
            width = ?matrix.width(),
            "Validated feature matrix"
        );
        Ok(matrix)
    }

    /// Apply the configured width rules to a matrix
    pub fn validate_shape(&self, matrix: &FeatureMatrix) -> Result<(), ValidationError> {
        let rows = matrix.rows();

        if let Some(expected) = self.config.expected_width {
            if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
                return Err(ValidationError::WidthMismatch {
                    row,
                    expected,
                    actual: r.len(),
                });
            }
        }

        if self.config.require_uniform_width {
            let expected = rows[0].len();
            if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
                return Err(ValidationError::RaggedRow {
                    row,
                    expected,
                    actual: r.len(),
                });
            }
        }

        Ok(())
    }
}

fn parse_row(row: usize, value: &Value) -> Result<Vec<f64>, ValidationError> {
    let values = value
        .as_array()
        .ok_or(ValidationError::RowNotAList { row })?;

    values
        .iter()
        .enumerate()
        .map(|(column, v)| {
            v.as_f64()
                .ok_or(ValidationError::NonNumeric { row, column })
        })
        .collect()
}
