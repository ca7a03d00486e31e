//! Backend Response Decoding

use crate::CodecError;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Scores returned by the backend, one per input row, in input order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredictionVector(Vec<f64>);

impl PredictionVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl From<Vec<f64>> for PredictionVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Parse a backend response body into predictions.
///
/// Tokens are separated by commas, whitespace, or line breaks; empty tokens
/// are skipped. Each token must parse as a finite `f64`.
pub fn decode(body: &[u8]) -> Result<PredictionVector, CodecError> {
    let text = std::str::from_utf8(body).map_err(|e| CodecError::InvalidUtf8(e.to_string()))?;

    let values = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .enumerate()
        .map(|(position, token)| match token.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(CodecError::InvalidToken {
                position,
                token: token.to_string(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    trace!(predictions = values.len(), "Decoded backend response");
    Ok(PredictionVector(values))
}
