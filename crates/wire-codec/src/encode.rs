//! Feature Matrix Encoding

use crate::CodecError;
use data_validator::FeatureMatrix;
use std::fmt::Write;
use tracing::trace;

/// Feature rows rendered as headerless CSV
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    bytes: Vec<u8>,
    rows: usize,
}

impl EncodedPayload {
    /// Raw CSV bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Payload as text
    pub fn as_str(&self) -> &str {
        // Built from a String in `encode`.
        std::str::from_utf8(&self.bytes).unwrap_or_default()
    }

    /// Number of encoded rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consume the payload, returning the CSV bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Render a feature matrix as CSV.
///
/// Values within a row are joined with `,` and rows with `\n`, in input
/// order. Numbers use the shortest representation that parses back to the
/// same `f64`, so integral values carry no fractional part (`3.0` becomes
/// `3`). Fails only on NaN or infinite values, which the backend cannot
/// parse.
pub fn encode(matrix: &FeatureMatrix) -> Result<EncodedPayload, CodecError> {
    // Rough guess at ~8 bytes per value.
    let mut out = String::with_capacity(matrix.value_count() * 8);

    for (row, values) in matrix.rows().iter().enumerate() {
        if row > 0 {
            out.push('\n');
        }
        for (column, &value) in values.iter().enumerate() {
            if !value.is_finite() {
                return Err(CodecError::NonFiniteValue { row, column, value });
            }
            if column > 0 {
                out.push(',');
            }
            // Writing to a String cannot fail.
            let _ = write!(out, "{value}");
        }
    }

    trace!(rows = matrix.row_count(), bytes = out.len(), "Encoded feature matrix");

    Ok(EncodedPayload {
        bytes: out.into_bytes(),
        rows: matrix.row_count(),
    })
}
