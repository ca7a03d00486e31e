//! CSV Wire Codec
//!
//! Hosted tabular models take feature rows as headerless CSV and answer with
//! comma-separated scores. This crate converts between that text format and
//! the gateway's typed values.

mod decode;
mod encode;

pub use decode::{decode, PredictionVector};
pub use encode::{encode, EncodedPayload};

use thiserror::Error;

/// Content type of encoded payloads and expected responses
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Errors while encoding requests or decoding responses
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("cannot encode non-finite value {value} at row {row}, column {column}")]
    NonFiniteValue { row: usize, column: usize, value: f64 },
    #[error("backend response is not valid UTF-8: {0}")]
    InvalidUtf8(String),
    #[error("could not parse prediction {position} ({token:?}) as a number")]
    InvalidToken { position: usize, token: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_validator::FeatureMatrix;
    use proptest::prelude::*;

    fn jagged_rows() -> impl Strategy<Value = Vec<Vec<f64>>> {
        prop::collection::vec(
            prop::collection::vec(
                prop_oneof![
                    (-1_000_000i64..1_000_000).prop_map(|v| v as f64),
                    -1.0e12f64..1.0e12,
                    -1.0f64..1.0,
                ],
                1..12,
            ),
            1..24,
        )
    }

    proptest! {
        /// A backend echoing the encoded text hands back every value unchanged.
        #[test]
        fn prop_encoded_values_decode_unchanged(rows in jagged_rows()) {
            let matrix = FeatureMatrix::new(rows.clone()).unwrap();
            let payload = encode(&matrix).unwrap();

            prop_assert_eq!(payload.as_str().lines().count(), rows.len());

            let decoded = decode(payload.as_bytes()).unwrap();
            let flat: Vec<f64> = rows.into_iter().flatten().collect();
            prop_assert_eq!(decoded.into_inner(), flat);
        }
    }
}
