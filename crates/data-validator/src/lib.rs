//! Request Validation
//!
//! Turns an untyped JSON request body into a typed [`FeatureMatrix`],
//! or a [`ValidationError`] describing what the client got wrong.

mod error;
mod matrix;
mod validator;

pub use error::ValidationError;
pub use matrix::FeatureMatrix;
pub use validator::{Validator, ValidationConfig, FEATURES_FIELD};
