//! JSON conversion for Mu values through serde_json::Value
mod deserializer;
mod serializer;

use thiserror::Error;

use crate::mu_runtime::MuError;
use crate::mu_value::MuValue;

pub use deserializer::{from_str as json_str_to_mu, from_value as json_to_mu};
pub use serializer::{to_string as mu_to_json_string, to_value as mu_to_json};

#[derive(Debug, Error)]
pub enum MuJsonError {
    #[error("cannot convert a function to JSON")]
    Function,
    #[error("table contains itself")]
    Cycle,
    #[error("number {0} has no JSON form")]
    NonFiniteNumber(f64),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Mu(#[from] MuError),
}

/// Round trip a value through JSON text
pub fn reencode(value: &MuValue) -> Result<MuValue, MuJsonError> {
    json_str_to_mu(&mu_to_json_string(value, false)?)
}
