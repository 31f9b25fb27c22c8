//! Serializer/Validator Module
//!
//! Converts caller values to and from the JSON payload stored inside an
//! envelope, running the optional caller validator after decoding.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CacheError, Result};

/// Caller-supplied shape check. `false` is treated as corruption.
pub type Validator<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

// == Encode ==
/// Serializes a caller value. Fails only on non-serializable input.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| CacheError::SerializeFailure(e.to_string()))
}

// == Decode ==
/// Deserializes a payload into `T` and applies the validator.
pub fn decode<T: DeserializeOwned>(
    payload: serde_json::Value,
    validator: Option<&Validator<T>>,
) -> Result<T> {
    let value: T =
        serde_json::from_value(payload).map_err(|e| CacheError::Corrupt(e.to_string()))?;

    match validator {
        Some(validate) if !validate(&value) => Err(CacheError::Corrupt(
            "value rejected by validator".to_string(),
        )),
        _ => Ok(value),
    }
}
