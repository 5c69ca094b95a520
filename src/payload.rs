use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Result, StoreError};
use crate::path::Encoding;

/// Encode `msg` per the given tag. The store never interprets the result
/// beyond round-tripping it.
pub fn encode<T: Serialize>(encoding: Encoding, msg: &T) -> Result<Vec<u8>> {
    match encoding {
        Encoding::Json => {
            serde_json::to_vec(msg).map_err(|e| StoreError::Encode(e.to_string()))
        }
        Encoding::Binary => {
            bincode::serialize(msg).map_err(|e| StoreError::Encode(e.to_string()))
        }
    }
}

/// Decode bytes produced by [`encode`] back into `T`.
pub fn decode<T: DeserializeOwned>(encoding: Encoding, bytes: &[u8]) -> Result<T> {
    match encoding {
        Encoding::Json => {
            serde_json::from_slice(bytes).map_err(|e| StoreError::Decode(e.to_string()))
        }
        Encoding::Binary => {
            bincode::deserialize(bytes).map_err(|e| StoreError::Decode(e.to_string()))
        }
    }
}
