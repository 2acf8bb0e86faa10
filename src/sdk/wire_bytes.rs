use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{error, warn};

use super::api::{BytesVec, ChainError, ChainResult};

const MODCHAIN_SERIALIZATION_VERSION: u16 = 0;

pub(crate) fn serialize<T: ?Sized>(value: &T) -> ChainResult<BytesVec>
where
    T: Serialize,
{
    match bincode::serialize(value) {
        Ok(bytes) => Ok(bytes),
        Err(err) => {
            error!("serialization failure: {}", err.to_string());
            Err(ChainError::MalformedStream)
        }
    }
}

/// Wrap a serialized payload with a format version for durable storage.
pub fn encode<T: Serialize>(payload: &T) -> ChainResult<BytesVec> {
    serialize(&BytesVecVersioned {
        version: MODCHAIN_SERIALIZATION_VERSION,
        payload: serialize(payload)?,
    })
}

/// Deserialization failures are non-fatal: return `None` instead of an error.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Option<T> {
    let bytes_versioned: BytesVecVersioned = bincode::deserialize(bytes)
        .map_err(|err| {
            warn!("outer deserialization failure: {}", err.to_string());
        })
        .ok()?;
    if bytes_versioned.version != MODCHAIN_SERIALIZATION_VERSION {
        warn!(
            "encoding version {}, expected {}",
            bytes_versioned.version, MODCHAIN_SERIALIZATION_VERSION
        );
        return None;
    }
    bincode::deserialize(&bytes_versioned.payload)
        .map_err(|err| {
            warn!("inner deserialization failure: {}", err.to_string());
        })
        .ok()
}

#[derive(Serialize, Deserialize)]
struct BytesVecVersioned {
    version: u16,
    payload: BytesVec,
}
