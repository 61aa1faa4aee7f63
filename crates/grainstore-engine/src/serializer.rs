//! Pluggable data serializers.
//!
//! A [`DataSerializer`] turns domain events and entity state into bytes and
//! back. Serializers are looked up by name at activation, so the trait must
//! be object safe: implementations convert between bytes and a
//! [`serde_json::Value`] tree, and the typed `encode`/`decode`
//! helpers on `dyn DataSerializer` bridge to concrete types.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::EngineError;

/// Converts values to and from their stored byte form.
pub trait DataSerializer: Send + Sync {
    /// Registration name of this serializer.
    fn name(&self) -> &str;

    /// Encode a value tree.
    fn to_bytes(&self, value: &serde_json::Value) -> Result<Vec<u8>, EngineError>;

    /// Decode a value tree.
    fn from_bytes(&self, payload: &[u8]) -> Result<serde_json::Value, EngineError>;
}

impl dyn DataSerializer {
    /// Serialize a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Serialization`] if the value cannot be encoded.
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, EngineError> {
        let tree = serde_json::to_value(value)
            .map_err(|e| EngineError::Serialization(format!("to value: {e}")))?;
        self.to_bytes(&tree)
    }

    /// Deserialize a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Serialization`] if the payload is not a valid
    /// encoding of `T`. Callers loading snapshots treat this as "absent".
    pub fn decode<T: DeserializeOwned>(&self, payload: &[u8]) -> Result<T, EngineError> {
        let tree = self.from_bytes(payload)?;
        serde_json::from_value(tree)
            .map_err(|e| EngineError::Serialization(format!("from value: {e}")))
    }
}

/// UTF-8 JSON serializer.
#[derive(Debug, Clone)]
pub struct JsonSerializer {
    name: String,
}

impl JsonSerializer {
    /// Create a JSON serializer registered as `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl DataSerializer for JsonSerializer {
    fn name(&self) -> &str {
        &self.name
    }

    fn to_bytes(&self, value: &serde_json::Value) -> Result<Vec<u8>, EngineError> {
        serde_json::to_vec(value).map_err(|e| EngineError::Serialization(e.to_string()))
    }

    fn from_bytes(&self, payload: &[u8]) -> Result<serde_json::Value, EngineError> {
        serde_json::from_slice(payload).map_err(|e| EngineError::Serialization(e.to_string()))
    }
}

/// Compact `MessagePack` serializer.
#[derive(Debug, Clone)]
pub struct MessagePackSerializer {
    name: String,
}

impl MessagePackSerializer {
    /// Create a `MessagePack` serializer registered as `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl DataSerializer for MessagePackSerializer {
    fn name(&self) -> &str {
        &self.name
    }

    fn to_bytes(&self, value: &serde_json::Value) -> Result<Vec<u8>, EngineError> {
        rmp_serde::to_vec_named(value).map_err(|e| EngineError::Serialization(e.to_string()))
    }

    fn from_bytes(&self, payload: &[u8]) -> Result<serde_json::Value, EngineError> {
        rmp_serde::from_slice(payload).map_err(|e| EngineError::Serialization(e.to_string()))
    }
}
