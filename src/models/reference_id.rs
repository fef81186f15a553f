use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::errors::CoreError;

/// 16-byte externally stable row identifier. The textual form is the
/// RFC-4122 UUID rendering; equality is by bytes; the null reference is all
/// zero bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ReferenceId([u8; 16]);

impl ReferenceId {
    pub fn new_v4() -> ReferenceId {
        ReferenceId(*Uuid::new_v4().as_bytes())
    }

    pub fn null() -> ReferenceId {
        ReferenceId([0u8; 16])
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 16]
    }

    pub fn from_bytes(bytes: [u8; 16]) -> ReferenceId {
        ReferenceId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn parse(value: &str) -> Result<ReferenceId, CoreError> {
        let uuid = Uuid::parse_str(value).map_err(|e| {
            CoreError::DecodeError(format!("invalid reference id [{}]: {}", value, e))
        })?;
        Ok(ReferenceId(*uuid.as_bytes()))
    }

    /// Accepts the database representations: uuid text or a 16-byte blob.
    pub fn from_slice(data: &[u8]) -> Result<ReferenceId, CoreError> {
        if data.len() != 16 {
            return Err(CoreError::DecodeError(format!(
                "invalid reference id length: expected 16 bytes, got {}",
                data.len()
            )));
        }
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(data);
        Ok(ReferenceId(bytes))
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Uuid::from_bytes(self.0))
    }
}

impl FromStr for ReferenceId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReferenceId::parse(s)
    }
}

impl Serialize for ReferenceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ReferenceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        ReferenceId::parse(&value).map_err(serde::de::Error::custom)
    }
}
