//! 128-bit global file identifier.
//!
//! A gfid is assigned at create time and is stable for the file's lifetime
//! (spec.md GLOSSARY). It has two on-disk representations: 16 raw bytes in
//! the BINARY encoding, and a 36-character canonical UUID string in the
//! ASCII encoding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DecodeError;

/// A 128-bit file identifier.
///
/// `Gfid` is `Copy` because it is always passed by value in this crate: a
/// `ChangeRecord` owns several of these and none of them need shared
/// ownership or interior mutability.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Gfid(#[serde(with = "uuid_bytes")] [u8; 16]);

impl Gfid {
    pub const NIL: Gfid = Gfid([0u8; 16]);

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Gfid(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Parses the 36-character canonical UUID form used by the ASCII
    /// encoding (`D-payload`, `M-payload`, `E-payload` in spec.md §6).
    pub fn parse_ascii(s: &str) -> Result<Self, DecodeError> {
        let uuid = Uuid::parse_str(s).map_err(|_| DecodeError::BadGfid {
            text: s.to_string(),
        })?;
        Ok(Gfid(*uuid.as_bytes()))
    }

    /// Parses the 16 raw bytes used by the BINARY encoding.
    pub fn parse_binary(bytes: &[u8]) -> Result<Self, DecodeError> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| DecodeError::BadGfid {
            text: format!("{} raw bytes", bytes.len()),
        })?;
        Ok(Gfid(arr))
    }
}

impl fmt::Display for Gfid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Uuid::from_bytes(self.0))
    }
}

impl fmt::Debug for Gfid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gfid({self})")
    }
}

impl FromStr for Gfid {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gfid::parse_ascii(s)
    }
}

impl From<Uuid> for Gfid {
    fn from(uuid: Uuid) -> Self {
        Gfid(*uuid.as_bytes())
    }
}

mod uuid_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 16], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&uuid::Uuid::from_bytes(*bytes).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<[u8; 16], D::Error> {
        let s = String::deserialize(de)?;
        let uuid = uuid::Uuid::parse_str(&s).map_err(serde::de::Error::custom)?;
        Ok(*uuid.as_bytes())
    }
}
