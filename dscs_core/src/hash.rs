//! Object identities derived from BLAKE3 digests.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Digest size in bytes (BLAKE3 produces 256-bit hashes).
pub const ID_SIZE: usize = 32;

/// Shortest accepted abbreviated identity, in hex characters.
pub const MIN_PREFIX_LEN: usize = 4;

/// Key-derivation context for commit identities. Keeps commit ids in a
/// separate digest domain from blob ids.
const COMMIT_CONTEXT: &str = "dscs 2024 commit v1";

/// Supported hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// BLAKE3 with 256-bit output.
    Blake3,
}

impl Algorithm {
    /// Returns the string representation of the algorithm (for config files).
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Blake3 => "blake3-256",
        }
    }

    /// Parse algorithm from string.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "blake3-256" => Ok(Algorithm::Blake3),
            _ => Err(Error::unsupported_algorithm(s)),
        }
    }

    /// Returns the algorithm ID byte (for object headers).
    pub fn id(&self) -> u8 {
        match self {
            Algorithm::Blake3 => 1,
        }
    }

    /// Parse algorithm from ID byte.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            1 => Ok(Algorithm::Blake3),
            _ => Err(Error::unsupported_algorithm(format!("ID {}", id))),
        }
    }
}

/// Identity of a stored blob or commit.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; ID_SIZE]);

impl ObjectId {
    pub fn from_bytes(bytes: [u8; ID_SIZE]) -> Self {
        ObjectId(bytes)
    }

    /// Parse a full 64-character hex identity.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        if hex_str.len() != ID_SIZE * 2 {
            return Err(Error::invalid_id(format!(
                "Expected {} hex characters, got {}",
                ID_SIZE * 2,
                hex_str.len()
            )));
        }

        let bytes =
            hex::decode(hex_str).map_err(|e| Error::invalid_id(format!("Invalid hex: {}", e)))?;

        let mut id = [0u8; ID_SIZE];
        id.copy_from_slice(&bytes);
        Ok(ObjectId(id))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 7 hex characters, for display.
    pub fn short(&self) -> String {
        self.to_hex()[..7].to_string()
    }

    /// First 2 hex characters (directory shard).
    pub fn prefix(&self) -> String {
        hex::encode(&self.0[..1])
    }

    /// Remaining 62 hex characters (file name inside the shard).
    pub fn suffix(&self) -> String {
        hex::encode(&self.0[1..])
    }

    pub fn as_bytes(&self) -> &[u8; ID_SIZE] {
        &self.0
    }

    /// Identity of a blob: the plain BLAKE3 digest of its bytes.
    pub fn for_blob(data: &[u8]) -> Self {
        ObjectId(*blake3::hash(data).as_bytes())
    }

    /// Identity of a commit: a keyed BLAKE3 digest of its canonical encoding.
    pub fn for_commit(canonical: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(COMMIT_CONTEXT);
        hasher.update(canonical);
        ObjectId(*hasher.finalize().as_bytes())
    }
}

/// Validate an abbreviated identity and return it lowercased.
pub fn normalize_prefix(prefix: &str) -> Result<String> {
    let prefix = prefix.trim().to_ascii_lowercase();
    if prefix.len() < MIN_PREFIX_LEN || prefix.len() > ID_SIZE * 2 {
        return Err(Error::invalid_id(format!(
            "Expected {} to {} hex characters, got {}",
            MIN_PREFIX_LEN,
            ID_SIZE * 2,
            prefix.len()
        )));
    }
    if !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::invalid_id(format!("Invalid hex: {}", prefix)));
    }
    Ok(prefix)
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ObjectId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
