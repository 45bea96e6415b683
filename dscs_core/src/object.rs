//! Binary object format.
//!
//! Every object file is a 16-byte header followed by the payload:
//!
//! ```text
//! 0x00  4   "DSCS" magic
//! 0x04  1   version (u8) = 1
//! 0x05  1   type: 1=blob, 2=commit
//! 0x06  1   algo: 1=blake3-256
//! 0x07  1   compression: 0=none, 1=zstd
//! 0x08  8   payload_len (u64 LE) - stored size
//! 0x10  ... payload
//! ```

use crate::error::{Error, Result};
use crate::hash::Algorithm;

/// Magic bytes at the start of every object file.
pub const MAGIC: &[u8; 4] = b"DSCS";

/// Current object format version.
pub const VERSION: u8 = 1;

/// Size of the object header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Object types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    /// File content.
    Blob = 1,
    /// A commit node.
    Commit = 2,
}

impl ObjectType {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(ObjectType::Blob),
            2 => Ok(ObjectType::Commit),
            _ => Err(Error::invalid_object_type(
                "blob or commit",
                format!("type byte {}", value),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Blob => "blob",
            ObjectType::Commit => "commit",
        }
    }
}

/// Compression types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None = 0,
    Zstd = 1,
}

impl CompressionType {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::Zstd),
            _ => Err(Error::UnsupportedCompression { value }),
        }
    }
}

/// A 16-byte object header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHeader {
    pub version: u8,
    pub object_type: ObjectType,
    pub algorithm: Algorithm,
    pub compression: CompressionType,
    /// Length of the stored payload (compressed size if compressed).
    pub payload_len: u64,
}

impl ObjectHeader {
    pub fn new(
        object_type: ObjectType,
        algorithm: Algorithm,
        compression: CompressionType,
        payload_len: u64,
    ) -> Self {
        Self {
            version: VERSION,
            object_type,
            algorithm,
            compression,
            payload_len,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = self.version;
        buf[5] = self.object_type.to_u8();
        buf[6] = self.algorithm.id();
        buf[7] = self.compression.to_u8();
        buf[8..16].copy_from_slice(&self.payload_len.to_le_bytes());
        buf
    }

    /// Decode a header. Any mismatch is reported as a plain message; callers
    /// attach the object path.
    pub fn decode(buf: &[u8]) -> std::result::Result<Self, String> {
        if buf.len() < HEADER_SIZE {
            return Err(format!(
                "Header too short: {} bytes (expected {})",
                buf.len(),
                HEADER_SIZE
            ));
        }

        if &buf[0..4] != MAGIC {
            return Err(format!(
                "Invalid magic: expected {:?}, got {:?}",
                MAGIC,
                &buf[0..4]
            ));
        }

        let version = buf[4];
        if version != VERSION {
            return Err(format!(
                "Unsupported version: {} (expected {})",
                version, VERSION
            ));
        }

        let object_type = ObjectType::from_u8(buf[5]).map_err(|e| e.to_string())?;
        let algorithm = Algorithm::from_id(buf[6]).map_err(|e| e.to_string())?;
        let compression = CompressionType::from_u8(buf[7]).map_err(|e| e.to_string())?;

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&buf[8..16]);
        let payload_len = u64::from_le_bytes(len_bytes);

        Ok(Self {
            version,
            object_type,
            algorithm,
            compression,
            payload_len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_header(version: u8, kind: u8, compression: u8) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = version;
        buf[5] = kind;
        buf[6] = Algorithm::Blake3.id();
        buf[7] = compression;
        buf
    }

    #[test]
    fn test_header_encode_decode_commit() {
        let header = ObjectHeader::new(
            ObjectType::Commit,
            Algorithm::Blake3,
            CompressionType::None,
            512,
        );
        let encoded = header.encode();
        assert_eq!(&encoded[0..4], MAGIC);
        assert_eq!(ObjectHeader::decode(&encoded).unwrap(), header);
    }

    #[test]
    fn test_header_decode_rejects_bad_fields() {
        let mut bad_magic = raw_header(VERSION, 1, 0);
        bad_magic[0..4].copy_from_slice(b"CAFS");
        assert!(ObjectHeader::decode(&bad_magic).is_err());

        assert!(ObjectHeader::decode(&raw_header(9, 1, 0)).is_err());
        assert!(ObjectHeader::decode(&raw_header(VERSION, 7, 0)).is_err());
        assert!(ObjectHeader::decode(&raw_header(VERSION, 1, 9)).is_err());
        assert!(ObjectHeader::decode(&[0u8; 10]).is_err());
    }

    #[test]
    fn test_unknown_compression_byte() {
        assert!(matches!(
            CompressionType::from_u8(9),
            Err(Error::UnsupportedCompression { value: 9 })
        ));
    }

    #[test]
    fn test_header_decode_zstd_blob() {
        let header = ObjectHeader::decode(&raw_header(VERSION, 1, 1)).unwrap();
        assert_eq!(header.object_type, ObjectType::Blob);
        assert_eq!(header.compression, CompressionType::Zstd);
    }

    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        #[test]
        fn prop_payload_len_preserved(
            kind in prop::sample::select(vec![ObjectType::Blob, ObjectType::Commit]),
            len: u64,
        ) {
            let header = ObjectHeader::new(kind, Algorithm::Blake3, CompressionType::None, len);
            let decoded = ObjectHeader::decode(&header.encode()).unwrap();
            prop_assert_eq!(decoded.payload_len, len);
            prop_assert_eq!(decoded.object_type, kind);
        }
    }
}
