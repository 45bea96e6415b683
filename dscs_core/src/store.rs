//! Content-addressed object store.

use crate::error::{Error, Result};
use crate::hash::{Algorithm, ID_SIZE, ObjectId, normalize_prefix};
use crate::object::{CompressionType, HEADER_SIZE, ObjectHeader, ObjectType};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Compression threshold: blobs >= 4KB are compressed.
const COMPRESSION_THRESHOLD: usize = 4096;

/// Append-only store of blobs and commits keyed by identity.
///
/// Objects live at `objects/{algorithm}/{prefix}/{suffix}`. Nothing is ever
/// rewritten or deleted once present.
#[derive(Debug)]
pub struct ObjectStore {
    dir: PathBuf,
    algorithm: Algorithm,
}

impl ObjectStore {
    /// Create the object directory under `objects_root`.
    pub fn init<P: AsRef<Path>>(objects_root: P, algorithm: Algorithm) -> Result<Self> {
        let dir = objects_root.as_ref().join(algorithm.as_str());
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, algorithm })
    }

    /// Open an existing object directory under `objects_root`.
    pub fn open<P: AsRef<Path>>(objects_root: P, algorithm: Algorithm) -> Result<Self> {
        let dir = objects_root.as_ref().join(algorithm.as_str());
        if !dir.is_dir() {
            return Err(Error::invalid_repository(
                objects_root.as_ref(),
                "objects directory structure missing",
            ));
        }
        Ok(Self { dir, algorithm })
    }

    /// Path of the object file for `id`.
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        self.dir.join(id.prefix()).join(id.suffix())
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.object_path(id).is_file()
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Store a blob and return its identity.
    ///
    /// Writes only if no object with this identity exists yet, so storing the
    /// same bytes twice performs a single physical write.
    pub fn put(&self, data: &[u8]) -> Result<ObjectId> {
        let id = ObjectId::for_blob(data);

        if self.contains(&id) {
            debug!(blob = %id.short(), "blob already present");
            return Ok(id);
        }

        let compressed;
        let (payload, compression) = if data.len() >= COMPRESSION_THRESHOLD {
            compressed = compress_zstd(data)?;
            (compressed.as_slice(), CompressionType::Zstd)
        } else {
            (data, CompressionType::None)
        };

        self.write_object(&id, ObjectType::Blob, compression, payload)?;
        debug!(blob = %id.short(), size = data.len(), "stored blob");

        Ok(id)
    }

    /// Retrieve a blob's bytes.
    pub fn get(&self, id: &ObjectId) -> Result<Vec<u8>> {
        let data = self.read_object(id, ObjectType::Blob)?;

        let computed = ObjectId::for_blob(&data);
        if computed != *id {
            return Err(Error::corrupted_object(
                self.object_path(id),
                format!("Hash mismatch: expected {}, got {}", id, computed),
            ));
        }

        Ok(data)
    }

    /// Read the type of a stored object without decoding its payload.
    pub fn object_type(&self, id: &ObjectId) -> Result<ObjectType> {
        let path = self.object_path(id);
        if !path.is_file() {
            return Err(Error::not_found(id.to_hex()));
        }
        Ok(self.read_header(&path)?.object_type)
    }

    /// Resolve a full or abbreviated hex identity to a stored object.
    pub fn resolve(&self, prefix: &str) -> Result<ObjectId> {
        let prefix = normalize_prefix(prefix)?;
        if prefix.len() == ID_SIZE * 2 {
            let id = ObjectId::from_hex(&prefix)?;
            return if self.contains(&id) {
                Ok(id)
            } else {
                Err(Error::not_found(prefix))
            };
        }

        let shard = self.dir.join(&prefix[..2]);
        let rest = &prefix[2..];
        let mut matches = Vec::new();

        if shard.is_dir() {
            for entry in fs::read_dir(&shard)? {
                let entry = entry?;
                if let Some(name) = entry.file_name().to_str()
                    && name.starts_with(rest)
                    && let Ok(id) = ObjectId::from_hex(&format!("{}{}", &prefix[..2], name))
                {
                    matches.push(id);
                }
            }
        }

        match matches.len() {
            0 => Err(Error::not_found(prefix)),
            1 => Ok(matches[0]),
            count => Err(Error::AmbiguousId { prefix, count }),
        }
    }

    /// Write an object under `id` unless it already exists.
    pub(crate) fn write_object(
        &self,
        id: &ObjectId,
        object_type: ObjectType,
        compression: CompressionType,
        payload: &[u8],
    ) -> Result<()> {
        let obj_path = self.object_path(id);
        if obj_path.exists() {
            return Ok(());
        }

        let header = ObjectHeader::new(object_type, self.algorithm, compression, payload.len() as u64);

        let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
        bytes.extend_from_slice(&header.encode());
        bytes.extend_from_slice(payload);

        crate::fsutil::atomic_write(&obj_path, &bytes)
    }

    /// Read and decompress an object's payload, checking its declared type.
    pub(crate) fn read_object(&self, id: &ObjectId, expected: ObjectType) -> Result<Vec<u8>> {
        let path = self.object_path(id);
        if !path.is_file() {
            return Err(Error::not_found(id.to_hex()));
        }

        let bytes = fs::read(&path)?;
        let header =
            ObjectHeader::decode(&bytes).map_err(|reason| Error::corrupted_object(&path, reason))?;

        if header.object_type != expected {
            return Err(Error::invalid_object_type(
                expected.as_str(),
                header.object_type.as_str(),
            ));
        }

        let payload = &bytes[HEADER_SIZE..];
        if payload.len() as u64 != header.payload_len {
            return Err(Error::corrupted_object(
                &path,
                format!(
                    "Payload length mismatch: expected {}, got {}",
                    header.payload_len,
                    payload.len()
                ),
            ));
        }

        match header.compression {
            CompressionType::None => Ok(payload.to_vec()),
            CompressionType::Zstd => decompress_zstd(payload),
        }
    }

    fn read_header(&self, path: &Path) -> Result<ObjectHeader> {
        let mut file = fs::File::open(path)?;
        let mut header_buf = [0u8; HEADER_SIZE];
        file.read_exact(&mut header_buf)
            .map_err(|_| Error::corrupted_object(path, "truncated header"))?;
        ObjectHeader::decode(&header_buf).map_err(|reason| Error::corrupted_object(path, reason))
    }
}

fn compress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    zstd::encode_all(data, 3).map_err(|e| Error::Io { source: e })
}

fn decompress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    zstd::decode_all(data).map_err(|e| Error::Io { source: e })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_store(temp_dir: &TempDir) -> ObjectStore {
        ObjectStore::init(temp_dir.path().join("objects"), Algorithm::Blake3).unwrap()
    }

    fn count_objects(store: &ObjectStore) -> usize {
        let mut count = 0;
        for shard in fs::read_dir(&store.dir).unwrap() {
            count += fs::read_dir(shard.unwrap().path()).unwrap().count();
        }
        count
    }

    #[test]
    fn test_open_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let result = ObjectStore::open(temp_dir.path().join("objects"), Algorithm::Blake3);
        assert!(matches!(result, Err(Error::InvalidRepository { .. })));
    }

    #[test]
    fn test_object_path_layout() {
        let temp_dir = TempDir::new().unwrap();
        let store = new_store(&temp_dir);
        let id = ObjectId::for_blob(b"test");
        let path = store.object_path(&id);
        assert!(path.ends_with(format!("blake3-256/{}/{}", id.prefix(), id.suffix())));
    }

    #[test]
    fn test_put_get_small() {
        let temp_dir = TempDir::new().unwrap();
        let store = new_store(&temp_dir);

        let id = store.put(b"hello").unwrap();
        assert_eq!(id, ObjectId::for_blob(b"hello"));
        assert_eq!(store.get(&id).unwrap(), b"hello");
    }

    #[test]
    fn test_put_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = new_store(&temp_dir);

        let first = store.put(b"same bytes").unwrap();
        let second = store.put(b"same bytes").unwrap();

        assert_eq!(first, second);
        assert_eq!(count_objects(&store), 1);
    }

    #[test]
    fn test_put_empty_blob() {
        let temp_dir = TempDir::new().unwrap();
        let store = new_store(&temp_dir);

        let id = store.put(b"").unwrap();
        assert_eq!(store.get(&id).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_put_large_is_compressed() {
        let temp_dir = TempDir::new().unwrap();
        let store = new_store(&temp_dir);

        let data = vec![b'a'; 64 * 1024];
        let id = store.put(&data).unwrap();

        let on_disk = fs::metadata(store.object_path(&id)).unwrap().len();
        assert!(on_disk < data.len() as u64);
        assert_eq!(store.get(&id).unwrap(), data);
    }

    #[test]
    fn test_get_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = new_store(&temp_dir);

        let result = store.get(&ObjectId::for_blob(b"never stored"));
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_corruption_detected() {
        let temp_dir = TempDir::new().unwrap();
        let store = new_store(&temp_dir);

        let id = store.put(b"original").unwrap();
        let path = store.object_path(&id);
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        fs::write(&path, bytes).unwrap();

        assert!(matches!(store.get(&id), Err(Error::CorruptedObject { .. })));
    }

    #[test]
    fn test_unknown_compression_is_corruption() {
        let temp_dir = TempDir::new().unwrap();
        let store = new_store(&temp_dir);

        let id = store.put(b"original").unwrap();
        let path = store.object_path(&id);
        let mut bytes = fs::read(&path).unwrap();
        bytes[7] = 9;
        fs::write(&path, bytes).unwrap();

        assert!(matches!(store.get(&id), Err(Error::CorruptedObject { .. })));
    }

    #[test]
    fn test_truncated_object() {
        let temp_dir = TempDir::new().unwrap();
        let store = new_store(&temp_dir);

        let id = store.put(b"original").unwrap();
        fs::write(store.object_path(&id), b"DSCS").unwrap();

        assert!(matches!(store.get(&id), Err(Error::CorruptedObject { .. })));
    }

    #[test]
    fn test_resolve_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let store = new_store(&temp_dir);

        let id = store.put(b"resolve me").unwrap();
        assert_eq!(store.resolve(&id.to_hex()[..8]).unwrap(), id);
        assert_eq!(store.resolve(&id.to_hex()).unwrap(), id);
        assert_eq!(store.resolve(&id.to_hex()[..8].to_uppercase()).unwrap(), id);

        let missing = ObjectId::for_blob(b"absent").to_hex();
        assert!(matches!(store.resolve(&missing), Err(Error::NotFound { .. })));
        assert!(matches!(store.resolve("xyz"), Err(Error::InvalidId { .. })));
    }

    #[test]
    fn test_resolve_ambiguous() {
        let temp_dir = TempDir::new().unwrap();
        let store = new_store(&temp_dir);

        let mut first = [0u8; ID_SIZE];
        first[..3].copy_from_slice(&[0xab, 0xcd, 0x01]);
        let mut second = first;
        second[2] = 0x02;
        for id in [ObjectId::from_bytes(first), ObjectId::from_bytes(second)] {
            store
                .write_object(&id, ObjectType::Blob, CompressionType::None, b"x")
                .unwrap();
        }

        assert!(matches!(
            store.resolve("abcd"),
            Err(Error::AmbiguousId { count: 2, .. })
        ));
        assert_eq!(store.resolve("abcd01").unwrap(), ObjectId::from_bytes(first));
    }

    #[test]
    fn test_object_type() {
        let temp_dir = TempDir::new().unwrap();
        let store = new_store(&temp_dir);

        let id = store.put(b"typed").unwrap();
        assert_eq!(store.object_type(&id).unwrap(), ObjectType::Blob);
        assert!(store.object_type(&ObjectId::for_blob(b"nope")).is_err());
    }

    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Stored bytes come back unchanged across the compression threshold.
        #[test]
        fn prop_put_get(data in prop::collection::vec(any::<u8>(), 0..10_000)) {
            let temp_dir = TempDir::new().unwrap();
            let store = new_store(&temp_dir);
            let id = store.put(&data).unwrap();
            prop_assert_eq!(store.put(&data).unwrap(), id);
            prop_assert_eq!(store.get(&id).unwrap(), data);
        }
    }
}
