//! Binary storage for precomputed product embeddings.
//!
//! File format: vectors.bin
//!
//! Header (47 bytes):
//! - version: u8 (1)
//! - model_id: [u8; 32] (SHA256 hash of the embedding model name)
//! - dimensions: u16 (little-endian)
//! - entry_count: u64 (little-endian)
//! - checksum: u32 (CRC32 of the header bytes before the checksum)
//!
//! Entries (repeated):
//! - product_id: u64 (little-endian)
//! - embedding: [f32; dimensions] (little-endian)
//!
//! The f32 byte layout matches the raw blob format the catalog decodes, so a
//! stored entry survives the save/load/decode path bit-exact.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const FORMAT_VERSION: u8 = 1;

/// version(1) + model_id(32) + dimensions(2) + entry_count(8) + checksum(4)
const HEADER_SIZE: usize = 47;

#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    #[error("version mismatch: file version {0}, supported version {1}")]
    VersionMismatch(u8, u8),

    #[error("model mismatch: file was built with a different embedding model")]
    ModelMismatch,

    #[error("checksum mismatch: file may be corrupted")]
    ChecksumMismatch,
}

/// SHA256 of the embedding model name, stored in the header so a file built
/// with one model is never served against queries embedded with another.
pub fn model_id(model_name: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(model_name.as_bytes());
    hasher.finalize().into()
}

/// Decoded content of a vectors file.
#[derive(Debug)]
pub struct LoadedVectors {
    pub model_id: [u8; 32],
    pub dimensions: usize,
    pub entries: Vec<(u64, Vec<f32>)>,
}

/// Reader/writer for one vectors.bin path.
pub struct VectorStore {
    path: PathBuf,
}

impl VectorStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load all entries. When `expected_model_id` is given, a file written
    /// with a different model is rejected instead of silently mixing vector
    /// spaces.
    pub fn load(&self, expected_model_id: Option<&[u8; 32]>) -> Result<LoadedVectors, VectorStoreError> {
        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);

        let header = read_header(&mut reader)?;
        if let Some(expected) = expected_model_id {
            if header.model_id != *expected {
                return Err(VectorStoreError::ModelMismatch);
            }
        }

        let dimensions = header.dimensions as usize;
        let mut entries = Vec::with_capacity(header.entry_count as usize);

        for _ in 0..header.entry_count {
            let mut id_bytes = [0u8; 8];
            reader.read_exact(&mut id_bytes)?;
            let id = u64::from_le_bytes(id_bytes);

            let mut vector = Vec::with_capacity(dimensions);
            for _ in 0..dimensions {
                let mut float_bytes = [0u8; 4];
                reader.read_exact(&mut float_bytes)?;
                vector.push(f32::from_le_bytes(float_bytes));
            }

            entries.push((id, vector));
        }

        Ok(LoadedVectors {
            model_id: header.model_id,
            dimensions,
            entries,
        })
    }

    /// Save entries atomically: temp file, fsync, rename.
    ///
    /// Every vector must have `dimensions` elements; a stray length is a
    /// caller bug and is rejected before anything touches the disk.
    pub fn save(
        &self,
        model_id: &[u8; 32],
        dimensions: usize,
        entries: &[(u64, Vec<f32>)],
    ) -> Result<(), VectorStoreError> {
        if let Some((id, vector)) = entries.iter().find(|(_, v)| v.len() != dimensions) {
            return Err(VectorStoreError::InvalidFormat(format!(
                "entry {id} has {} dimensions, expected {dimensions}",
                vector.len()
            )));
        }

        let temp_path = self.path.with_extension("tmp");
        let result = write_to_file(&temp_path, model_id, dimensions, entries);

        if result.is_err() {
            let _ = std::fs::remove_file(&temp_path);
            return result;
        }

        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

struct Header {
    model_id: [u8; 32],
    dimensions: u16,
    entry_count: u64,
}

fn read_header(reader: &mut BufReader<File>) -> Result<Header, VectorStoreError> {
    let mut header_bytes = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header_bytes)?;

    let version = header_bytes[0];
    if version > FORMAT_VERSION {
        return Err(VectorStoreError::VersionMismatch(version, FORMAT_VERSION));
    }

    let stored_checksum = u32::from_le_bytes([
        header_bytes[43],
        header_bytes[44],
        header_bytes[45],
        header_bytes[46],
    ]);
    if stored_checksum != crc32fast::hash(&header_bytes[0..43]) {
        return Err(VectorStoreError::ChecksumMismatch);
    }

    let mut model_id = [0u8; 32];
    model_id.copy_from_slice(&header_bytes[1..33]);

    let dimensions = u16::from_le_bytes([header_bytes[33], header_bytes[34]]);
    let entry_count = u64::from_le_bytes([
        header_bytes[35],
        header_bytes[36],
        header_bytes[37],
        header_bytes[38],
        header_bytes[39],
        header_bytes[40],
        header_bytes[41],
        header_bytes[42],
    ]);

    Ok(Header {
        model_id,
        dimensions,
        entry_count,
    })
}

fn write_to_file(
    path: &Path,
    model_id: &[u8; 32],
    dimensions: usize,
    entries: &[(u64, Vec<f32>)],
) -> Result<(), VectorStoreError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let mut header_bytes = [0u8; HEADER_SIZE];
    header_bytes[0] = FORMAT_VERSION;
    header_bytes[1..33].copy_from_slice(model_id);
    header_bytes[33..35].copy_from_slice(&(dimensions as u16).to_le_bytes());
    header_bytes[35..43].copy_from_slice(&(entries.len() as u64).to_le_bytes());
    let checksum = crc32fast::hash(&header_bytes[0..43]);
    header_bytes[43..47].copy_from_slice(&checksum.to_le_bytes());
    writer.write_all(&header_bytes)?;

    for (id, vector) in entries {
        writer.write_all(&id.to_le_bytes())?;
        for &value in vector {
            writer.write_all(&value.to_le_bytes())?;
        }
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    file.sync_all()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_model_id() -> [u8; 32] {
        model_id("gemini-embedding-001")
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let store = VectorStore::new(dir.path().join("vectors.bin"));
        let id = test_model_id();

        let entries = vec![
            (1u64, vec![1.0f32, 0.0, 0.5]),
            (2, vec![0.0, -1.0, 0.25]),
        ];
        store.save(&id, 3, &entries).unwrap();
        assert!(store.exists());

        let loaded = store.load(Some(&id)).unwrap();
        assert_eq!(loaded.model_id, id);
        assert_eq!(loaded.dimensions, 3);
        assert_eq!(loaded.entries, entries);
    }

    #[test]
    fn empty_file_roundtrip() {
        let dir = tempdir().unwrap();
        let store = VectorStore::new(dir.path().join("vectors.bin"));
        let id = test_model_id();

        store.save(&id, 768, &[]).unwrap();
        let loaded = store.load(None).unwrap();
        assert_eq!(loaded.dimensions, 768);
        assert!(loaded.entries.is_empty());
    }

    #[test]
    fn model_mismatch_is_rejected() {
        let dir = tempdir().unwrap();
        let store = VectorStore::new(dir.path().join("vectors.bin"));

        store.save(&test_model_id(), 2, &[(1, vec![0.0, 0.0])]).unwrap();

        let other = model_id("some-other-model");
        let result = store.load(Some(&other));
        assert!(matches!(result, Err(VectorStoreError::ModelMismatch)));
    }

    #[test]
    fn corrupted_header_fails_checksum() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vectors.bin");
        let store = VectorStore::new(path.clone());
        store.save(&test_model_id(), 2, &[(1, vec![0.5, 0.5])]).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[10] ^= 0xFF;
        std::fs::write(&path, bytes).unwrap();

        let result = store.load(None);
        assert!(matches!(result, Err(VectorStoreError::ChecksumMismatch)));
    }

    #[test]
    fn mismatched_entry_length_is_rejected_before_write() {
        let dir = tempdir().unwrap();
        let store = VectorStore::new(dir.path().join("vectors.bin"));

        let result = store.save(&test_model_id(), 3, &[(1, vec![1.0])]);
        assert!(matches!(result, Err(VectorStoreError::InvalidFormat(_))));
        assert!(!store.exists());
    }

    #[test]
    fn save_failure_cleans_up_temp_file() {
        let path = PathBuf::from("/nonexistent/directory/vectors.bin");
        let store = VectorStore::new(path.clone());

        let result = store.save(&test_model_id(), 2, &[]);
        assert!(result.is_err());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn model_id_is_deterministic() {
        assert_eq!(model_id("gemini-embedding-001"), model_id("gemini-embedding-001"));
        assert_ne!(model_id("gemini-embedding-001"), model_id("other"));
    }
}
