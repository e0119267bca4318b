//! Content-addressed payload storage
//!
//! Image attachments, recorded audio and rasterised PDF pages are kept
//! out of the database and addressed by the SHA-256 of their bytes.
//! Two-level fan-out keeps directories small:
//! hash "abcd1234..." lives at "blobs/ab/cd/abcd1234...".
//!
//! Identical payloads share one file, so recreating a deleted entity
//! from its snapshot always resolves to the same address.

use crate::error::{AppError, Result};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Content-addressed blob store
#[derive(Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create the root directory if needed
    pub async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        tracing::info!("Blob store initialized at: {:?}", self.root);
        Ok(())
    }

    /// Store a payload and return its hex SHA-256 address.
    ///
    /// Writing an already stored payload is a no-op.
    pub async fn put(&self, data: &[u8]) -> Result<String> {
        let hash = hash_payload(data);
        let path = self.path_for(&hash)?;

        if fs::try_exists(&path).await? {
            tracing::debug!("Blob already present: {}", hash);
            return Ok(hash);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Readers must never observe a half-written blob
        let staging = path.with_extension("partial");
        let mut file = fs::File::create(&staging).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        fs::rename(&staging, &path).await?;

        tracing::debug!("Stored blob: {} ({} bytes)", hash, data.len());
        Ok(hash)
    }

    /// Load a payload by address
    pub async fn get(&self, hash: &str) -> Result<Vec<u8>> {
        let path = self.path_for(hash)?;

        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::BlobStore(format!("Blob not found: {}", hash)))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn contains(&self, hash: &str) -> Result<bool> {
        match self.path_for(hash) {
            Ok(path) => Ok(fs::try_exists(&path).await?),
            Err(_) => Ok(false),
        }
    }

    /// Remove a payload; removing a missing blob succeeds
    pub async fn remove(&self, hash: &str) -> Result<()> {
        let path = self.path_for(hash)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("Removed blob: {}", hash);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Every address currently stored
    pub async fn list_all(&self) -> Result<Vec<String>> {
        let mut hashes = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            if !fs::try_exists(&dir).await? {
                continue;
            }

            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if file_type.is_file() {
                    if let Some(name) = entry.file_name().to_str() {
                        if is_valid_hash(name) {
                            hashes.push(name.to_string());
                        }
                    }
                }
            }
        }

        Ok(hashes)
    }

    /// Delete every blob whose address is not in `referenced`.
    ///
    /// Returns the number of blobs removed.
    pub async fn sweep_unreferenced(&self, referenced: &HashSet<String>) -> Result<usize> {
        let mut removed = 0;

        for hash in self.list_all().await? {
            if !referenced.contains(&hash) {
                self.remove(&hash).await?;
                removed += 1;
            }
        }

        tracing::info!("Swept {} unreferenced blob(s)", removed);
        Ok(removed)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, hash: &str) -> Result<PathBuf> {
        if !is_valid_hash(hash) {
            return Err(AppError::BlobStore(format!("Invalid blob address: {}", hash)));
        }
        Ok(self.root.join(&hash[0..2]).join(&hash[2..4]).join(hash))
    }
}

/// Hex SHA-256 of a payload
pub fn hash_payload(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn is_valid_hash(candidate: &str) -> bool {
    candidate.len() == 64 && candidate.chars().all(|c| c.is_ascii_hexdigit())
}
