//! BLAKE3 file hasher with streaming support.
//!
//! # Overview
//!
//! [`Hasher`] digests the complete content of a file by reading it in
//! fixed-size blocks, so memory use stays flat regardless of file size.
//! Digests are rendered as 64-character lowercase hex, which is what the
//! `hashes.txt` checkpoint stores.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use super::StageError;

/// Default read block size: 1 MiB.
pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;

/// Largest read block size: 64 MiB.
pub const MAX_BLOCK_SIZE: usize = 64 * 1024 * 1024;

/// Length of a hex-encoded BLAKE3 digest.
pub const HEX_DIGEST_LEN: usize = 64;

/// Streaming whole-file hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    block_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher reading [`DEFAULT_BLOCK_SIZE`] bytes at a time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    /// Use a custom read block size, clamped to `1..=MAX_BLOCK_SIZE`.
    #[must_use]
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        if block_size > MAX_BLOCK_SIZE {
            log::warn!("Hash block size {block_size} capped at {MAX_BLOCK_SIZE} bytes");
        }
        self.block_size = block_size.clamp(1, MAX_BLOCK_SIZE);
        self
    }

    /// Configured read block size.
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Compute the BLAKE3 digest of the whole file.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::Io`] if the file cannot be opened or read.
    pub fn full_hash(&self, path: &Path) -> Result<blake3::Hash, StageError> {
        let io_err = |source| StageError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut file = File::open(path).map_err(io_err)?;
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0u8; self.block_size];
        loop {
            match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    hasher.update(&buffer[..n]);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(io_err(e)),
            }
        }
        Ok(hasher.finalize())
    }

    /// Compute the digest and render it as lowercase hex.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::Io`] if the file cannot be opened or read.
    pub fn hash_hex(&self, path: &Path) -> Result<String, StageError> {
        Ok(self.full_hash(path)?.to_hex().to_string())
    }
}

/// Check that `s` looks like a digest produced by [`Hasher::hash_hex`].
#[must_use]
pub fn is_hex_digest(s: &str) -> bool {
    s.len() == HEX_DIGEST_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
