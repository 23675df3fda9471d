//! Request-scoped storage for uploaded parts.
//!
//! A [`BlobStore`] hands out one [`BlobScope`] per request. Everything written
//! into a scope is released when the scope is dropped, on success and on
//! every error path alike.

mod memory;
mod temp_dir;

pub use memory::{MemoryBlobStore, MemoryScope};
pub use temp_dir::{TempDirBlobStore, TempDirScope};

use std::io::{Read, Seek, Write};
use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;

/// A seekable byte stream produced by a [`BlobScope`].
pub trait BlobReader: Read + Seek + Send {}

impl<T: Read + Seek + Send> BlobReader for T {}

/// Handle to a blob inside one scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobKey(pub(crate) usize);

impl BlobKey {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Writer returned by [`BlobScope::create`], borrowing its scope.
pub type BlobWriter<'a> = Box<dyn Write + Send + 'a>;

/// Factory for request-scoped blob storage
pub trait BlobStore: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Open fresh storage for one request.
    fn scope(&self) -> Result<Box<dyn BlobScope>>;
}

/// Storage owned by a single request.
pub trait BlobScope: Send {
    /// Start a new blob. Bytes written before the writer is dropped belong to it.
    fn create(&mut self) -> Result<(BlobKey, BlobWriter<'_>)>;

    /// Open a blob for reading.
    ///
    /// A blob is opened at most once; in-memory backends move the buffer into
    /// the returned reader.
    fn open(&mut self, key: BlobKey) -> Result<Box<dyn BlobReader>>;

    /// Number of blobs created so far
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write a complete blob in one call.
    fn put(&mut self, data: &[u8]) -> Result<BlobKey> {
        let (key, mut writer) = self.create()?;
        writer.write_all(data)?;
        writer.flush()?;
        Ok(key)
    }
}

/// Create a blob store from configuration
pub fn create_blob_store(config: &StorageConfig) -> Arc<dyn BlobStore> {
    match config.backend {
        StorageBackend::Memory => Arc::new(MemoryBlobStore::new()),
        StorageBackend::TempDir => Arc::new(TempDirBlobStore::new(config.temp_dir.clone())),
    }
}
