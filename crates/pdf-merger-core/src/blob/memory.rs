use std::io::Cursor;

use super::{BlobKey, BlobReader, BlobScope, BlobStore, BlobWriter};
use crate::error::{Error, Result};

/// Blob store keeping every part in a memory buffer.
#[derive(Debug, Default)]
pub struct MemoryBlobStore;

impl MemoryBlobStore {
    pub const fn new() -> Self {
        Self
    }
}

impl BlobStore for MemoryBlobStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn scope(&self) -> Result<Box<dyn BlobScope>> {
        Ok(Box::new(MemoryScope::default()))
    }
}

/// Per-request buffers; `None` once a blob has been opened.
#[derive(Debug, Default)]
pub struct MemoryScope {
    blobs: Vec<Option<Vec<u8>>>,
}

impl BlobScope for MemoryScope {
    fn create(&mut self) -> Result<(BlobKey, BlobWriter<'_>)> {
        let key = BlobKey(self.blobs.len());
        self.blobs.push(Some(Vec::new()));
        let slot = self.blobs[key.0].get_or_insert_with(Vec::new);
        Ok((key, Box::new(slot)))
    }

    fn open(&mut self, key: BlobKey) -> Result<Box<dyn BlobReader>> {
        let data = self
            .blobs
            .get_mut(key.0)
            .and_then(Option::take)
            .ok_or(Error::BlobMissing(key.0))?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn len(&self) -> usize {
        self.blobs.len()
    }
}
