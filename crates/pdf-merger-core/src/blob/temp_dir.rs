//! Temp-directory backed blob storage.
//!
//! Each scope owns its own `TempDir`, so every file written for a request is
//! removed when the scope goes out of scope. File names are generated from
//! the blob index and never derived from client-supplied filenames.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use super::{BlobKey, BlobReader, BlobScope, BlobStore, BlobWriter};
use crate::error::{Error, Result};

const DIR_PREFIX: &str = "pdf-merger-";

/// Blob store writing each part to a per-request temp directory.
#[derive(Debug, Default)]
pub struct TempDirBlobStore {
    /// Parent for scope directories (system temp dir if `None`)
    parent: Option<PathBuf>,
}

impl TempDirBlobStore {
    pub const fn new(parent: Option<PathBuf>) -> Self {
        Self { parent }
    }
}

impl BlobStore for TempDirBlobStore {
    fn name(&self) -> &'static str {
        "temp_dir"
    }

    fn scope(&self) -> Result<Box<dyn BlobScope>> {
        Ok(Box::new(TempDirScope::new(self.parent.as_deref())?))
    }
}

/// Temp directory owned by one request.
pub struct TempDirScope {
    dir: TempDir,
    /// One entry per created blob, set once the blob has been opened
    opened: Vec<bool>,
}

impl TempDirScope {
    pub fn new(parent: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(DIR_PREFIX);

        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(|e| Error::BlobScope(e.to_string()))?;

        debug!("Created blob scope at {}", dir.path().display());
        Ok(Self {
            dir,
            opened: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn blob_path(&self, key: BlobKey) -> PathBuf {
        self.dir.path().join(format!("blob-{}", key.0))
    }
}

impl BlobScope for TempDirScope {
    fn create(&mut self) -> Result<(BlobKey, BlobWriter<'_>)> {
        let key = BlobKey(self.opened.len());
        let file = File::create(self.blob_path(key))?;
        self.opened.push(false);
        Ok((key, Box::new(BufWriter::new(file))))
    }

    fn open(&mut self, key: BlobKey) -> Result<Box<dyn BlobReader>> {
        match self.opened.get_mut(key.0) {
            Some(opened) if !*opened => *opened = true,
            _ => return Err(Error::BlobMissing(key.0)),
        }
        let file = File::open(self.blob_path(key))?;
        Ok(Box::new(file))
    }

    fn len(&self) -> usize {
        self.opened.len()
    }
}
