use async_trait::async_trait;
use bytes::Bytes;

use crate::config::{ConversionConfig, MergeConfig};
use crate::error::Result;

/// Information about a PDF engine
#[derive(Debug, Clone)]
pub struct EngineInfo {
    /// Human-readable name
    pub name: &'static str,
    /// Whether work is offloaded to the blocking thread pool
    pub blocking: bool,
}

/// Where a fragment came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentOrigin {
    /// An uploaded PDF, unchanged
    Uploaded,
    /// Output of image conversion
    Converted,
}

/// One complete PDF document waiting to be merged
#[derive(Debug, Clone)]
pub struct PdfFragment {
    /// Filename of the upload this fragment came from
    pub source: String,
    pub origin: FragmentOrigin,
    pub bytes: Bytes,
}

impl PdfFragment {
    pub fn new(source: impl Into<String>, origin: FragmentOrigin, bytes: impl Into<Bytes>) -> Self {
        Self {
            source: source.into(),
            origin,
            bytes: bytes.into(),
        }
    }
}

impl AsRef<[u8]> for PdfFragment {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Trait for PDF backends
#[async_trait]
pub trait PdfEngine: Send + Sync {
    /// Get information about this engine
    fn info(&self) -> EngineInfo;

    /// Get the engine name (convenience method)
    fn name(&self) -> &'static str {
        self.info().name
    }

    /// Turn one image into a single-page PDF
    async fn convert_image(&self, image: Bytes, config: &ConversionConfig) -> Result<Bytes>;

    /// Concatenate fragments into one document, pages in fragment order
    async fn merge(&self, fragments: Vec<PdfFragment>, config: &MergeConfig) -> Result<Bytes>;
}
