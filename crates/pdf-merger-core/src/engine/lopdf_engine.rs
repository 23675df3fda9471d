use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::traits::{EngineInfo, PdfEngine, PdfFragment};
use crate::config::{ConversionConfig, MergeConfig};
use crate::error::{Error, Result};
use crate::pdf;

/// Engine built on lopdf and the image crate.
///
/// Decoding and serialization are CPU-bound, so both operations run on
/// tokio's blocking pool.
#[derive(Debug, Default, Clone)]
pub struct LopdfEngine;

impl LopdfEngine {
    pub const fn new() -> Self {
        Self
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::EngineTask(e.to_string()))?
}

#[async_trait]
impl PdfEngine for LopdfEngine {
    fn info(&self) -> EngineInfo {
        EngineInfo {
            name: "lopdf",
            blocking: true,
        }
    }

    async fn convert_image(&self, image: Bytes, config: &ConversionConfig) -> Result<Bytes> {
        let config = config.clone();
        let input_len = image.len();
        let pdf = run_blocking(move || pdf::image_to_pdf(&image, &config)).await?;
        debug!("Converted {} byte image into {} byte PDF", input_len, pdf.len());
        Ok(Bytes::from(pdf))
    }

    async fn merge(&self, fragments: Vec<PdfFragment>, config: &MergeConfig) -> Result<Bytes> {
        let config = config.clone();
        let count = fragments.len();
        let merged = run_blocking(move || pdf::merge_documents(&fragments, &config)).await?;
        debug!("Merged {} fragments into {} bytes", count, merged.len());
        Ok(Bytes::from(merged))
    }
}
