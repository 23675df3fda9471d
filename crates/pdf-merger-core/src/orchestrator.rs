//! Upload-merge orchestration.
//!
//! Turns an ordered batch of uploads into one merged PDF:
//! - empty batches fail before any engine call
//! - images are converted, PDFs pass through, anything else is skipped
//! - the first conversion failure aborts the whole batch
//! - fragments reach the merge in upload order
//!
//! Each item's stream is dropped as soon as its bytes are read. Items not yet
//! processed when an error returns are dropped with the remaining iterator.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::config::{ConversionConfig, MergeConfig, ServiceConfig, ValidationConfig};
use crate::engine::{FragmentOrigin, PdfEngine, PdfFragment};
use crate::error::{Error, Result};
use crate::upload::{FileKind, UploadedItem};

/// Runs a batch of uploads through a [`PdfEngine`].
pub struct MergeOrchestrator {
    engine: Arc<dyn PdfEngine>,
    conversion: ConversionConfig,
    merge: MergeConfig,
    validation: ValidationConfig,
}

impl MergeOrchestrator {
    pub fn new(engine: Arc<dyn PdfEngine>, config: &ServiceConfig) -> Self {
        Self {
            engine,
            conversion: config.conversion.clone(),
            merge: config.merge.clone(),
            validation: config.validation.clone(),
        }
    }

    /// Orchestrator with default conversion, merge and validation settings
    pub fn with_engine(engine: Arc<dyn PdfEngine>) -> Self {
        Self::new(engine, &ServiceConfig::default())
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Merge uploads in order, returning the merged PDF bytes.
    pub async fn merge(&self, items: Vec<UploadedItem>) -> Result<Bytes> {
        if items.is_empty() {
            return Err(Error::NoFilesProvided);
        }

        let total = items.len();
        let mut fragments = Vec::with_capacity(total);
        let mut skipped = 0usize;

        for mut item in items {
            let kind = item.kind();
            let origin = match kind {
                FileKind::Image => FragmentOrigin::Converted,
                FileKind::Pdf => FragmentOrigin::Uploaded,
                FileKind::Unsupported => {
                    info!("Skipping unsupported file: {}", item.filename());
                    skipped += 1;
                    continue;
                }
            };

            let filename = item.filename().to_string();
            let data = item.read_all().map_err(|e| Error::FileOpen {
                filename: filename.clone(),
                reason: e.to_string(),
            })?;
            drop(item);

            if self.validation.sniff_content && !kind.matches_content(&data) {
                warn!("Rejecting {}: content is not {}", filename, kind.label());
                return Err(Error::ContentMismatch {
                    filename,
                    expected: kind.label(),
                });
            }

            let bytes = match origin {
                FragmentOrigin::Uploaded => Bytes::from(data),
                FragmentOrigin::Converted => self
                    .engine
                    .convert_image(Bytes::from(data), &self.conversion)
                    .await
                    .map_err(|e| {
                        warn!("Conversion failed for {}: {}", filename, e);
                        Error::ConversionFailed {
                            filename: filename.clone(),
                            reason: e.to_string(),
                        }
                    })?,
            };

            debug!("Queued {} ({:?}, {} bytes)", filename, origin, bytes.len());
            fragments.push(PdfFragment::new(filename, origin, bytes));
        }

        if fragments.is_empty() {
            return Err(Error::NoMergeableContent);
        }

        let count = fragments.len();
        let merged = self
            .engine
            .merge(fragments, &self.merge)
            .await
            .map_err(|e| Error::MergeFailed(e.to_string()))?;

        info!(
            "Merged {} of {} files with {} ({} skipped, {} bytes)",
            count,
            total,
            self.engine.name(),
            skipped,
            merged.len()
        );

        Ok(merged)
    }
}

impl std::fmt::Debug for MergeOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeOrchestrator")
            .field("engine", &self.engine.name())
            .field("conversion", &self.conversion)
            .field("merge", &self.merge)
            .field("validation", &self.validation)
            .finish()
    }
}
