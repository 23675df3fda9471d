//! PDF Merger Core Library
//!
//! This library provides the core functionality for merging uploads into one PDF:
//! - Extension-based classification of uploaded files
//! - Request-scoped blob storage (memory or temp directory)
//! - Image to PDF conversion and order-preserving merging via lopdf
//! - The orchestration that ties them together

pub mod blob;
pub mod config;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod pdf;
pub mod upload;
pub mod util;

pub use blob::{BlobKey, BlobReader, BlobScope, BlobStore, create_blob_store};
pub use config::{
    ConversionConfig, MergeConfig, PageSize, ServiceConfig, StorageBackend, StorageConfig,
    UploadLimits, ValidationConfig,
};
pub use engine::{EngineInfo, FragmentOrigin, LopdfEngine, PdfEngine, PdfFragment, create_engine};
pub use error::{Error, ErrorKind, Result};
pub use orchestrator::MergeOrchestrator;
pub use upload::{FileKind, UploadedItem};

/// Multipart field that carries the uploaded files
pub const FILE_FIELD: &str = "files[]";

/// Filename of the merged download
pub const OUTPUT_FILENAME: &str = "merged_output.pdf";
