use thiserror::Error;

/// Unified error type for pdf-merger-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - Upload orchestration (empty batches, limits, per-file failures)
/// - PDF engine operations (image decoding, conversion, merging, saving)
/// - Blob storage operations (scope creation, reading, writing)
/// - Configuration operations (loading, validation)
/// - General I/O operations
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Orchestration Errors
    // ==========================================================================
    /// The multipart body could not be decoded
    #[error("failed to decode form data: {0}")]
    FormDecode(String),

    /// No parts were uploaded under the file field
    #[error("no files were uploaded")]
    NoFilesProvided,

    /// An uploaded part could not be stored, opened or read
    #[error("failed to open {filename}: {reason}")]
    FileOpen { filename: String, reason: String },

    /// Image to PDF conversion failed for one uploaded file
    #[error("failed to convert {filename} to PDF: {reason}")]
    ConversionFailed { filename: String, reason: String },

    /// Every uploaded file had an unsupported extension
    #[error("no mergeable files found (supported: .pdf, .png, .jpg, .jpeg)")]
    NoMergeableContent,

    /// The merge engine failed
    #[error("failed to merge PDFs: {0}")]
    MergeFailed(String),

    /// More parts than the configured batch limit
    #[error("too many files uploaded (limit is {limit})")]
    TooManyFiles { limit: usize },

    /// A single part exceeded the configured size limit
    #[error("{filename} exceeds the upload size limit of {limit} bytes")]
    FileTooLarge { filename: String, limit: u64 },

    /// File content does not match the type its extension claims
    #[error("{filename} does not contain {expected} data")]
    ContentMismatch {
        filename: String,
        expected: &'static str,
    },

    // ==========================================================================
    // Engine Errors
    // ==========================================================================
    /// Image bytes could not be decoded
    #[error("failed to decode image: {0}")]
    ImageDecode(String),

    /// Image format is recognized but cannot be embedded
    #[error("unsupported image format: {0}")]
    UnsupportedImage(String),

    /// Error from the lopdf library
    #[error("lopdf error: {0}")]
    Lopdf(String),

    /// Failed to save a PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    /// A blocking engine task panicked or was cancelled
    #[error("engine task failed: {0}")]
    EngineTask(String),

    // ==========================================================================
    // Storage Errors
    // ==========================================================================
    /// Failed to create request-scoped storage
    #[error("failed to create blob storage: {0}")]
    BlobScope(String),

    /// A blob key was opened twice or never written
    #[error("blob {0} is not available")]
    BlobMissing(usize),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an [`Error`], stable across message changes.
///
/// Transports map this to status codes; `code()` is exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FormDecodeFailed,
    NoFilesProvided,
    FileOpenFailed,
    ConversionFailed,
    NoMergeableContent,
    MergeFailed,
    TooManyFiles,
    FileTooLarge,
    ContentMismatch,
    Internal,
}

impl ErrorKind {
    /// Snake-case identifier for this kind.
    pub const fn code(self) -> &'static str {
        match self {
            Self::FormDecodeFailed => "form_decode_failed",
            Self::NoFilesProvided => "no_files_provided",
            Self::FileOpenFailed => "file_open_failed",
            Self::ConversionFailed => "conversion_failed",
            Self::NoMergeableContent => "no_mergeable_content",
            Self::MergeFailed => "merge_failed",
            Self::TooManyFiles => "too_many_files",
            Self::FileTooLarge => "file_too_large",
            Self::ContentMismatch => "content_mismatch",
            Self::Internal => "internal",
        }
    }

    /// Whether the failure was caused by the client's upload.
    pub const fn is_client_error(self) -> bool {
        matches!(
            self,
            Self::FormDecodeFailed
                | Self::NoFilesProvided
                | Self::NoMergeableContent
                | Self::TooManyFiles
                | Self::FileTooLarge
                | Self::ContentMismatch
        )
    }
}

impl Error {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::FormDecode(_) => ErrorKind::FormDecodeFailed,
            Self::NoFilesProvided => ErrorKind::NoFilesProvided,
            Self::FileOpen { .. } | Self::BlobScope(_) | Self::BlobMissing(_) | Self::Io(_) => {
                ErrorKind::FileOpenFailed
            }
            Self::ConversionFailed { .. } => ErrorKind::ConversionFailed,
            Self::NoMergeableContent => ErrorKind::NoMergeableContent,
            Self::MergeFailed(_) => ErrorKind::MergeFailed,
            Self::TooManyFiles { .. } => ErrorKind::TooManyFiles,
            Self::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            Self::ContentMismatch { .. } => ErrorKind::ContentMismatch,
            Self::ImageDecode(_)
            | Self::UnsupportedImage(_)
            | Self::Lopdf(_)
            | Self::PdfSave(_)
            | Self::EngineTask(_)
            | Self::ConfigLoad(_)
            | Self::ConfigInvalid { .. } => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
