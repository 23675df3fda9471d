//! Uploaded files and their extension-based classification.

use std::fmt;
use std::io::{Read, Seek};

use crate::blob::BlobReader;
use crate::util::file_extension;

/// How an uploaded file is routed through the merge pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Converted to a single-page PDF before merging
    Image,
    /// Passed to the merge unchanged
    Pdf,
    /// Skipped without failing the batch
    Unsupported,
}

impl FileKind {
    /// Classify by extension (lowercased, with leading dot).
    pub fn from_extension(extension: &str) -> Self {
        match extension {
            ".png" | ".jpg" | ".jpeg" => Self::Image,
            ".pdf" => Self::Pdf,
            _ => Self::Unsupported,
        }
    }

    /// Check that `data` starts like the format this kind expects.
    ///
    /// `Unsupported` always matches since its content is never used.
    pub fn matches_content(self, data: &[u8]) -> bool {
        match self {
            Self::Image => matches!(
                image::guess_format(data),
                Ok(image::ImageFormat::Png | image::ImageFormat::Jpeg)
            ),
            Self::Pdf => {
                let start = data
                    .iter()
                    .position(|b| !b.is_ascii_whitespace())
                    .unwrap_or(data.len());
                data[start..].starts_with(b"%PDF-")
            }
            Self::Unsupported => true,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Image => "PNG or JPEG image",
            Self::Pdf => "PDF",
            Self::Unsupported => "unsupported",
        }
    }
}

/// One uploaded part, owned by the orchestrator for the duration of a request.
///
/// The content stream is released when the item is dropped.
pub struct UploadedItem {
    filename: String,
    extension: String,
    content: Box<dyn BlobReader>,
}

impl UploadedItem {
    pub fn new(filename: impl Into<String>, content: Box<dyn BlobReader>) -> Self {
        let filename = filename.into();
        let extension = file_extension(&filename);
        Self {
            filename,
            extension,
            content,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn kind(&self) -> FileKind {
        FileKind::from_extension(&self.extension)
    }

    /// Read the whole content from the start of the stream.
    pub fn read_all(&mut self) -> std::io::Result<Vec<u8>> {
        self.content.rewind()?;
        let mut data = Vec::new();
        self.content.read_to_end(&mut data)?;
        Ok(data)
    }
}

impl fmt::Debug for UploadedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedItem")
            .field("filename", &self.filename)
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}
