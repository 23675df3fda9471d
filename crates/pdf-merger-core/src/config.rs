use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where uploaded parts are held while a request is processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// In-memory buffers, dropped with the request
    #[default]
    Memory,
    /// One temporary directory per request, deleted with the request
    TempDir,
}

impl StorageBackend {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::TempDir => "temp_dir",
        }
    }
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Blob storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Parent directory for per-request temp directories (defaults to the system temp dir)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

/// Upload size and batch limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadLimits {
    /// Maximum number of `files[]` parts per request
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Maximum size of a single part in bytes
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Maximum size of the whole request body in bytes
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
}

const fn default_max_files() -> usize {
    100
}

const fn default_max_file_bytes() -> u64 {
    50 * 1024 * 1024
}

const fn default_max_request_bytes() -> usize {
    300 * 1024 * 1024
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_file_bytes: default_max_file_bytes(),
            max_request_bytes: default_max_request_bytes(),
        }
    }
}

/// Content validation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Reject files whose bytes do not match their extension.
    ///
    /// Off by default: classification is then a pure function of the filename.
    #[serde(default)]
    pub sniff_content: bool,
}

/// Page size used when turning an image into a PDF page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSize {
    /// Page matches the image dimensions
    #[default]
    Image,
    /// ISO A4 portrait, image fitted inside the margins
    A4,
    /// US Letter portrait, image fitted inside the margins
    Letter,
}

impl PageSize {
    /// Fixed page dimensions in points, `None` for [`PageSize::Image`].
    pub const fn dimensions(self) -> Option<(f32, f32)> {
        match self {
            Self::Image => None,
            Self::A4 => Some((595.28, 841.89)),
            Self::Letter => Some((612.0, 792.0)),
        }
    }
}

/// Image to PDF conversion options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    #[serde(default)]
    pub page_size: PageSize,

    /// Pixels per inch used to size `image` pages (72 means one pixel per point)
    #[serde(default = "default_dpi")]
    pub dpi: f32,

    /// Margin in points for fixed page sizes
    #[serde(default)]
    pub margin: f32,
}

const fn default_dpi() -> f32 {
    72.0
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::default(),
            dpi: default_dpi(),
            margin: 0.0,
        }
    }
}

/// PDF merge options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Insert a blank page between merged documents
    #[serde(default)]
    pub divider_page: bool,

    /// Compress streams in the merged output
    #[serde(default = "default_true")]
    pub compress: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            divider_page: false,
            compress: true,
        }
    }
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub limits: UploadLimits,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub conversion: ConversionConfig,

    #[serde(default)]
    pub merge: MergeConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8080
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            storage: StorageConfig::default(),
            limits: UploadLimits::default(),
            validation: ValidationConfig::default(),
            conversion: ConversionConfig::default(),
            merge: MergeConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::error::Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            crate::error::Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, crate::error::Error> {
        toml::from_str(content)
            .map_err(|e| crate::error::Error::ConfigLoad(format!("Failed to parse config: {e}")))
    }

    /// Load from default locations (~/.config/pdf-merger/config.toml, ./config.toml)
    pub fn load() -> Self {
        // Try user config
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("pdf-merger").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // Try local config
        let local_config = PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Self::default()
    }

    /// Check values that would make every request fail.
    pub fn validate(&self) -> Result<(), crate::error::Error> {
        let invalid = |field: &str, reason: &str| crate::error::Error::ConfigInvalid {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.limits.max_files == 0 {
            return Err(invalid("limits.max_files", "must be at least 1"));
        }
        if self.limits.max_file_bytes == 0 {
            return Err(invalid("limits.max_file_bytes", "must be at least 1"));
        }
        if self.limits.max_request_bytes == 0 {
            return Err(invalid("limits.max_request_bytes", "must be at least 1"));
        }
        if !(self.conversion.dpi.is_finite() && self.conversion.dpi > 0.0) {
            return Err(invalid("conversion.dpi", "must be a positive number"));
        }
        if !(self.conversion.margin.is_finite() && self.conversion.margin >= 0.0) {
            return Err(invalid("conversion.margin", "must be zero or positive"));
        }
        if let Some((width, height)) = self.conversion.page_size.dimensions()
            && (self.conversion.margin * 2.0 >= width || self.conversion.margin * 2.0 >= height)
        {
            return Err(invalid("conversion.margin", "leaves no room on the page"));
        }

        Ok(())
    }
}
