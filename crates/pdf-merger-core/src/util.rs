//! Utility functions shared across the crate.

use std::path::PathBuf;

/// Get the user's config directory following XDG conventions.
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Extension of the last path component, lowercased, including the leading dot.
///
/// Returns an empty string when the name has no dot. A name that starts with
/// its only dot (".pdf") is treated as all extension.
pub fn file_extension(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    base.rfind('.')
        .map(|idx| base[idx..].to_ascii_lowercase())
        .unwrap_or_default()
}
