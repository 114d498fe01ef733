//! Object key classification and output path derivation
//!
//! The output path of an object is a pure function of its key, the folder
//! prefix and the output root. The batch relies on that: an existing file at
//! the derived path is the only record that an item has been processed.

use std::path::{Component, Path, PathBuf};

/// Extension of everything the removal API returns
pub const CANONICAL_EXTENSION: &str = "png";

/// Extensions the batch picks up from the bucket
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "webp", "jpeg", "jpg"];

/// Extensions rewritten to [`CANONICAL_EXTENSION`] in the output path
pub const CONVERTIBLE_EXTENSIONS: &[&str] = &["jpeg", "jpg", "webp"];

/// Extension of the last path segment of an object key, if any
pub fn key_extension(key: &str) -> Option<&str> {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Some(ext),
        _ => None,
    }
}

fn extension_in(key: &str, set: &[&str]) -> bool {
    key_extension(key).is_some_and(|ext| set.iter().any(|s| ext.eq_ignore_ascii_case(s)))
}

/// Whether the key names one of the supported image types (case-insensitive)
pub fn is_supported_image(key: &str) -> bool {
    extension_in(key, SUPPORTED_EXTENSIONS)
}

/// Whether the key's extension is relabelled to the canonical output format
pub fn is_convertible(key: &str) -> bool {
    extension_in(key, CONVERTIBLE_EXTENSIONS)
}

/// Maps object keys to local output paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    folder_prefix: String,
    output_root: PathBuf,
}

impl OutputLayout {
    pub fn new<S: Into<String>, P: Into<PathBuf>>(folder_prefix: S, output_root: P) -> Self {
        Self {
            folder_prefix: folder_prefix.into(),
            output_root: output_root.into(),
        }
    }

    /// Key relative to the folder prefix, with the extension normalised
    ///
    /// Keys outside the prefix are used whole.
    pub fn relative_key(&self, key: &str) -> String {
        let relative = key.strip_prefix(&self.folder_prefix).unwrap_or(key);

        if is_convertible(relative) {
            if let Some(stem) = key_extension(relative).and_then(|ext| relative.strip_suffix(ext)) {
                return format!("{stem}{CANONICAL_EXTENSION}");
            }
        }

        relative.to_string()
    }

    /// Local path the processed image for `key` is written to
    ///
    /// Only normal components of the relative key are kept, so `..`, `.` and
    /// absolute segments can never lead outside the output root.
    pub fn output_path(&self, key: &str) -> PathBuf {
        let relative = self.relative_key(key);
        let mut path = self.output_root.clone();
        for component in Path::new(&relative).components() {
            if let Component::Normal(part) = component {
                path.push(part);
            }
        }
        path
    }
}
