//! Input image resolution.

use std::path::{Path, PathBuf};

use snr_types::BaseName;

use crate::{SnrError, SnrResult};

/// The image supplied on the command line.
#[derive(Clone, Debug)]
pub struct InputImage {
    path: PathBuf,
    base_name: BaseName,
}

impl InputImage {
    /// Validates that `path` names an existing regular file and derives its base name.
    ///
    /// # Errors
    ///
    /// - `SnrError::InputNotFound` if nothing exists at `path` or it is not a file
    /// - `SnrError::InvalidInput` if no usable base name can be derived
    pub fn resolve(path: impl Into<PathBuf>) -> SnrResult<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(SnrError::InputNotFound(path));
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                SnrError::InvalidInput(format!(
                    "file name is not valid UTF-8: {}",
                    path.display()
                ))
            })?;

        let base_name = BaseName::from_image_file_name(file_name)
            .map_err(|e| SnrError::InvalidInput(format!("{}: {e}", path.display())))?;

        Ok(Self { path, base_name })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn base_name(&self) -> &BaseName {
        &self.base_name
    }

    /// File name of the input, kept unchanged when staged into the workspace.
    pub fn file_name(&self) -> &str {
        // `resolve` has already checked the name is valid UTF-8.
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}
