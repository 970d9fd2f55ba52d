//! Validated text types shared across the SNR workspace.

/// Compressed NIfTI suffix stripped when deriving a base name.
pub const NIFTI_GZ_SUFFIX: &str = ".nii.gz";

/// Uncompressed NIfTI suffix, stripped when the compressed one is absent.
pub const NIFTI_SUFFIX: &str = ".nii";

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The input contained a path separator
    #[error("Name must not contain a path separator: {0}")]
    PathSeparator(String),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    pub(crate) fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

/// The stem of an input image, used to name the workspace and every derived volume.
///
/// A `BaseName` is non-empty and never contains a path separator, so it is always safe to
/// embed in a single path component such as `snr_<base>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseName(NonEmptyText);

impl BaseName {
    /// Creates a `BaseName` from an already-stripped stem.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let text = NonEmptyText::new(input)?;
        if text.as_str().contains(['/', '\\']) {
            return Err(TextError::PathSeparator(text.to_string()));
        }
        Ok(Self(text))
    }

    /// Derives a `BaseName` from an image file name.
    ///
    /// `.nii.gz` is stripped first, then `.nii`. Any other name keeps everything up to its
    /// last `.` (or the whole name when there is no extension).
    pub fn from_image_file_name(file_name: &str) -> Result<Self, TextError> {
        let stem = if let Some(stem) = file_name.strip_suffix(NIFTI_GZ_SUFFIX) {
            stem
        } else if let Some(stem) = file_name.strip_suffix(NIFTI_SUFFIX) {
            stem
        } else {
            match file_name.rsplit_once('.') {
                Some((stem, _)) if !stem.is_empty() => stem,
                _ => file_name,
            }
        };
        Self::new(stem)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for BaseName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for BaseName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl serde::Serialize for BaseName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serde::Serialize::serialize(&self.0, serializer)
    }
}
