//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into the pipeline. The library never reads process-wide environment variables
//! itself; the binary reads them and hands the raw values to the parsing helpers below.

use crate::constants::{
    DEFAULT_BET_THRESHOLD, DEFAULT_OUTPUT_DIR, DEFAULT_WM_THRESHOLD, RICIAN_CORRECTION,
};
use crate::roi::RoiGeometry;
use crate::{SnrError, SnrResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    output_dir: PathBuf,
    fsl_dir: Option<PathBuf>,
    bet_threshold: f64,
    wm_threshold: f64,
    roi_geometry: RoiGeometry,
    rician_correction: f64,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// Both thresholds must lie strictly between 0 and 1.
    pub fn new(
        output_dir: PathBuf,
        fsl_dir: Option<PathBuf>,
        bet_threshold: f64,
        wm_threshold: f64,
    ) -> SnrResult<Self> {
        validate_fraction("brain extraction threshold", bet_threshold)?;
        validate_fraction("white matter threshold", wm_threshold)?;

        Ok(Self {
            output_dir,
            fsl_dir,
            bet_threshold,
            wm_threshold,
            roi_geometry: RoiGeometry::default(),
            rician_correction: RICIAN_CORRECTION,
        })
    }

    /// Configuration with default tool parameters, writing workspaces under `output_dir`.
    pub fn with_output_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            fsl_dir: None,
            bet_threshold: DEFAULT_BET_THRESHOLD,
            wm_threshold: DEFAULT_WM_THRESHOLD,
            roi_geometry: RoiGeometry::default(),
            rician_correction: RICIAN_CORRECTION,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn fsl_dir(&self) -> Option<&Path> {
        self.fsl_dir.as_deref()
    }

    pub fn bet_threshold(&self) -> f64 {
        self.bet_threshold
    }

    pub fn wm_threshold(&self) -> f64 {
        self.wm_threshold
    }

    pub fn roi_geometry(&self) -> RoiGeometry {
        self.roi_geometry
    }

    pub fn rician_correction(&self) -> f64 {
        self.rician_correction
    }
}

fn validate_fraction(name: &str, value: f64) -> SnrResult<()> {
    if value.is_finite() && value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(SnrError::Config(format!(
            "{name} must be between 0 and 1 (exclusive), got {value}"
        )))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve the workspace parent directory from an optional value.
///
/// If `value` is `None` or empty/whitespace, returns the current directory.
pub fn output_dir_from_env_value(value: Option<String>) -> PathBuf {
    non_blank(value)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
}

/// Resolve the FSL install root from an optional value.
///
/// If `value` is `None` or empty/whitespace, tools are looked up on `PATH`.
pub fn fsl_dir_from_env_value(value: Option<String>) -> Option<PathBuf> {
    non_blank(value).map(PathBuf::from)
}

/// Parse a threshold from an optional value, falling back to `default`.
///
/// `name` is the variable name used in the error message.
pub fn threshold_from_env_value(
    name: &str,
    value: Option<String>,
    default: f64,
) -> SnrResult<f64> {
    let Some(value) = non_blank(value) else {
        return Ok(default);
    };
    let parsed = value
        .parse::<f64>()
        .map_err(|e| SnrError::Config(format!("{name}={value:?} is not a number: {e}")))?;
    validate_fraction(name, parsed)?;
    Ok(parsed)
}
