//! Imaging toolkit seam.
//!
//! Every image-processing step is delegated to an external toolkit. The pipeline only talks to
//! the [`ImagingToolkit`] trait: volume transforms write a new file at a caller-chosen path,
//! and statistics queries return a single floating-point number.
//!
//! [`FslToolkit`] drives the FSL command-line tools. Tests substitute a fake that writes
//! placeholder files and returns canned statistics.

mod fsl;

#[cfg(test)]
pub(crate) mod fake;

pub use fsl::FslToolkit;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::roi::RoiRegion;

/// Errors raised by a toolkit implementation.
///
/// These carry no pipeline context; the driver wraps them with the failing
/// [`Stage`](crate::Stage).
#[derive(Debug, thiserror::Error)]
pub enum ToolkitError {
    #[error("failed to launch {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} exited with {}", describe_exit(.status, .stderr))]
    Failed {
        tool: String,
        status: Option<i32>,
        stderr: String,
    },
    #[error("could not parse output of {tool}: {output:?}")]
    UnparseableOutput { tool: String, output: String },
    #[error("expected output was not written: {}", .path.display())]
    MissingOutput { path: PathBuf },
}

impl ToolkitError {
    /// Exit status of the failing tool, when it ran to completion.
    pub fn status(&self) -> Option<i32> {
        match self {
            Self::Failed { status, .. } => *status,
            _ => None,
        }
    }
}

fn describe_exit(status: &Option<i32>, stderr: &str) -> String {
    let status = match status {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    };
    let stderr = stderr.trim();
    if stderr.is_empty() {
        status
    } else {
        format!("{status}: {stderr}")
    }
}

/// Voxel statistic computed over a volume, optionally restricted to a mask.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Statistic {
    Mean,
    StdDev,
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mean => f.write_str("mean"),
            Self::StdDev => f.write_str("standard deviation"),
        }
    }
}

/// Header metadata of a 3D volume.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct VolumeInfo {
    /// Voxel counts along the three spatial axes.
    pub dims: [usize; 3],
    /// Voxel sizes along the three spatial axes.
    pub pixdims: [f64; 3],
    /// Storage data type as reported by the toolkit.
    pub data_type: String,
}

impl VolumeInfo {
    /// Report lines recorded for provenance.
    pub fn describe(&self) -> Vec<String> {
        vec![
            format!(
                "dimensions: {} x {} x {}",
                self.dims[0], self.dims[1], self.dims[2]
            ),
            format!(
                "voxel size: {:.6} x {:.6} x {:.6}",
                self.pixdims[0], self.pixdims[1], self.pixdims[2]
            ),
            format!("data type: {}", self.data_type),
        ]
    }
}

/// Operations the SNR pipeline needs from an imaging toolkit.
///
/// Transforms must write exactly one new file at `output` (segmentation writes one
/// partial-volume map per class next to `output_base`). All calls block until finished.
pub trait ImagingToolkit {
    /// Queries dimensions, voxel size and data type.
    fn volume_info(&self, volume: &Path) -> Result<VolumeInfo, ToolkitError>;

    /// Reorients to the standard axis convention (axis permutation/flip only).
    fn reorient_to_standard(&self, input: &Path, output: &Path) -> Result<(), ToolkitError>;

    /// Skull-strips `input` with bias-field correction enabled.
    fn extract_brain(
        &self,
        input: &Path,
        output: &Path,
        fractional_threshold: f64,
    ) -> Result<(), ToolkitError>;

    /// Segments into `classes` tissue types, writing `<output_base>_pve_<i>` maps.
    fn segment_tissues(
        &self,
        input: &Path,
        output_base: &Path,
        classes: usize,
    ) -> Result<(), ToolkitError>;

    /// Zeroes voxels below `threshold` and sets the rest to one.
    fn threshold_binarize(
        &self,
        input: &Path,
        output: &Path,
        threshold: f64,
    ) -> Result<(), ToolkitError>;

    /// Computes `stat` over `volume`, restricted to non-zero voxels of `mask` when given.
    fn region_stat(
        &self,
        volume: &Path,
        mask: Option<&Path>,
        stat: Statistic,
    ) -> Result<f64, ToolkitError>;

    /// Extracts the sub-volume described by `region`.
    fn extract_roi(
        &self,
        input: &Path,
        output: &Path,
        region: &RoiRegion,
    ) -> Result<(), ToolkitError>;
}
