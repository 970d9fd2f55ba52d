//! Constants used throughout the SNR core crate.
//!
//! Tool parameters, naming conventions and formula constants are defined here so that the
//! pipeline, the toolkit implementation and the tests agree on a single value.

/// Prefix of the per-run workspace directory and log file (`snr_<base>`).
pub const WORKSPACE_PREFIX: &str = "snr_";

/// Extension of the per-run log file.
pub const LOG_EXTENSION: &str = "txt";

/// Extension of every volume written by the pipeline.
pub const VOLUME_EXTENSION: &str = "nii.gz";

/// Default parent directory for workspaces when no explicit directory is configured.
pub const DEFAULT_OUTPUT_DIR: &str = ".";

/// Default fractional intensity threshold for brain extraction.
pub const DEFAULT_BET_THRESHOLD: f64 = 0.3;

/// Default threshold applied to the white-matter partial-volume map.
pub const DEFAULT_WM_THRESHOLD: f64 = 0.5;

/// Number of tissue classes requested from segmentation (CSF, grey matter, white matter).
pub const TISSUE_CLASSES: usize = 3;

/// Partial-volume map index holding white matter in the segmentation tool's convention.
pub const WHITE_MATTER_PVE_INDEX: usize = 2;

/// Edge length, in voxels, of each background ROI cube.
pub const ROI_SIZE: usize = 10;

/// Distance, in voxels, of the ROI anchor from the volume edge.
pub const ROI_MARGIN: usize = 20;

/// Correction for the Rician distribution of background noise in magnitude images.
pub const RICIAN_CORRECTION: f64 = 0.655;

/// Output type forced on every FSL child process.
pub const FSL_OUTPUT_TYPE: &str = "NIFTI_GZ";
