//! # SNR Core
//!
//! Signal-to-noise estimation for 3D brain MRI volumes.
//!
//! The image processing itself (reorientation, brain extraction, tissue segmentation,
//! thresholding, ROI statistics) is delegated to an external toolkit behind the
//! [`ImagingToolkit`] trait. This crate owns the orchestration around it:
//! - workspace and file bookkeeping under `snr_<base>/`
//! - placement of the four background ROIs
//! - the basic and Rician-corrected SNR formulas
//! - the per-run plain-text log
//!
//! **No CLI concerns**: argument parsing, environment lookup and exit codes belong in the
//! `snr` binary.

pub mod config;
pub mod constants;
pub mod error;
pub mod input;
pub mod noise;
pub mod paths;
pub mod pipeline;
pub mod preprocess;
pub mod report;
pub mod roi;
pub mod signal;
pub mod toolkit;
pub mod workspace;

pub use config::CoreConfig;
pub use error::{Estimator, SnrError, SnrResult, Stage};
pub use input::InputImage;
pub use pipeline::{SnrPipeline, SnrReport};
pub use snr_types::BaseName;
pub use toolkit::{FslToolkit, ImagingToolkit, ToolkitError};
