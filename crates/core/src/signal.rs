//! White-matter signal estimate.

use std::path::Path;

use crate::error::{SnrError, SnrResult, Stage};
use crate::toolkit::{ImagingToolkit, Statistic};

/// Mean intensity of the skull-stripped volume inside the white-matter mask.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct SignalEstimate {
    pub mean_wm: f64,
}

/// Computes the mean of `brain` restricted to the voxels of `wm_mask`.
pub fn estimate_signal<T: ImagingToolkit + ?Sized>(
    toolkit: &T,
    brain: &Path,
    wm_mask: &Path,
) -> SnrResult<SignalEstimate> {
    let mean_wm = toolkit
        .region_stat(brain, Some(wm_mask), Statistic::Mean)
        .map_err(|e| SnrError::tool(Stage::SignalEstimate, e))?;
    Ok(SignalEstimate { mean_wm })
}
