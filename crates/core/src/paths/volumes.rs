//! Derived volume paths.
//!
//! Every image the pipeline writes has a deterministic name built from the base name and a
//! stage suffix. This module contains **no I/O**; it only joins names onto the workspace
//! directory so that naming invariants are defined in exactly one place.
//!
//! # Layout
//!
//! ```text
//! snr_<base>/
//!     <input file name>                 staged copy of the input
//!     <base>_reoriented.nii.gz
//!     <base>_brain.nii.gz
//!     <base>_brain_seg_pve_{0,1,2}.nii.gz
//!     <base>_wm_mask.nii.gz
//!     <base>_roi_{LAS,LPS,RPS,RAS}.nii.gz
//! ```

use std::path::PathBuf;

use snr_types::BaseName;

use crate::constants::{TISSUE_CLASSES, VOLUME_EXTENSION};
use crate::roi::RoiLabel;

/// Suffix of the volume reoriented to the standard axis convention.
#[derive(Debug, Clone, Copy)]
pub struct ReorientedSuffix;

impl ReorientedSuffix {
    pub const NAME: &'static str = "_reoriented";
}

/// Suffix of the skull-stripped volume.
#[derive(Debug, Clone, Copy)]
pub struct BrainSuffix;

impl BrainSuffix {
    pub const NAME: &'static str = "_brain";
}

/// Suffix of the segmentation output base, appended after [`BrainSuffix`].
///
/// The segmentation tool appends `_pve_<index>` to this base for each tissue class.
#[derive(Debug, Clone, Copy)]
pub struct SegmentationSuffix;

impl SegmentationSuffix {
    pub const NAME: &'static str = "_seg";
    pub const PVE: &'static str = "_pve_";
}

/// Suffix of the binarised white-matter mask.
#[derive(Debug, Clone, Copy)]
pub struct WhiteMatterMaskSuffix;

impl WhiteMatterMaskSuffix {
    pub const NAME: &'static str = "_wm_mask";
}

/// Suffix prefix of a background ROI sub-volume, followed by the ROI label.
#[derive(Debug, Clone, Copy)]
pub struct RoiSuffix;

impl RoiSuffix {
    pub const NAME: &'static str = "_roi_";
}

/// Absolute paths of the volumes derived during one run.
#[derive(Debug, Clone)]
pub struct VolumePaths {
    root: PathBuf,
    base: BaseName,
}

impl VolumePaths {
    /// Creates the path set for `base` inside the workspace directory `root`.
    pub fn new(root: impl Into<PathBuf>, base: BaseName) -> Self {
        Self {
            root: root.into(),
            base,
        }
    }

    pub fn reoriented(&self) -> PathBuf {
        self.volume(ReorientedSuffix::NAME)
    }

    pub fn brain(&self) -> PathBuf {
        self.volume(BrainSuffix::NAME)
    }

    /// Output base handed to the segmentation tool (no extension).
    pub fn segmentation_base(&self) -> PathBuf {
        self.root.join(format!(
            "{}{}{}",
            self.base,
            BrainSuffix::NAME,
            SegmentationSuffix::NAME
        ))
    }

    /// Partial-volume map for tissue class `index`.
    pub fn partial_volume(&self, index: usize) -> PathBuf {
        self.volume(&format!(
            "{}{}{}{}",
            BrainSuffix::NAME,
            SegmentationSuffix::NAME,
            SegmentationSuffix::PVE,
            index
        ))
    }

    pub fn white_matter_mask(&self) -> PathBuf {
        self.volume(WhiteMatterMaskSuffix::NAME)
    }

    pub fn roi(&self, label: RoiLabel) -> PathBuf {
        self.volume(&format!("{}{}", RoiSuffix::NAME, label))
    }

    /// Every volume a run derives, in the order the stages write them.
    pub fn derived(&self) -> Vec<PathBuf> {
        let mut volumes = vec![self.reoriented(), self.brain()];
        volumes.extend((0..TISSUE_CLASSES).map(|i| self.partial_volume(i)));
        volumes.push(self.white_matter_mask());
        volumes.extend(RoiLabel::ALL.iter().map(|label| self.roi(*label)));
        volumes
    }

    fn volume(&self, suffix: &str) -> PathBuf {
        self.root
            .join(format!("{}{}.{}", self.base, suffix, VOLUME_EXTENSION))
    }
}
