//! Background ROI generation.
//!
//! Noise is sampled from four cubes placed in the superior corners of the reoriented volume,
//! outside the head. Each corner is named by its side on the first two axes and is always at
//! the superior end of the third axis:
//!
//! | label | axis 1 | axis 2 | axis 3 |
//! |-------|--------|--------|--------|
//! | LAS   | far    | far    | far    |
//! | LPS   | far    | near   | far    |
//! | RPS   | near   | near   | far    |
//! | RAS   | near   | far    | far    |
//!
//! The near offset is the margin (20 voxels); the far offset is `dim - margin`.

use std::fmt;
use std::path::PathBuf;

use crate::constants::{ROI_MARGIN, ROI_SIZE};
use crate::error::{SnrError, SnrResult, Stage};
use crate::paths::volumes::VolumePaths;
use crate::preprocess::ensure_output;
use crate::toolkit::ImagingToolkit;

/// One of the four superior corners.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, serde::Serialize)]
pub enum RoiLabel {
    #[serde(rename = "LAS")]
    Las,
    #[serde(rename = "LPS")]
    Lps,
    #[serde(rename = "RPS")]
    Rps,
    #[serde(rename = "RAS")]
    Ras,
}

impl RoiLabel {
    /// Labels in reporting order.
    pub const ALL: [RoiLabel; 4] = [Self::Las, Self::Lps, Self::Rps, Self::Ras];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Las => "LAS",
            Self::Lps => "LPS",
            Self::Rps => "RPS",
            Self::Ras => "RAS",
        }
    }

    /// Whether the corner sits at the far end of axes 1 and 2.
    const fn far_sides(self) -> (bool, bool) {
        match self {
            Self::Las => (true, true),
            Self::Lps => (true, false),
            Self::Rps => (false, false),
            Self::Ras => (false, true),
        }
    }
}

impl fmt::Display for RoiLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Size and placement of the corner cubes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RoiGeometry {
    /// Edge length of each cube, in voxels.
    pub size: usize,
    /// Distance of the cube anchor from the volume edge, in voxels.
    pub margin: usize,
}

impl Default for RoiGeometry {
    fn default() -> Self {
        Self {
            size: ROI_SIZE,
            margin: ROI_MARGIN,
        }
    }
}

/// A cuboid sub-volume given as voxel offset and extent per axis.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize)]
pub struct RoiRegion {
    pub label: RoiLabel,
    pub offset: [usize; 3],
    pub extent: [usize; 3],
}

impl RoiRegion {
    /// Half-open voxel range covered on `axis`.
    pub fn span(&self, axis: usize) -> std::ops::Range<usize> {
        self.offset[axis]..self.offset[axis] + self.extent[axis]
    }

    /// Whether two regions share at least one voxel.
    pub fn overlaps(&self, other: &RoiRegion) -> bool {
        (0..3).all(|axis| {
            let (a, b) = (self.span(axis), other.span(axis));
            a.start < b.end && b.start < a.end
        })
    }
}

/// Computes the four corner regions for a volume of size `dims`.
///
/// # Errors
///
/// Returns `SnrError::Geometry` if:
/// - any dimension does not exceed the margin,
/// - a region would extend past the volume edge,
/// - the near and far regions on axis 1 or 2 would overlap.
pub fn corner_regions(dims: [usize; 3], geometry: RoiGeometry) -> SnrResult<[RoiRegion; 4]> {
    let RoiGeometry { size, margin } = geometry;

    if size == 0 {
        return Err(SnrError::Geometry("ROI size must be non-zero".into()));
    }

    for (axis, &dim) in dims.iter().enumerate() {
        if dim <= margin {
            return Err(SnrError::Geometry(format!(
                "dimension {} is {} voxels; must exceed the {} voxel margin",
                axis + 1,
                dim,
                margin
            )));
        }
        let far = dim - margin;
        if far + size > dim {
            return Err(SnrError::Geometry(format!(
                "far ROI on dimension {} ({}..{}) extends past {} voxels",
                axis + 1,
                far,
                far + size,
                dim
            )));
        }
    }

    for (axis, &dim) in dims.iter().take(2).enumerate() {
        let far = dim - margin;
        if margin + size > far {
            return Err(SnrError::Geometry(format!(
                "near and far ROIs overlap on dimension {} ({} voxels; need at least {})",
                axis + 1,
                dim,
                2 * margin + size
            )));
        }
    }

    let far = |axis: usize| dims[axis] - margin;
    Ok(RoiLabel::ALL.map(|label| {
        let (far1, far2) = label.far_sides();
        RoiRegion {
            label,
            offset: [
                if far1 { far(0) } else { margin },
                if far2 { far(1) } else { margin },
                far(2),
            ],
            extent: [size; 3],
        }
    }))
}

/// The four extracted ROI sub-volumes.
#[derive(Clone, Debug)]
pub struct RoiSet {
    pub regions: [RoiRegion; 4],
    pub volumes: [PathBuf; 4],
}

impl RoiSet {
    pub fn iter(&self) -> impl Iterator<Item = (&RoiRegion, &PathBuf)> {
        self.regions.iter().zip(self.volumes.iter())
    }
}

/// Extracts each region from `source` into its own volume.
pub fn extract_rois<T: ImagingToolkit + ?Sized>(
    toolkit: &T,
    paths: &VolumePaths,
    source: &std::path::Path,
    regions: [RoiRegion; 4],
) -> SnrResult<RoiSet> {
    let mut volumes: [PathBuf; 4] = Default::default();
    for (region, volume) in regions.iter().zip(volumes.iter_mut()) {
        let output = paths.roi(region.label);
        tracing::info!(
            "extracting ROI {} at offset {:?}",
            region.label,
            region.offset
        );
        toolkit
            .extract_roi(source, &output, region)
            .map_err(|e| SnrError::tool(Stage::RoiExtraction, e))?;
        ensure_output(Stage::RoiExtraction, &output)?;
        *volume = output;
    }

    Ok(RoiSet { regions, volumes })
}
