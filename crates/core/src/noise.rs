//! Background noise estimates and the two SNR formulas.
//!
//! Both estimators aggregate one statistic per ROI by taking the arithmetic mean of the four
//! per-ROI values. This is a mean of statistics, not a statistic of the pooled voxels:
//! the two only agree when every ROI has the same voxel count and, for standard deviations,
//! the same mean.
//!
//! - Basic: `snr = mean_wm / mean(roi means)`
//! - Rician: `snr = 0.655 * mean_wm / mean(roi standard deviations)`

use crate::error::{Estimator, SnrError, SnrResult, Stage};
use crate::roi::{RoiLabel, RoiSet};
use crate::toolkit::{ImagingToolkit, Statistic};

/// One per-ROI noise statistic.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct RoiStatistic {
    pub label: RoiLabel,
    pub value: f64,
}

/// Result of one noise estimator.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct NoiseEstimate {
    pub estimator: Estimator,
    pub per_roi: Vec<RoiStatistic>,
    /// Mean of the per-ROI statistics.
    pub aggregate: f64,
    pub snr: f64,
}

impl Estimator {
    /// Statistic measured in each ROI.
    pub const fn statistic(self) -> Statistic {
        match self {
            Self::Basic => Statistic::Mean,
            Self::Rician => Statistic::StdDev,
        }
    }

    const fn stage(self) -> Stage {
        match self {
            Self::Basic => Stage::NoiseBasic,
            Self::Rician => Stage::NoiseRician,
        }
    }
}

/// Arithmetic mean of per-ROI statistics.
///
/// # Errors
///
/// Returns `SnrError::InvalidInput` for an empty slice.
pub fn mean_of_statistics(values: &[f64]) -> SnrResult<f64> {
    if values.is_empty() {
        return Err(SnrError::InvalidInput(
            "no ROI statistics to aggregate".into(),
        ));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// `mean_wm / mean(roi_means)`.
pub fn basic_snr(mean_wm: f64, roi_means: &[f64]) -> SnrResult<f64> {
    let mean_noise = mean_of_statistics(roi_means)?;
    ratio(Estimator::Basic, mean_wm, mean_noise)
}

/// `correction * mean_wm / mean(roi_std_devs)`.
pub fn rician_snr(mean_wm: f64, roi_std_devs: &[f64], correction: f64) -> SnrResult<f64> {
    let sd_noise = mean_of_statistics(roi_std_devs)?;
    ratio(Estimator::Rician, correction * mean_wm, sd_noise)
}

fn ratio(estimator: Estimator, numerator: f64, denominator: f64) -> SnrResult<f64> {
    if denominator == 0.0 {
        return Err(SnrError::DivisionByZero { estimator });
    }
    Ok(numerator / denominator)
}

/// Measures the estimator's statistic in each ROI.
pub fn measure_rois<T: ImagingToolkit + ?Sized>(
    toolkit: &T,
    rois: &RoiSet,
    estimator: Estimator,
) -> SnrResult<Vec<RoiStatistic>> {
    rois.iter()
        .map(|(region, volume)| {
            let value = toolkit
                .region_stat(volume, None, estimator.statistic())
                .map_err(|e| SnrError::tool(estimator.stage(), e))?;
            Ok(RoiStatistic {
                label: region.label,
                value,
            })
        })
        .collect()
}

/// Combines per-ROI statistics with the white-matter mean into an SNR value.
pub fn combine(
    estimator: Estimator,
    mean_wm: f64,
    per_roi: Vec<RoiStatistic>,
    rician_correction: f64,
) -> SnrResult<NoiseEstimate> {
    let values: Vec<f64> = per_roi.iter().map(|s| s.value).collect();
    let aggregate = mean_of_statistics(&values)?;
    let snr = match estimator {
        Estimator::Basic => basic_snr(mean_wm, &values)?,
        Estimator::Rician => rician_snr(mean_wm, &values, rician_correction)?,
    };
    Ok(NoiseEstimate {
        estimator,
        per_roi,
        aggregate,
        snr,
    })
}
