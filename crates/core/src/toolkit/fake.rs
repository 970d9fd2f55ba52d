//! In-process stand-in for the imaging toolkit, used by tests.
//!
//! Transforms write a small placeholder file at each output path. Statistics are canned: a
//! masked mean returns the configured white-matter mean, and an unmasked query on an ROI
//! volume returns that ROI's configured mean or standard deviation. Calls are recorded under
//! the name of the FSL tool they stand in for.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::{ImagingToolkit, Statistic, ToolkitError, VolumeInfo};
use crate::paths::volumes::{RoiSuffix, SegmentationSuffix};
use crate::roi::{RoiLabel, RoiRegion};

#[derive(Debug, Default)]
pub(crate) struct FakeToolkit {
    dims: [usize; 3],
    wm_mean: f64,
    roi_means: HashMap<RoiLabel, f64>,
    roi_std_devs: HashMap<RoiLabel, f64>,
    fail: Option<(&'static str, i32)>,
    omit_output: Option<&'static str>,
    calls: RefCell<Vec<String>>,
}

impl FakeToolkit {
    pub(crate) fn new(dims: [usize; 3], wm_mean: f64) -> Self {
        Self {
            dims,
            wm_mean,
            ..Self::default()
        }
    }

    pub(crate) fn with_dims(mut self, dims: [usize; 3]) -> Self {
        self.dims = dims;
        self
    }

    pub(crate) fn with_roi(mut self, label: RoiLabel, mean: f64, std_dev: f64) -> Self {
        self.roi_means.insert(label, mean);
        self.roi_std_devs.insert(label, std_dev);
        self
    }

    pub(crate) fn with_uniform_rois(self, mean: f64, std_dev: f64) -> Self {
        RoiLabel::ALL
            .iter()
            .fold(self, |fake, label| fake.with_roi(*label, mean, std_dev))
    }

    /// Makes every call of `tool` exit with `status`.
    pub(crate) fn failing(mut self, tool: &'static str, status: i32) -> Self {
        self.fail = Some((tool, status));
        self
    }

    /// Makes `tool` succeed without writing its output.
    pub(crate) fn omitting_output(mut self, tool: &'static str) -> Self {
        self.omit_output = Some(tool);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn call(&self, tool: &'static str) -> Result<(), ToolkitError> {
        self.calls.borrow_mut().push(tool.to_string());
        match self.fail {
            Some((failing, status)) if failing == tool => Err(ToolkitError::Failed {
                tool: tool.to_string(),
                status: Some(status),
                stderr: format!("{tool}: simulated failure"),
            }),
            _ => Ok(()),
        }
    }

    fn write(&self, tool: &'static str, output: &Path) -> Result<(), ToolkitError> {
        if self.omit_output == Some(tool) {
            return Ok(());
        }
        fs::write(output, tool).map_err(|source| ToolkitError::Launch {
            tool: tool.to_string(),
            source,
        })
    }

    fn roi_label(volume: &Path) -> Option<RoiLabel> {
        let name = volume.file_name()?.to_str()?;
        RoiLabel::ALL
            .into_iter()
            .find(|label| name.contains(&format!("{}{}.", RoiSuffix::NAME, label)))
    }
}

impl ImagingToolkit for FakeToolkit {
    fn volume_info(&self, _volume: &Path) -> Result<VolumeInfo, ToolkitError> {
        self.call("fslinfo")?;
        Ok(VolumeInfo {
            dims: self.dims,
            pixdims: [1.0; 3],
            data_type: "FLOAT32".to_string(),
        })
    }

    fn reorient_to_standard(&self, _input: &Path, output: &Path) -> Result<(), ToolkitError> {
        self.call("fslreorient2std")?;
        self.write("fslreorient2std", output)
    }

    fn extract_brain(
        &self,
        _input: &Path,
        output: &Path,
        _fractional_threshold: f64,
    ) -> Result<(), ToolkitError> {
        self.call("bet")?;
        self.write("bet", output)
    }

    fn segment_tissues(
        &self,
        _input: &Path,
        output_base: &Path,
        classes: usize,
    ) -> Result<(), ToolkitError> {
        self.call("fast")?;
        for index in 0..classes {
            let mut name = output_base.as_os_str().to_owned();
            name.push(format!("{}{}.nii.gz", SegmentationSuffix::PVE, index));
            self.write("fast", Path::new(&name))?;
        }
        Ok(())
    }

    fn threshold_binarize(
        &self,
        _input: &Path,
        output: &Path,
        _threshold: f64,
    ) -> Result<(), ToolkitError> {
        self.call("fslmaths")?;
        self.write("fslmaths", output)
    }

    fn region_stat(
        &self,
        volume: &Path,
        mask: Option<&Path>,
        stat: Statistic,
    ) -> Result<f64, ToolkitError> {
        self.call("fslstats")?;
        if mask.is_some() {
            return Ok(self.wm_mean);
        }

        let unparseable = || ToolkitError::UnparseableOutput {
            tool: "fslstats".to_string(),
            output: format!("no canned {stat} for {}", volume.display()),
        };
        let label = Self::roi_label(volume).ok_or_else(unparseable)?;
        let table = match stat {
            Statistic::Mean => &self.roi_means,
            Statistic::StdDev => &self.roi_std_devs,
        };
        table.get(&label).copied().ok_or_else(unparseable)
    }

    fn extract_roi(
        &self,
        _input: &Path,
        output: &Path,
        _region: &RoiRegion,
    ) -> Result<(), ToolkitError> {
        self.call("fslroi")?;
        self.write("fslroi", output)
    }
}
