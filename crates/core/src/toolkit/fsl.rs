//! FSL command-line implementation of [`ImagingToolkit`].
//!
//! Each operation maps onto one FSL tool invoked as a blocking child process:
//!
//! | operation              | command                                        |
//! |------------------------|------------------------------------------------|
//! | `volume_info`          | `fslinfo <vol>`                                |
//! | `reorient_to_standard` | `fslreorient2std <in> <out>`                   |
//! | `extract_brain`        | `bet <in> <out> -f <f> -B`                     |
//! | `segment_tissues`      | `fast -t 1 -n <classes> -o <base> <in>`        |
//! | `threshold_binarize`   | `fslmaths <in> -thr <t> -bin <out>`            |
//! | `region_stat`          | `fslstats <vol> [-k <mask>] -m\|-s`            |
//! | `extract_roi`          | `fslroi <in> <out> x nx y ny z nz`             |
//!
//! `FSLOUTPUTTYPE` is forced to `NIFTI_GZ` so outputs land at the `.nii.gz` paths the
//! pipeline expects.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use super::{ImagingToolkit, Statistic, ToolkitError, VolumeInfo};
use crate::constants::FSL_OUTPUT_TYPE;
use crate::roi::RoiRegion;

const FSLINFO: &str = "fslinfo";
const FSLREORIENT2STD: &str = "fslreorient2std";
const BET: &str = "bet";
const FAST: &str = "fast";
const FSLMATHS: &str = "fslmaths";
const FSLSTATS: &str = "fslstats";
const FSLROI: &str = "fslroi";

/// Runs FSL tools from `$FSLDIR/bin`, or from `PATH` when no install root is configured.
#[derive(Clone, Debug, Default)]
pub struct FslToolkit {
    bin_dir: Option<PathBuf>,
}

impl FslToolkit {
    /// Creates a toolkit rooted at an FSL install directory (`FSLDIR`).
    pub fn new(fsl_dir: Option<&Path>) -> Self {
        Self {
            bin_dir: fsl_dir.map(|dir| dir.join("bin")),
        }
    }

    /// Creates a toolkit whose tools live directly in `bin_dir`.
    pub fn with_bin_dir(bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: Some(bin_dir.into()),
        }
    }

    /// Checks that the FSL tools can be launched at all.
    ///
    /// `fslinfo` with no arguments prints usage and exits non-zero, so only a launch
    /// failure counts as unavailable.
    pub fn check_available(&self) -> Result<(), ToolkitError> {
        self.command(FSLINFO)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|_| ())
            .map_err(|source| ToolkitError::Launch {
                tool: FSLINFO.to_string(),
                source,
            })
    }

    fn program(&self, tool: &str) -> PathBuf {
        match &self.bin_dir {
            Some(dir) => dir.join(tool),
            None => PathBuf::from(tool),
        }
    }

    fn command(&self, tool: &str) -> Command {
        let mut cmd = Command::new(self.program(tool));
        cmd.env("FSLOUTPUTTYPE", FSL_OUTPUT_TYPE);
        cmd
    }

    /// Runs `tool` with `args` and returns its output if it exited successfully.
    fn run<I, S>(&self, tool: &str, args: I) -> Result<Output, ToolkitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = self.command(tool);
        cmd.args(args).stdin(Stdio::null());

        tracing::debug!("Command: {:?}", cmd);

        let output = cmd.output().map_err(|source| ToolkitError::Launch {
            tool: tool.to_string(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            tracing::debug!("{} failed ({}): {}", tool, output.status, stderr.trim());
            return Err(ToolkitError::Failed {
                tool: tool.to_string(),
                status: output.status.code(),
                stderr,
            });
        }

        Ok(output)
    }
}

impl ImagingToolkit for FslToolkit {
    fn volume_info(&self, volume: &Path) -> Result<VolumeInfo, ToolkitError> {
        let output = self.run(FSLINFO, [volume])?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_volume_info(&stdout).ok_or_else(|| ToolkitError::UnparseableOutput {
            tool: FSLINFO.to_string(),
            output: stdout.into_owned(),
        })
    }

    fn reorient_to_standard(&self, input: &Path, output: &Path) -> Result<(), ToolkitError> {
        self.run(FSLREORIENT2STD, [input, output])?;
        Ok(())
    }

    fn extract_brain(
        &self,
        input: &Path,
        output: &Path,
        fractional_threshold: f64,
    ) -> Result<(), ToolkitError> {
        let threshold = fractional_threshold.to_string();
        self.run(
            BET,
            [
                input.as_os_str(),
                output.as_os_str(),
                OsStr::new("-f"),
                OsStr::new(&threshold),
                OsStr::new("-B"),
            ],
        )?;
        Ok(())
    }

    fn segment_tissues(
        &self,
        input: &Path,
        output_base: &Path,
        classes: usize,
    ) -> Result<(), ToolkitError> {
        let classes = classes.to_string();
        self.run(
            FAST,
            [
                OsStr::new("-t"),
                OsStr::new("1"),
                OsStr::new("-n"),
                OsStr::new(&classes),
                OsStr::new("-o"),
                output_base.as_os_str(),
                input.as_os_str(),
            ],
        )?;
        Ok(())
    }

    fn threshold_binarize(
        &self,
        input: &Path,
        output: &Path,
        threshold: f64,
    ) -> Result<(), ToolkitError> {
        let threshold = threshold.to_string();
        self.run(
            FSLMATHS,
            [
                input.as_os_str(),
                OsStr::new("-thr"),
                OsStr::new(&threshold),
                OsStr::new("-bin"),
                output.as_os_str(),
            ],
        )?;
        Ok(())
    }

    fn region_stat(
        &self,
        volume: &Path,
        mask: Option<&Path>,
        stat: Statistic,
    ) -> Result<f64, ToolkitError> {
        let output = self.run(FSLSTATS, stat_args(volume, mask, stat))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_stat_output(&stdout).ok_or_else(|| ToolkitError::UnparseableOutput {
            tool: FSLSTATS.to_string(),
            output: stdout.into_owned(),
        })
    }

    fn extract_roi(
        &self,
        input: &Path,
        output: &Path,
        region: &RoiRegion,
    ) -> Result<(), ToolkitError> {
        let mut args = vec![input.as_os_str().to_owned(), output.as_os_str().to_owned()];
        args.extend(roi_args(region).into_iter().map(Into::into));
        self.run(FSLROI, args)?;
        Ok(())
    }
}

fn stat_args<'a>(volume: &'a Path, mask: Option<&'a Path>, stat: Statistic) -> Vec<&'a OsStr> {
    let mut args = vec![volume.as_os_str()];
    if let Some(mask) = mask {
        args.push(OsStr::new("-k"));
        args.push(mask.as_os_str());
    }
    args.push(OsStr::new(match stat {
        Statistic::Mean => "-m",
        Statistic::StdDev => "-s",
    }));
    args
}

/// `fslroi` takes `min size` pairs for each axis.
fn roi_args(region: &RoiRegion) -> Vec<String> {
    (0..3)
        .flat_map(|axis| {
            [
                region.offset[axis].to_string(),
                region.extent[axis].to_string(),
            ]
        })
        .collect()
}

/// Parses the first whitespace-separated token of `fslstats` output.
fn parse_stat_output(stdout: &str) -> Option<f64> {
    let value: f64 = stdout.split_whitespace().next()?.parse().ok()?;
    value.is_finite().then_some(value)
}

/// Parses the `key value` lines printed by `fslinfo`.
fn parse_volume_info(stdout: &str) -> Option<VolumeInfo> {
    let mut dims = [None; 3];
    let mut pixdims = [None; 3];
    let mut data_type = None;

    for line in stdout.lines() {
        let mut fields = line.split_whitespace();
        let (Some(key), Some(value)) = (fields.next(), fields.next()) else {
            continue;
        };
        match key {
            "data_type" => data_type = Some(value.to_string()),
            "dim1" => dims[0] = value.parse::<usize>().ok(),
            "dim2" => dims[1] = value.parse::<usize>().ok(),
            "dim3" => dims[2] = value.parse::<usize>().ok(),
            "pixdim1" => pixdims[0] = value.parse::<f64>().ok(),
            "pixdim2" => pixdims[1] = value.parse::<f64>().ok(),
            "pixdim3" => pixdims[2] = value.parse::<f64>().ok(),
            _ => {}
        }
    }

    Some(VolumeInfo {
        dims: [dims[0]?, dims[1]?, dims[2]?],
        pixdims: [pixdims[0]?, pixdims[1]?, pixdims[2]?],
        data_type: data_type?,
    })
}
