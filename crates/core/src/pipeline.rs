//! Pipeline driver.
//!
//! [`SnrPipeline::run`] composes the stages in order, passing each stage's typed output to the
//! next:
//!
//! ```text
//! InputImage -> StagedInput -> Preprocessed -> SignalEstimate -> RoiSet
//!            -> NoiseEstimate (basic) -> NoiseEstimate (rician) -> SnrReport
//! ```
//!
//! Run state (workspace, derived paths, log) lives in an explicit [`RunContext`]. Every stage
//! appends its own log lines as soon as its values are known; the first error ends the run.

use std::path::PathBuf;
use std::sync::Arc;

use snr_types::BaseName;

use crate::config::CoreConfig;
use crate::error::{Estimator, SnrResult};
use crate::input::InputImage;
use crate::noise::{self, NoiseEstimate};
use crate::paths::volumes::VolumePaths;
use crate::preprocess::{self, StagedInput};
use crate::report::Reporter;
use crate::roi;
use crate::signal;
use crate::toolkit::ImagingToolkit;
use crate::workspace::Workspace;

/// State shared by the stages of one run.
#[derive(Debug)]
pub struct RunContext {
    pub config: Arc<CoreConfig>,
    pub workspace: Workspace,
    pub paths: VolumePaths,
    pub reporter: Reporter,
}

impl RunContext {
    /// Prepares the workspace for `input` and opens a fresh log inside it.
    pub fn open(config: Arc<CoreConfig>, input: &InputImage) -> SnrResult<Self> {
        let workspace = Workspace::prepare(config.output_dir(), input.base_name())?;
        let paths = workspace.volume_paths();
        let reporter = Reporter::create(workspace.log_path())?;
        Ok(Self {
            config,
            workspace,
            paths,
            reporter,
        })
    }
}

/// Final values of a run, as written to the log.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SnrReport {
    pub base_name: BaseName,
    pub workspace: PathBuf,
    pub log_file: PathBuf,
    pub dimensions: [usize; 3],
    pub mean_wm: f64,
    pub basic: NoiseEstimate,
    pub rician: NoiseEstimate,
}

impl SnrReport {
    pub fn to_json_pretty(&self) -> SnrResult<String> {
        serde_json::to_string_pretty(self).map_err(crate::SnrError::Serialization)
    }
}

/// Runs the SNR pipeline against one imaging toolkit.
#[derive(Clone, Debug)]
pub struct SnrPipeline<T> {
    cfg: Arc<CoreConfig>,
    toolkit: T,
}

impl<T: ImagingToolkit> SnrPipeline<T> {
    pub fn new(cfg: Arc<CoreConfig>, toolkit: T) -> Self {
        Self { cfg, toolkit }
    }

    pub fn toolkit(&self) -> &T {
        &self.toolkit
    }

    /// Runs every stage for `input` inside its workspace.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure. Lines logged before the failure stay in the log.
    pub fn run(&self, input: &InputImage) -> SnrResult<SnrReport> {
        let mut ctx = RunContext::open(self.cfg.clone(), input)?;
        ctx.reporter.header(input.file_name())?;

        let staged = StagedInput {
            path: ctx.workspace.stage_input(input)?,
        };

        let pre = preprocess::preprocess(&mut ctx, &self.toolkit, &staged)?;

        let signal = signal::estimate_signal(&self.toolkit, &pre.brain, &pre.wm_mask)?;
        ctx.reporter.value("mean_wm", signal.mean_wm)?;

        let regions = roi::corner_regions(pre.reoriented_info.dims, self.cfg.roi_geometry())?;
        let rois = roi::extract_rois(&self.toolkit, &ctx.paths, &pre.reoriented, regions)?;

        let basic = self.estimate(&mut ctx, &rois, Estimator::Basic, signal.mean_wm)?;
        let rician = self.estimate(&mut ctx, &rois, Estimator::Rician, signal.mean_wm)?;

        Ok(SnrReport {
            base_name: input.base_name().clone(),
            workspace: ctx.workspace.dir().to_path_buf(),
            log_file: ctx.reporter.path().to_path_buf(),
            dimensions: pre.reoriented_info.dims,
            mean_wm: signal.mean_wm,
            basic,
            rician,
        })
    }

    fn estimate(
        &self,
        ctx: &mut RunContext,
        rois: &roi::RoiSet,
        estimator: Estimator,
        mean_wm: f64,
    ) -> SnrResult<NoiseEstimate> {
        let (stat_label, aggregate_label, snr_label) = match estimator {
            Estimator::Basic => ("mean", "mean_noise", "snr_basic"),
            Estimator::Rician => ("sd", "sd_noise", "snr_rician"),
        };

        let per_roi = noise::measure_rois(&self.toolkit, rois, estimator)?;
        for stat in &per_roi {
            ctx.reporter
                .value(&format!("{}_{}", stat_label, stat.label), stat.value)?;
        }

        let values: Vec<f64> = per_roi.iter().map(|s| s.value).collect();
        ctx.reporter
            .value(aggregate_label, noise::mean_of_statistics(&values)?)?;

        let estimate = match noise::combine(
            estimator,
            mean_wm,
            per_roi,
            self.cfg.rician_correction(),
        ) {
            Ok(estimate) => estimate,
            Err(e) => {
                ctx.reporter.line(format!("{snr_label}: undefined ({e})"))?;
                return Err(e);
            }
        };
        ctx.reporter.value(snr_label, estimate.snr)?;
        Ok(estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roi::RoiLabel;
    use crate::toolkit::fake::FakeToolkit;
    use crate::toolkit::ToolkitError;
    use crate::{SnrError, Stage};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn input_in(dir: &Path) -> InputImage {
        let path = dir.join("t1.nii.gz");
        fs::write(&path, b"placeholder volume").unwrap();
        InputImage::resolve(path).unwrap()
    }

    fn pipeline(output: &Path, toolkit: FakeToolkit) -> SnrPipeline<FakeToolkit> {
        SnrPipeline::new(Arc::new(CoreConfig::with_output_dir(output)), toolkit)
    }

    fn reference_toolkit() -> FakeToolkit {
        FakeToolkit::new([256, 256, 256], 800.0)
            .with_roi(RoiLabel::Las, 10.0, 2.0)
            .with_roi(RoiLabel::Lps, 12.0, 2.5)
            .with_roi(RoiLabel::Rps, 11.0, 1.8)
            .with_roi(RoiLabel::Ras, 9.0, 2.2)
    }

    #[test]
    fn test_end_to_end_reference_values() {
        let temp = TempDir::new().unwrap();
        let input = input_in(temp.path());
        let out = temp.path().join("out");

        let report = pipeline(&out, reference_toolkit()).run(&input).unwrap();

        assert_eq!(report.base_name.as_str(), "t1");
        assert_eq!(report.workspace, out.join("snr_t1"));
        assert_eq!(report.dimensions, [256, 256, 256]);
        assert_eq!(report.mean_wm, 800.0);
        assert_eq!(report.basic.aggregate, 10.5);
        assert!((report.basic.snr - 76.19).abs() < 0.005);
        assert!((report.rician.aggregate - 2.125).abs() < 1e-9);
        assert!((report.rician.snr - 246.6).abs() < 0.05);
    }

    #[test]
    fn test_workspace_contains_every_artefact() {
        let temp = TempDir::new().unwrap();
        let input = input_in(temp.path());
        let ws = temp.path().join("snr_t1");

        pipeline(temp.path(), reference_toolkit())
            .run(&input)
            .unwrap();

        for name in [
            "t1.nii.gz",
            "t1_reoriented.nii.gz",
            "t1_brain.nii.gz",
            "t1_brain_seg_pve_0.nii.gz",
            "t1_brain_seg_pve_1.nii.gz",
            "t1_brain_seg_pve_2.nii.gz",
            "t1_wm_mask.nii.gz",
            "t1_roi_LAS.nii.gz",
            "t1_roi_LPS.nii.gz",
            "t1_roi_RPS.nii.gz",
            "t1_roi_RAS.nii.gz",
            "snr_t1.txt",
        ] {
            assert!(ws.join(name).is_file(), "missing {name}");
        }
    }

    #[test]
    fn test_log_lines_in_order() {
        let temp = TempDir::new().unwrap();
        let input = input_in(temp.path());

        let report = pipeline(temp.path(), reference_toolkit())
            .run(&input)
            .unwrap();

        let log = fs::read_to_string(&report.log_file).unwrap();
        let lines: Vec<&str> = log.lines().collect();

        assert!(lines[0].starts_with("SNR report for t1.nii.gz"));
        assert_eq!(
            &lines[1..],
            [
                "image metadata",
                "dimensions: 256 x 256 x 256",
                "voxel size: 1.000000 x 1.000000 x 1.000000",
                "data type: FLOAT32",
                "mean_wm: 800.000000",
                "mean_LAS: 10.000000",
                "mean_LPS: 12.000000",
                "mean_RPS: 11.000000",
                "mean_RAS: 9.000000",
                "mean_noise: 10.500000",
                "snr_basic: 76.190476",
                "sd_LAS: 2.000000",
                "sd_LPS: 2.500000",
                "sd_RPS: 1.800000",
                "sd_RAS: 2.200000",
                "sd_noise: 2.125000",
                "snr_rician: 246.588235",
            ]
        );
    }

    #[test]
    fn test_synthetic_constants() {
        let temp = TempDir::new().unwrap();
        let input = input_in(temp.path());
        let toolkit = FakeToolkit::new([128, 128, 96], 450.0).with_uniform_rois(15.0, 3.0);

        let report = pipeline(temp.path(), toolkit).run(&input).unwrap();

        assert_eq!(report.basic.aggregate, 15.0);
        assert!((report.basic.snr - 30.0).abs() < 1e-9);
        assert!((report.rician.snr - 0.655 * 450.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_uniform_rois_basic_defined_rician_division_by_zero() {
        let temp = TempDir::new().unwrap();
        let input = input_in(temp.path());
        let toolkit = FakeToolkit::new([256, 256, 256], 800.0).with_uniform_rois(20.0, 0.0);

        let err = pipeline(temp.path(), toolkit).run(&input).unwrap_err();
        assert!(matches!(
            err,
            SnrError::DivisionByZero {
                estimator: Estimator::Rician
            }
        ));

        let log = fs::read_to_string(temp.path().join("snr_t1/snr_t1.txt")).unwrap();
        assert!(log.contains("snr_basic: 40.000000"));
        assert!(log.contains("snr_rician: undefined"));
    }

    #[test]
    fn test_runs_are_idempotent() {
        let temp = TempDir::new().unwrap();
        let input = input_in(temp.path());

        let first = pipeline(&temp.path().join("a"), reference_toolkit())
            .run(&input)
            .unwrap();
        let second = pipeline(&temp.path().join("b"), reference_toolkit())
            .run(&input)
            .unwrap();

        assert_eq!(first.mean_wm, second.mean_wm);
        assert_eq!(first.basic, second.basic);
        assert_eq!(first.rician, second.rician);
    }

    #[test]
    fn test_rerun_into_existing_workspace_keeps_only_latest_log() {
        let temp = TempDir::new().unwrap();
        let input = input_in(temp.path());

        pipeline(temp.path(), reference_toolkit())
            .run(&input)
            .unwrap();

        let second = FakeToolkit::new([256, 256, 256], 1000.0).with_uniform_rois(25.0, 5.0);
        let report = pipeline(temp.path(), second).run(&input).unwrap();

        let log = fs::read_to_string(&report.log_file).unwrap();
        assert_eq!(log.matches("SNR report for").count(), 1);
        assert!(log.contains("mean_wm: 1000.000000"));
        assert!(!log.contains("mean_wm: 800.000000"));
        assert!(log.contains("snr_basic: 40.000000"));
    }

    #[test]
    fn test_in_plane_dimension_of_twenty_is_geometry_error() {
        let temp = TempDir::new().unwrap();
        let input = input_in(temp.path());
        let toolkit = reference_toolkit().with_dims([256, 20, 256]);

        let err = pipeline(temp.path(), toolkit).run(&input).unwrap_err();
        assert!(matches!(err, SnrError::Geometry(_)));
        assert!(!temp.path().join("snr_t1/t1_roi_LAS.nii.gz").exists());
    }

    #[test]
    fn test_tool_failure_names_stage_and_keeps_earlier_log_lines() {
        let temp = TempDir::new().unwrap();
        let input = input_in(temp.path());
        let toolkit = reference_toolkit().failing("bet", 1);

        let err = pipeline(temp.path(), toolkit).run(&input).unwrap_err();
        match &err {
            SnrError::ExternalTool { stage, source } => {
                assert_eq!(*stage, Stage::BrainExtraction);
                assert_eq!(source.status(), Some(1));
            }
            other => panic!("expected ExternalTool, got {other:?}"),
        }
        assert_eq!(err.exit_code(), 4);

        let log = fs::read_to_string(temp.path().join("snr_t1/snr_t1.txt")).unwrap();
        assert!(log.contains("dimensions: 256 x 256 x 256"));
        assert!(!log.contains("mean_wm"));
    }

    #[test]
    fn test_missing_segmentation_output_is_tool_error() {
        let temp = TempDir::new().unwrap();
        let input = input_in(temp.path());
        let toolkit = reference_toolkit().omitting_output("fast");

        let err = pipeline(temp.path(), toolkit).run(&input).unwrap_err();
        assert!(matches!(
            err,
            SnrError::ExternalTool {
                stage: Stage::Segmentation,
                source: ToolkitError::MissingOutput { .. }
            }
        ));
    }

    #[test]
    fn test_rerun_does_not_accept_outputs_from_earlier_run() {
        let temp = TempDir::new().unwrap();
        let input = input_in(temp.path());
        pipeline(temp.path(), reference_toolkit())
            .run(&input)
            .unwrap();

        let toolkit = reference_toolkit().omitting_output("fast");
        let err = pipeline(temp.path(), toolkit).run(&input).unwrap_err();

        assert!(matches!(
            err,
            SnrError::ExternalTool {
                stage: Stage::Segmentation,
                source: ToolkitError::MissingOutput { .. }
            }
        ));
        let log = fs::read_to_string(temp.path().join("snr_t1/snr_t1.txt")).unwrap();
        assert!(!log.contains("mean_wm"));
    }

    #[test]
    fn test_tools_called_in_pipeline_order() {
        let temp = TempDir::new().unwrap();
        let input = input_in(temp.path());
        let pipeline = pipeline(temp.path(), reference_toolkit());

        pipeline.run(&input).unwrap();

        let calls = pipeline.toolkit().calls();
        let order: Vec<&str> = calls.iter().map(String::as_str).collect();
        assert_eq!(
            &order[..6],
            ["fslinfo", "fslreorient2std", "fslinfo", "bet", "fast", "fslmaths"]
        );
        assert_eq!(order.iter().filter(|c| **c == "fslroi").count(), 4);
        // one masked mean, four ROI means, four ROI standard deviations
        assert_eq!(order.iter().filter(|c| **c == "fslstats").count(), 9);
    }

    #[test]
    fn test_report_serialises_to_json() {
        let temp = TempDir::new().unwrap();
        let input = input_in(temp.path());

        let report = pipeline(temp.path(), reference_toolkit())
            .run(&input)
            .unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();

        assert_eq!(json["base_name"], "t1");
        assert_eq!(json["basic"]["estimator"], "basic");
        assert_eq!(json["rician"]["per_roi"][3]["label"], "RAS");
        assert_eq!(json["dimensions"][2], 256);
    }
}
