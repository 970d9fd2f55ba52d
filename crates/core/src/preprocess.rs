//! Preprocessing stage: metadata, reorientation, brain extraction, segmentation and the
//! white-matter mask.
//!
//! Each step consumes the previous step's output and is checked for its output file before
//! the next one starts. Toolkit failures are not retried.

use std::path::{Path, PathBuf};

use crate::constants::{TISSUE_CLASSES, WHITE_MATTER_PVE_INDEX};
use crate::error::{SnrError, SnrResult, Stage};
use crate::pipeline::RunContext;
use crate::toolkit::{ImagingToolkit, ToolkitError, VolumeInfo};

/// The input image after it has been copied into the workspace.
#[derive(Clone, Debug)]
pub struct StagedInput {
    pub path: PathBuf,
}

/// Volumes produced by preprocessing.
#[derive(Clone, Debug)]
pub struct Preprocessed {
    /// Metadata of the reoriented volume; its dimensions place the ROIs.
    pub reoriented_info: VolumeInfo,
    pub reoriented: PathBuf,
    pub brain: PathBuf,
    pub wm_mask: PathBuf,
}

/// Fails with a `MissingOutput` tool error if `path` was not written.
pub(crate) fn ensure_output(stage: Stage, path: &Path) -> SnrResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(SnrError::tool(
            stage,
            ToolkitError::MissingOutput {
                path: path.to_path_buf(),
            },
        ))
    }
}

/// Runs the preprocessing steps in order and logs the input metadata.
pub fn preprocess<T: ImagingToolkit + ?Sized>(
    ctx: &mut RunContext,
    toolkit: &T,
    staged: &StagedInput,
) -> SnrResult<Preprocessed> {
    let paths = ctx.paths.clone();

    tracing::info!("reading metadata of {}", staged.path.display());
    let input_info = toolkit
        .volume_info(&staged.path)
        .map_err(|e| SnrError::tool(Stage::Metadata, e))?;
    ctx.reporter.line("image metadata")?;
    for line in input_info.describe() {
        ctx.reporter.line(line)?;
    }

    let reoriented = paths.reoriented();
    tracing::info!("reorienting to standard orientation");
    toolkit
        .reorient_to_standard(&staged.path, &reoriented)
        .map_err(|e| SnrError::tool(Stage::Reorient, e))?;
    ensure_output(Stage::Reorient, &reoriented)?;
    let reoriented_info = toolkit
        .volume_info(&reoriented)
        .map_err(|e| SnrError::tool(Stage::Reorient, e))?;

    let brain = paths.brain();
    let threshold = ctx.config.bet_threshold();
    tracing::info!("extracting brain (f = {})", threshold);
    toolkit
        .extract_brain(&reoriented, &brain, threshold)
        .map_err(|e| SnrError::tool(Stage::BrainExtraction, e))?;
    ensure_output(Stage::BrainExtraction, &brain)?;

    tracing::info!("segmenting {} tissue classes", TISSUE_CLASSES);
    toolkit
        .segment_tissues(&brain, &paths.segmentation_base(), TISSUE_CLASSES)
        .map_err(|e| SnrError::tool(Stage::Segmentation, e))?;
    let wm_partial_volume = paths.partial_volume(WHITE_MATTER_PVE_INDEX);
    ensure_output(Stage::Segmentation, &wm_partial_volume)?;

    let wm_mask = paths.white_matter_mask();
    let threshold = ctx.config.wm_threshold();
    tracing::info!("binarising white matter map at {}", threshold);
    toolkit
        .threshold_binarize(&wm_partial_volume, &wm_mask, threshold)
        .map_err(|e| SnrError::tool(Stage::WhiteMatterMask, e))?;
    ensure_output(Stage::WhiteMatterMask, &wm_mask)?;

    Ok(Preprocessed {
        reoriented_info,
        reoriented,
        brain,
        wm_mask,
    })
}
