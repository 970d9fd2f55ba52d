//! Per-run workspace directory.
//!
//! Each run writes into `<output_dir>/snr_<base>/`. An existing directory is reused: volumes
//! derived by an earlier run are removed up front, so every output check sees only files
//! written by the current run. There is no backup or versioning of earlier runs.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use snr_types::BaseName;

use crate::input::InputImage;
use crate::paths::common::{LogFile, WorkspaceDir};
use crate::paths::volumes::VolumePaths;
use crate::{SnrError, SnrResult};

/// Directory that owns every file written during a run.
#[derive(Clone, Debug)]
pub struct Workspace {
    dir: PathBuf,
    base_name: BaseName,
}

impl Workspace {
    /// Creates the workspace for `base_name` under `output_dir`, or reuses an existing one.
    ///
    /// # Errors
    ///
    /// Returns `SnrError::WorkspaceCreation` if the directory cannot be created, or if a
    /// non-directory already occupies its path, or if a stale derived volume cannot be removed.
    pub fn prepare(output_dir: &Path, base_name: &BaseName) -> SnrResult<Self> {
        let dir = output_dir.join(WorkspaceDir::name(base_name));

        if dir.exists() {
            if !dir.is_dir() {
                return Err(SnrError::WorkspaceCreation(io::Error::new(
                    ErrorKind::AlreadyExists,
                    format!("{} exists and is not a directory", dir.display()),
                )));
            }
            tracing::warn!(
                "reusing existing workspace {}; previous outputs will be replaced",
                dir.display()
            );
            let workspace = Self {
                dir,
                base_name: base_name.clone(),
            };
            workspace.clear_derived_volumes()?;
            return Ok(workspace);
        }

        fs::create_dir_all(&dir).map_err(SnrError::WorkspaceCreation)?;
        tracing::info!("created workspace {}", dir.display());

        Ok(Self {
            dir,
            base_name: base_name.clone(),
        })
    }

    fn clear_derived_volumes(&self) -> SnrResult<()> {
        for volume in self.volume_paths().derived() {
            match fs::remove_file(&volume) {
                Ok(()) => tracing::debug!("removed stale {}", volume.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(SnrError::WorkspaceCreation(e)),
            }
        }
        Ok(())
    }

    /// Copies the input image into the workspace, replacing any earlier copy.
    ///
    /// Returns the path of the staged copy.
    pub fn stage_input(&self, input: &InputImage) -> SnrResult<PathBuf> {
        let staged = self.dir.join(input.file_name());

        if same_file(input.path(), &staged) {
            tracing::debug!("input already staged at {}", staged.display());
            return Ok(staged);
        }

        fs::copy(input.path(), &staged).map_err(SnrError::InputStaging)?;
        tracing::info!("staged {} -> {}", input.path().display(), staged.display());
        Ok(staged)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(LogFile::name(&self.base_name))
    }

    pub fn volume_paths(&self) -> VolumePaths {
        VolumePaths::new(&self.dir, self.base_name.clone())
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
