//! Workspace-level names shared by every run.
//!
//! Both the workspace directory and the log file are keyed by the base name:
//! ```text
//! <output_dir>/
//!     snr_<base>/
//!         snr_<base>.txt
//! ```

use snr_types::BaseName;

use crate::constants::{LOG_EXTENSION, WORKSPACE_PREFIX};

/// Per-run workspace directory.
#[derive(Debug, Clone, Copy)]
pub struct WorkspaceDir;

impl WorkspaceDir {
    pub const PREFIX: &'static str = WORKSPACE_PREFIX;

    /// Directory name for the given base name.
    pub fn name(base: &BaseName) -> String {
        format!("{}{}", Self::PREFIX, base)
    }
}

/// Per-run plain-text log file, stored inside the workspace.
#[derive(Debug, Clone, Copy)]
pub struct LogFile;

impl LogFile {
    pub const EXTENSION: &'static str = LOG_EXTENSION;

    /// File name for the given base name.
    pub fn name(base: &BaseName) -> String {
        format!("{}.{}", WorkspaceDir::name(base), Self::EXTENSION)
    }
}
