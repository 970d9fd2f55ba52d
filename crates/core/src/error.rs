use crate::toolkit::ToolkitError;
use std::fmt;
use std::path::PathBuf;

/// Pipeline stages, used to name the step that failed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ToolkitCheck,
    Metadata,
    Reorient,
    BrainExtraction,
    Segmentation,
    WhiteMatterMask,
    SignalEstimate,
    RoiExtraction,
    NoiseBasic,
    NoiseRician,
}

impl Stage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ToolkitCheck => "toolkit check",
            Self::Metadata => "metadata",
            Self::Reorient => "reorient",
            Self::BrainExtraction => "brain extraction",
            Self::Segmentation => "segmentation",
            Self::WhiteMatterMask => "white matter mask",
            Self::SignalEstimate => "signal estimate",
            Self::RoiExtraction => "roi extraction",
            Self::NoiseBasic => "basic noise estimate",
            Self::NoiseRician => "rician noise estimate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Noise estimators, used to name the formula that hit a zero denominator.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Estimator {
    Basic,
    Rician,
}

impl fmt::Display for Estimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => f.write_str("basic"),
            Self::Rician => f.write_str("rician"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnrError {
    #[error("usage: {0}")]
    Usage(String),
    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("external tool failed during {stage}: {source}")]
    ExternalTool {
        stage: Stage,
        #[source]
        source: ToolkitError,
    },
    #[error("{estimator} SNR is undefined: aggregate noise statistic is zero")]
    DivisionByZero { estimator: Estimator },
    #[error("invalid ROI geometry: {0}")]
    Geometry(String),

    #[error("failed to create workspace directory: {0}")]
    WorkspaceCreation(std::io::Error),
    #[error("failed to stage input image: {0}")]
    InputStaging(std::io::Error),
    #[error("failed to write log file: {0}")]
    LogWrite(std::io::Error),
    #[error("failed to serialize report: {0}")]
    Serialization(serde_json::Error),
}

impl SnrError {
    /// Wraps a toolkit failure with the stage it happened in.
    pub fn tool(stage: Stage, source: ToolkitError) -> Self {
        Self::ExternalTool { stage, source }
    }

    /// Process exit status for this error.
    ///
    /// `0` is reserved for success and help output.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            Self::InputNotFound(_) => 3,
            Self::ExternalTool { .. } => 4,
            Self::Geometry(_) => 5,
            Self::DivisionByZero { .. } => 6,
            Self::InvalidInput(_)
            | Self::Config(_)
            | Self::WorkspaceCreation(_)
            | Self::InputStaging(_)
            | Self::LogWrite(_)
            | Self::Serialization(_) => 1,
        }
    }
}

pub type SnrResult<T> = std::result::Result<T, SnrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(SnrError::Usage("missing -i".into()).exit_code(), 2);
        assert_eq!(SnrError::InputNotFound("t1.nii.gz".into()).exit_code(), 3);
        assert_eq!(
            SnrError::tool(
                Stage::BrainExtraction,
                ToolkitError::Failed {
                    tool: "bet".into(),
                    status: Some(1),
                    stderr: String::new(),
                }
            )
            .exit_code(),
            4
        );
        assert_eq!(SnrError::Geometry("too small".into()).exit_code(), 5);
        assert_eq!(
            SnrError::DivisionByZero {
                estimator: Estimator::Rician
            }
            .exit_code(),
            6
        );
        assert_eq!(SnrError::Config("bad".into()).exit_code(), 1);
    }

    #[test]
    fn test_toolkit_check_failure_is_not_reported_as_metadata() {
        let err = SnrError::tool(
            Stage::ToolkitCheck,
            ToolkitError::Launch {
                tool: "fslinfo".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            },
        );
        let msg = err.to_string();
        assert!(msg.starts_with("external tool failed during toolkit check"));
        assert!(!msg.contains("metadata"));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_external_tool_message_names_stage_and_status() {
        let err = SnrError::tool(
            Stage::Segmentation,
            ToolkitError::Failed {
                tool: "fast".into(),
                status: Some(137),
                stderr: "killed".into(),
            },
        );
        let msg = err.to_string();
        assert!(msg.contains("segmentation"));
        assert!(msg.contains("fast"));
        assert!(msg.contains("137"));
    }
}
