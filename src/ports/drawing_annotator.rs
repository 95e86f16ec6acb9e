use std::path::Path;

use crate::helper::error_chain_fmt;

/// How bubbles get placed: detected automatically, or through the tool's
/// manual placement flow. The upload form opts into the latter with
/// `mode=manual`; anything else means automatic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMode {
    Auto,
    Manual,
}

impl DetectionMode {
    pub fn from_form_value(value: Option<&str>) -> Self {
        match value {
            Some("manual") => DetectionMode::Manual,
            _ => DetectionMode::Auto,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMode::Auto => "auto",
            DetectionMode::Manual => "manual",
        }
    }
}

impl std::fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error)]
pub enum AnnotateError {
    #[error("The annotation tool could not be started: {0}")]
    ToolUnavailable(#[source] std::io::Error),
    #[error("The annotation tool failed: {0}")]
    ToolFailed(String),
    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

impl std::fmt::Debug for AnnotateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Produces annotated pages for a technical drawing.
///
/// Implementations read the staged PDF at `input_pdf` and write their
/// artifacts (typically one image per page, with numbered bubbles near the
/// detected dimensions) into `output_dir`, which already exists. How the
/// dimensions are detected is entirely up to the implementation.
#[async_trait::async_trait]
pub trait DrawingAnnotator: Send + Sync {
    async fn annotate(
        &self,
        input_pdf: &Path,
        output_dir: &Path,
        mode: DetectionMode,
    ) -> Result<(), AnnotateError>;
}
