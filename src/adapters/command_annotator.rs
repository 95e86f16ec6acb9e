use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::info;

use crate::configuration::AnnotatorSettings;
use crate::ports::drawing_annotator::{AnnotateError, DetectionMode, DrawingAnnotator};

/// Runs the external annotation tool as a child process.
///
/// The command is configured as a whitespace-separated template in which
/// `{input}`, `{output_dir}` and `{mode}` are substituted per job, e.g.:
/// `python3 improved_bubble_tool.py {input} -o {output_dir} --mode {mode}`
pub struct CommandAnnotator {
    command_template: String,
}

impl CommandAnnotator {
    pub fn new(settings: &AnnotatorSettings) -> Self {
        Self {
            command_template: settings.command.clone(),
        }
    }

    fn build_arguments(
        &self,
        input_pdf: &Path,
        output_dir: &Path,
        mode: DetectionMode,
    ) -> Vec<String> {
        self.command_template
            .split_whitespace()
            .map(|token| {
                token
                    .replace("{input}", &input_pdf.to_string_lossy())
                    .replace("{output_dir}", &output_dir.to_string_lossy())
                    .replace("{mode}", mode.as_str())
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl DrawingAnnotator for CommandAnnotator {
    #[tracing::instrument(name = "Running annotation command", skip(self))]
    async fn annotate(
        &self,
        input_pdf: &Path,
        output_dir: &Path,
        mode: DetectionMode,
    ) -> Result<(), AnnotateError> {
        let arguments = self.build_arguments(input_pdf, output_dir, mode);

        let (program, arguments) = arguments
            .split_first()
            .ok_or_else(|| AnnotateError::ToolFailed("Empty annotation command".to_string()))?;

        let output = Command::new(program)
            .args(arguments)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(AnnotateError::ToolUnavailable)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = match stderr.trim() {
                "" => format!("exited with {}", output.status),
                stderr => stderr.to_string(),
            };

            return Err(AnnotateError::ToolFailed(reason));
        }

        info!("Annotation command succeeded for {}", input_pdf.display());
        Ok(())
    }
}
