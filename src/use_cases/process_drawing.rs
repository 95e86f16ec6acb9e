use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::helper::error_chain_fmt;
use crate::ports::drawing_annotator::{AnnotateError, DetectionMode, DrawingAnnotator};
use crate::repositories::job_registry::JobRegistry;
use crate::repositories::results_storage::{ResultsStorage, ResultsStorageError};

#[derive(thiserror::Error)]
pub enum ProcessDrawingError {
    #[error(transparent)]
    AnnotateError(#[from] AnnotateError),
    #[error(transparent)]
    ResultsStorageError(#[from] ResultsStorageError),
}

impl std::fmt::Debug for ProcessDrawingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Runs a job to completion and records the outcome in the registry.
///
/// Spawned from the upload handler; never fails the caller. Any pipeline
/// error marks the job failed with a human-readable reason, which the
/// status route then reports as a terminal status.
#[tracing::instrument(
    name = "Processing drawing",
    skip(registry, storage, annotator, staged_input)
)]
pub async fn process_drawing(
    job_id: Uuid,
    staged_input: PathBuf,
    mode: DetectionMode,
    registry: JobRegistry,
    storage: ResultsStorage,
    annotator: Arc<dyn DrawingAnnotator>,
) {
    match run_pipeline(job_id, &staged_input, mode, &storage, annotator.as_ref()).await {
        Ok(()) => {
            registry.mark_completed(job_id).await;
            info!("Job {} completed", job_id);
        }
        Err(pipeline_error) => {
            error!(?pipeline_error, "Job {} failed", job_id);
            registry.mark_failed(job_id, pipeline_error.to_string()).await;
        }
    }
}

async fn run_pipeline(
    job_id: Uuid,
    staged_input: &PathBuf,
    mode: DetectionMode,
    storage: &ResultsStorage,
    annotator: &dyn DrawingAnnotator,
) -> Result<(), ProcessDrawingError> {
    annotator
        .annotate(staged_input, &storage.job_output_dir(job_id), mode)
        .await?;

    storage.pack_results_archive(job_id).await?;

    // The upload served its purpose; losing it is not worth failing the job
    if let Err(cleanup_error) = storage.remove_staged_upload(staged_input).await {
        warn!(?cleanup_error, "Failed to remove staged upload");
    }

    Ok(())
}
