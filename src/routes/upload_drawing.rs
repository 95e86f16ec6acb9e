use actix_multipart::form::{tempfile::TempFile, text::Text, MultipartForm};
use actix_web::http::StatusCode;
use actix_web::web::Data;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use tracing::{info, info_span, Instrument};

use crate::domain::entities::annotation_job::AnnotationJob;
use crate::domain::entities::candidate_upload::{
    check_upload, sanitize_file_name, CandidateUpload, UploadValidationError,
};
use crate::helper::error_chain_fmt;
use crate::ports::drawing_annotator::{DetectionMode, DrawingAnnotator};
use crate::repositories::job_registry::JobRegistry;
use crate::repositories::results_storage::{ResultsStorage, ResultsStorageError};
use crate::use_cases::process_drawing::process_drawing;

#[derive(Debug, MultipartForm)]
pub struct UploadForm {
    #[multipart(rename = "file")]
    files: Vec<TempFile>,
    /// `manual` opts out of automatic detection; absent means automatic
    mode: Option<Text<String>>,
}

#[derive(thiserror::Error)]
pub enum UploadDrawingError {
    #[error("{0}")]
    ValidationError(#[from] UploadValidationError),
    #[error("Failed to stage the uploaded drawing")]
    StorageError(#[from] ResultsStorageError),
}

impl std::fmt::Debug for UploadDrawingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for UploadDrawingError {
    fn status_code(&self) -> StatusCode {
        match self {
            UploadDrawingError::ValidationError(_) => StatusCode::BAD_REQUEST,
            UploadDrawingError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // The UI reads the failure reason from the `error` field, like the
    // original API surface
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

/// Accepts a drawing, registers a job for it and spawns the annotation
/// pipeline in the background. The client is expected to follow up on
/// `GET /status/{job_id}`.
#[tracing::instrument(
    name = "Upload drawing handler",
    skip(form, registry, storage, annotator)
)]
pub async fn upload_drawing(
    MultipartForm(form): MultipartForm<UploadForm>,
    registry: Data<JobRegistry>,
    storage: Data<ResultsStorage>,
    annotator: Data<dyn DrawingAnnotator>,
) -> Result<HttpResponse, UploadDrawingError> {
    let mode = DetectionMode::from_form_value(form.mode.as_deref().map(String::as_str));
    let uploaded_file = form.files.into_iter().next();

    let candidate = CandidateUpload {
        file_name: uploaded_file
            .as_ref()
            .and_then(|f| f.file_name.as_deref()),
        size_bytes: uploaded_file.as_ref().map(|f| f.size as u64).unwrap_or(0),
        mime_type: uploaded_file.as_ref().and_then(|f| f.content_type.as_ref()),
    };
    check_upload(&candidate)?;

    // check_upload guarantees the file and its name are present
    let uploaded_file = uploaded_file.ok_or(UploadValidationError::MissingFile)?;
    let file_name = sanitize_file_name(
        uploaded_file
            .file_name
            .as_deref()
            .ok_or(UploadValidationError::MissingFile)?,
    );

    let job = AnnotationJob::builder()
        .source_file_name(file_name.clone())
        .build();
    let job_id = job.id;

    let staged_input = storage
        .stage_upload(job_id, &file_name, uploaded_file.file.path())
        .await?;
    registry.insert(job).await;

    info!("Processing job {} ({} mode): {}", job_id, mode, file_name);

    tokio::spawn(
        process_drawing(
            job_id,
            staged_input,
            mode,
            registry.get_ref().clone(),
            storage.get_ref().clone(),
            annotator.clone().into_inner(),
        )
        .instrument(info_span!("Background annotation", %job_id)),
    );

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "job_id": job_id,
        "message": "Processing started",
    })))
}
