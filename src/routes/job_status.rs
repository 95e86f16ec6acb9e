use actix_web::web::{Data, Path};
use actix_web::HttpResponse;
use serde_json::json;
use uuid::Uuid;

use crate::domain::entities::annotation_job::JobStatus;
use crate::repositories::job_registry::JobRegistry;
use crate::repositories::results_storage::ResultsStorage;

/// Reports where a job stands; the client polls this until a terminal
/// status shows up.
///
/// The results archive on disk wins over the registry: it survives a
/// restart, and its presence is the definition of a completed job.
#[tracing::instrument(name = "Job status handler", skip(registry, storage))]
pub async fn job_status(
    path: Path<Uuid>,
    registry: Data<JobRegistry>,
    storage: Data<ResultsStorage>,
) -> HttpResponse {
    let job_id = path.into_inner();

    if storage.has_results(job_id).await {
        return HttpResponse::Ok().json(json!({
            "status": "completed",
            "download_url": format!("/download/{}", job_id),
        }));
    }

    if let Some(job) = registry.get(job_id).await {
        return match job.status {
            JobStatus::Processing => HttpResponse::Ok().json(json!({ "status": "processing" })),
            JobStatus::Failed => HttpResponse::Ok().json(json!({
                "status": "failed",
                "error": job.error.unwrap_or_else(|| "Processing failed".to_string()),
            })),
            // Completed but the archive is gone: someone removed it from disk
            JobStatus::Completed => HttpResponse::NotFound().json(json!({ "status": "not_found" })),
        };
    }

    // The registry lost the job (restart) but the annotator may still be
    // at work: its output directory is the remaining trace
    if storage.has_job_output_dir(job_id).await {
        return HttpResponse::Ok().json(json!({ "status": "processing" }));
    }

    HttpResponse::NotFound().json(json!({ "status": "not_found" }))
}
