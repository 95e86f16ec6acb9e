use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::http::StatusCode;
use actix_web::web::{Data, Path};
use actix_web::{HttpResponse, ResponseError};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::helper::error_chain_fmt;
use crate::repositories::results_storage::ResultsStorage;

#[derive(thiserror::Error)]
pub enum DownloadResultsError {
    #[error("Results not found")]
    ResultsNotFound(Uuid),
    #[error("Failed to read the results archive")]
    IOError(#[from] std::io::Error),
}

impl std::fmt::Debug for DownloadResultsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for DownloadResultsError {
    fn status_code(&self) -> StatusCode {
        match self {
            DownloadResultsError::ResultsNotFound(_) => StatusCode::NOT_FOUND,
            DownloadResultsError::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Serves a completed job's results archive as an attachment
#[tracing::instrument(name = "Download results handler", skip(storage))]
pub async fn download_results(
    path: Path<Uuid>,
    storage: Data<ResultsStorage>,
) -> Result<HttpResponse, DownloadResultsError> {
    let job_id = path.into_inner();
    let archive_path = storage.results_archive_path(job_id);

    let archive_file = match tokio::fs::File::open(&archive_path).await {
        Ok(file) => file,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return Err(DownloadResultsError::ResultsNotFound(job_id));
        }
        Err(error) => return Err(error.into()),
    };

    Ok(HttpResponse::Ok()
        .content_type("application/zip")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(format!(
                "bubble_results_{}.zip",
                job_id
            ))],
        })
        .streaming(ReaderStream::new(archive_file)))
}
