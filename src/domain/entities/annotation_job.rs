use chrono::{DateTime, Utc};
use typed_builder::TypedBuilder;
use uuid::Uuid;

/// Where a job stands in its lifecycle.
///
/// A job starts in `Processing` and ends in either `Completed` or `Failed`.
/// There is no queued state: processing is spawned as soon as the upload
/// has been staged.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A drawing-annotation job tracked by the in-memory registry
#[derive(Debug, Clone, TypedBuilder)]
pub struct AnnotationJob {
    #[builder(default=Uuid::new_v4())]
    pub id: Uuid,

    /// File name received from the user, sanitized
    pub source_file_name: String,

    #[builder(default=JobStatus::Processing)]
    pub status: JobStatus,

    /// Human-readable reason when the job failed
    #[builder(default)]
    pub error: Option<String>,

    #[builder(default=Utc::now())]
    pub created_at: DateTime<Utc>,

    #[builder(default=Utc::now())]
    pub updated_at: DateTime<Utc>,
}
