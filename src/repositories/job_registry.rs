use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::annotation_job::{AnnotationJob, JobStatus};

/// In-memory store of the jobs this process knows about, shared by all
/// actix-web workers and the background processing tasks.
///
/// A restart forgets running jobs on purpose: completed jobs are still
/// recoverable from the results archive on disk, which the status route
/// checks first.
#[derive(Clone)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<Uuid, AnnotationJob>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn insert(&self, job: AnnotationJob) {
        self.jobs.write().await.insert(job.id, job);
    }

    pub async fn get(&self, job_id: Uuid) -> Option<AnnotationJob> {
        self.jobs.read().await.get(&job_id).cloned()
    }

    #[tracing::instrument(name = "Marking job completed", skip(self))]
    pub async fn mark_completed(&self, job_id: Uuid) {
        self.update(job_id, |job| {
            job.status = JobStatus::Completed;
            job.error = None;
        })
        .await;
    }

    #[tracing::instrument(name = "Marking job failed", skip(self))]
    pub async fn mark_failed(&self, job_id: Uuid, error: String) {
        self.update(job_id, |job| {
            job.status = JobStatus::Failed;
            job.error = Some(error.clone());
        })
        .await;
    }

    async fn update(&self, job_id: Uuid, apply: impl FnOnce(&mut AnnotationJob)) {
        if let Some(job) = self.jobs.write().await.get_mut(&job_id) {
            apply(job);
            job.updated_at = Utc::now();
        }
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
