pub mod annotation_job;
pub mod candidate_upload;
