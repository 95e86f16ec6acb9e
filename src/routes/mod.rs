pub mod download_results;
pub mod health_check;
pub mod index;
pub mod job_status;
pub mod upload_drawing;

pub use health_check::health_check;
