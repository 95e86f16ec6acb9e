pub mod job_registry;
pub mod results_storage;
