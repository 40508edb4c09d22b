pub mod object_storage;
pub mod reconciliation_job;
pub mod upload_coordinator;
