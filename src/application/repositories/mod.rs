pub mod api_key_repository;
pub mod file_record_repository;
