pub mod api_key_dto;
pub mod file_dto;
pub mod file_record_dto;
pub mod upload_dto;
