mod pg_file_record_repository;
mod redis_api_key_repository;

pub use pg_file_record_repository::PgFileRecordRepository;
pub use redis_api_key_repository::RedisApiKeyRepository;
