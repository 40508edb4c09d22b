pub mod cleanup_controller;
pub mod file_controller;
pub mod health_controller;
pub mod tenant_controller;
pub mod upload_controller;
