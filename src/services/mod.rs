pub mod settings_service;
pub mod user_service;
