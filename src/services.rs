pub mod access;
pub mod analytics;
pub mod analytics_service;
pub mod audit_service;
pub mod auth;
pub mod directory_service;
pub mod indicator_schema;
pub mod indicator_service;
pub mod settings_service;
pub mod user_service;
