pub mod analytics;
pub mod audit;
pub mod auth;
pub mod directory;
pub mod history;
pub mod lancamentos;
pub mod settings;
pub mod users;
