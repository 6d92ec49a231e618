pub mod analytics;
pub mod audit;
pub mod auth;
pub mod directory;
pub mod indicators;
pub mod settings;
pub mod users;
