//! Storage module for the session database and configuration.

pub mod config;
pub mod database;
pub mod schema;
pub mod session_store;

pub use config::{AppConfig, ClassifierSettings, ConfigError, SensorSettings, StorageSettings};
pub use database::{Database, DatabaseError};
pub use session_store::SessionStore;
