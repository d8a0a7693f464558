// Database module for speech-data
// SQLite-backed data store gateway: statements, procedures and schema

pub mod gateway;
pub mod manager;
pub mod migrations;
pub mod procedures;
pub mod queries;
mod collections_repo;
mod labels_repo;
mod speech_api_repo;

pub use gateway::{Row, Statement, StoreGateway};
pub use manager::DatabaseManager;
