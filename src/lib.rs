// speech-data - Speech training data registry
//
// Domain and data-access layer for a voice-classification pipeline:
// - Collections, labels, speech APIs and their version snapshots
// - A SQLite-backed store gateway exposing named procedures
// - Training job hand-off to the external pipeline

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod training;

pub use config::Config;
pub use database::{DatabaseManager, StoreGateway};
pub use error::{ErrorKind, SpeechDataError, StoreError};
pub use models::{
    Collection, CollectionLabelMapping, CollectionRef, Label, LabelRef, SpeechApi, SpeechApiRef,
    SpeechApiVersion, SpeechApiVersionRef, DEFAULT_SAMPLE_DURATION_CUT_OFF,
};
pub use training::{TrainingJob, TrainingJobSubmitter};

use anyhow::{Context, Result};

/// Initialize env_logger to output to stderr (reads RUST_LOG env var).
/// Later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

/// The store and the training submitter a request handler works with
pub struct Services {
    pub store: DatabaseManager,
    pub submitter: Box<dyn TrainingJobSubmitter>,
}

impl Services {
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = DatabaseManager::new(config.database_path.clone())
            .context("Failed to initialize database")?;
        let submitter = config
            .build_submitter()
            .context("Failed to configure training submission")?;

        log::info!(
            "speech-data ready (store {:?}, submit mode {:?})",
            store.db_path(),
            config.submit_mode
        );

        Ok(Self { store, submitter })
    }
}
