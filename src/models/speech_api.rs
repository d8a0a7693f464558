// SpeechAPI entity for speech-data
// Trainable models: creation, listings, version history and training dispatch

use serde::{Deserialize, Serialize};

use super::fetch_rows;
use super::label::Label;
use super::speech_api_version::SpeechApiVersion;
use crate::database::{procedures, queries, Row, Statement, StoreGateway};
use crate::error::{
    join_ids, Result, SpeechDataError, StoreError, DUPLICATE_KEY, INACTIVE_LABEL, INTEGRITY_VIOLATION,
};
use crate::training::{TrainingJob, TrainingJobSubmitter};

/// Cutoff passed to the pipeline when the caller has no preference
pub const DEFAULT_SAMPLE_DURATION_CUT_OFF: i64 = 5;

/// Handle to a speech API by id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpeechApiRef {
    pub id: i64,
}

/// A fully resolved speech API.
///
/// `training_status` is owned by the external pipeline; this layer only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechApi {
    pub id: i64,
    pub name: String,
    pub training_status: i64,
    #[serde(rename = "type")]
    pub api_type: String,
}

impl SpeechApi {
    /// Create a speech API over at least one active label.
    ///
    /// The description defaults to the name.
    pub fn create(
        store: &dyn StoreGateway,
        name: &str,
        description: Option<&str>,
        labels: &[i64],
    ) -> Result<SpeechApi> {
        if labels.is_empty() {
            return Err(SpeechDataError::Validation(
                "SpeechAPI needs at least 1 active label".to_string(),
            ));
        }

        let description = description.unwrap_or(name);
        let statement = Statement::procedure(procedures::CREATE_SPEECH_API)
            .arg("Name", name.to_string())
            .arg("Description", description.to_string())
            .arg("Labels", join_ids(labels));

        let created = store
            .execute(&statement)
            .and_then(|rows| {
                rows.first()
                    .ok_or_else(|| StoreError::new("CreateSpeechAPI returned no rows"))
                    .and_then(SpeechApi::from_row)
            })
            .map_err(|e| {
                if e.has_code(DUPLICATE_KEY) {
                    SpeechDataError::DuplicateName {
                        entity: "speechAPI",
                        name: name.to_string(),
                    }
                } else if e.has_code(INACTIVE_LABEL) {
                    let offending = if e.ids.is_empty() {
                        labels.to_vec()
                    } else {
                        e.ids.clone()
                    };
                    SpeechDataError::InactiveLabels {
                        labels: offending,
                        source: e,
                    }
                } else {
                    SpeechDataError::creation(format!("Cannot create the SpeechAPI - {}", name), e)
                }
            })?;

        log::info!(
            "Created speech API {} ('{}') with labels {}",
            created.id,
            created.name,
            join_ids(labels)
        );
        Ok(created)
    }

    /// All active speech APIs
    pub fn get_all(store: &dyn StoreGateway) -> Result<Vec<SpeechApi>> {
        fetch_rows(
            store,
            &Statement::procedure(procedures::GET_ACTIVE_SPEECH_API),
            SpeechApi::from_row,
        )
        .map_err(|e| SpeechDataError::fetch("Cannot fetch SpeechAPIs", e))
    }

    pub fn handle(&self) -> SpeechApiRef {
        SpeechApiRef::new(self.id)
    }

    /// Train with the name already known: only the label names are looked up
    pub fn train(
        &self,
        store: &dyn StoreGateway,
        submitter: &dyn TrainingJobSubmitter,
        label_ids: &[i64],
        sample_duration_cut_off: i64,
    ) -> Result<TrainingJob> {
        train(store, submitter, self.id, Some(&self.name), label_ids, sample_duration_cut_off)
    }

    pub(crate) fn from_row(row: &Row) -> std::result::Result<SpeechApi, StoreError> {
        Ok(SpeechApi {
            id: row.get_i64("id")?,
            name: row.get_text("name")?,
            training_status: row.get_i64("training_status")?,
            api_type: row.get_text("type")?,
        })
    }
}

impl SpeechApiRef {
    pub fn new(id: i64) -> Self {
        Self { id }
    }

    /// Fetch the full attribute set of an active speech API
    pub fn resolve(&self, store: &dyn StoreGateway) -> Result<SpeechApi> {
        let statement = Statement::query(queries::ACTIVE_SPEECH_API_BY_ID).bind(self.id);

        fetch_rows(store, &statement, SpeechApi::from_row)
            .map_err(|e| SpeechDataError::fetch(format!("Cannot fetch the SpeechAPI - {}", self.id), e))?
            .into_iter()
            .next()
            .ok_or_else(|| {
                SpeechDataError::NotFound(format!("No active speech API exists with ID - {}", self.id))
            })
    }

    /// Version snapshots, oldest first
    pub fn get_speech_api_versions(&self, store: &dyn StoreGateway) -> Result<Vec<SpeechApiVersion>> {
        let statement = Statement::query(queries::SPEECH_API_VERSIONS).bind(self.id);

        fetch_rows(store, &statement, SpeechApiVersion::from_row).map_err(|e| {
            SpeechDataError::fetch(format!("Cannot fetch versions of the SpeechAPI - {}", self.id), e)
        })
    }

    /// Sample durations available across this API's labels
    pub fn get_sample_durations(&self, store: &dyn StoreGateway) -> Result<Vec<i64>> {
        let statement = Statement::procedure(procedures::GET_SAMPLE_DURATIONS).arg("SpeechAPIId", self.id);

        fetch_rows(store, &statement, |row| row.get_i64("sample_duration")).map_err(|e| {
            SpeechDataError::fetch(
                format!("Cannot fetch sample durations of the SpeechAPI - {}", self.id),
                e,
            )
        })
    }

    /// This API's labels that have samples of the given duration
    pub fn get_labels_of_speech_api(
        &self,
        store: &dyn StoreGateway,
        sample_duration: i64,
    ) -> Result<Vec<Label>> {
        let statement = Statement::procedure(procedures::GET_LABELS_OF_SPEECH_API)
            .arg("SpeechAPIId", self.id)
            .arg("SampleDuration", sample_duration);

        fetch_rows(store, &statement, Label::from_row).map_err(|e| {
            SpeechDataError::fetch(format!("Cannot fetch labels of the SpeechAPI - {}", self.id), e)
        })
    }

    /// Record an immutable snapshot of the current label set as the next version
    pub fn create_version(&self, store: &dyn StoreGateway) -> Result<SpeechApiVersion> {
        let statement =
            Statement::procedure(procedures::CREATE_SPEECH_API_VERSION).arg("SpeechAPIId", self.id);

        let version = fetch_rows(store, &statement, SpeechApiVersion::from_row)
            .and_then(|versions| {
                versions
                    .into_iter()
                    .next()
                    .ok_or_else(|| StoreError::new("CreateSpeechAPIVersion returned no rows"))
            })
            .map_err(|e| {
                if e.has_code(INTEGRITY_VIOLATION) {
                    SpeechDataError::NotFound(format!("No active speech API exists with ID - {}", self.id))
                } else {
                    SpeechDataError::creation(
                        format!("Cannot create a version of the SpeechAPI - {}", self.id),
                        e,
                    )
                }
            })?;

        log::info!(
            "Recorded version {} of speech API {}",
            version.version,
            self.id
        );
        Ok(version)
    }

    /// Train without knowing the name: it is looked up in a separate call
    pub fn train(
        &self,
        store: &dyn StoreGateway,
        submitter: &dyn TrainingJobSubmitter,
        label_ids: &[i64],
        sample_duration_cut_off: i64,
    ) -> Result<TrainingJob> {
        train(store, submitter, self.id, None, label_ids, sample_duration_cut_off)
    }
}

/// Resolve label names, resolve the API name if unknown, then hand the job to
/// the pipeline.
///
/// The two lookups stay separate store calls. Nothing is retried or rolled back
/// when the submission fails.
fn train(
    store: &dyn StoreGateway,
    submitter: &dyn TrainingJobSubmitter,
    speech_api_id: i64,
    known_name: Option<&str>,
    label_ids: &[i64],
    sample_duration_cut_off: i64,
) -> Result<TrainingJob> {
    if label_ids.is_empty() {
        return Err(SpeechDataError::Validation(
            "Training needs at least 1 label".to_string(),
        ));
    }

    let labels_id_csv = join_ids(label_ids);
    let names_statement =
        Statement::procedure(procedures::GET_LABEL_NAMES).arg("LabelIds", labels_id_csv.clone());
    let label_names = fetch_rows(store, &names_statement, |row| row.get_text("name")).map_err(|e| {
        SpeechDataError::fetch(format!("Cannot fetch names of the label IDs - {}", labels_id_csv), e)
    })?;

    let speech_api_name = match known_name {
        Some(name) => name.to_string(),
        None => {
            let name_statement = Statement::query(queries::ACTIVE_SPEECH_API_NAME).bind(speech_api_id);
            fetch_rows(store, &name_statement, |row| row.get_text("name"))
                .map_err(|e| {
                    SpeechDataError::fetch(
                        format!("Cannot fetch name of the speech API ID - {}", speech_api_id),
                        e,
                    )
                })?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    SpeechDataError::NotFound(format!(
                        "No active speech API exists with ID - {}",
                        speech_api_id
                    ))
                })?
        }
    };

    let job = TrainingJob {
        label_names,
        sample_duration_cut_off,
        speech_api_name,
    };

    submitter.submit(&job).map_err(|e| {
        log::error!("Training trigger for speech API {} failed: {}", speech_api_id, e);
        SpeechDataError::TrainingTrigger { source: e }
    })?;

    log::info!(
        "Triggered training of speech API {} on labels {} (cutoff {}s)",
        speech_api_id,
        labels_id_csv,
        sample_duration_cut_off
    );
    Ok(job)
}
