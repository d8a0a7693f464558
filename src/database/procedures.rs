// Stored procedures for speech-data
// Named procedures dispatched by the gateway; bodies live in the *_repo modules

use rusqlite::types::Value;
use rusqlite::Connection;

use super::gateway::Row;
use super::{collections_repo, labels_repo, speech_api_repo};
use crate::error::StoreError;

pub const CREATE_COLLECTIONS: &str = "CreateCollections";
pub const CREATE_COLLECTION_LABEL_MAPPING: &str = "CreateCollectionLabelMapping";
pub const GET_COLLECTIONS: &str = "GetCollections";
pub const CREATE_LABELS: &str = "CreateLabels";
pub const GET_SAMPLE_DURATIONS_OF_LABELS: &str = "GetSampleDurationsOfLabels";
pub const GET_LABEL_NAMES: &str = "GetLabelNames";
pub const CREATE_SPEECH_API: &str = "CreateSpeechAPI";
pub const GET_ACTIVE_SPEECH_API: &str = "GetActiveSpeechAPI";
pub const GET_SAMPLE_DURATIONS: &str = "GetSampleDurations";
pub const GET_LABELS_OF_SPEECH_API: &str = "GetLabelsOfSpeechAPI";
pub const GET_LABELS_OF_SPEECH_API_VERSION: &str = "GetLabelsOfSpeechAPIVersion";
pub const CREATE_SPEECH_API_VERSION: &str = "CreateSpeechAPIVersion";

/// Run a named procedure inside the caller's transaction
pub fn call(
    conn: &Connection,
    name: &str,
    args: &[(&'static str, Value)],
) -> Result<Vec<Row>, StoreError> {
    let args = Args { procedure: name, args };

    match name {
        CREATE_COLLECTIONS => collections_repo::create_collections(conn, &args),
        CREATE_COLLECTION_LABEL_MAPPING => collections_repo::create_collection_label_mapping(conn, &args),
        GET_COLLECTIONS => collections_repo::get_collections(conn, &args),
        CREATE_LABELS => labels_repo::create_labels(conn, &args),
        GET_SAMPLE_DURATIONS_OF_LABELS => labels_repo::get_sample_durations_of_labels(conn, &args),
        GET_LABEL_NAMES => labels_repo::get_label_names(conn, &args),
        CREATE_SPEECH_API => speech_api_repo::create_speech_api(conn, &args),
        GET_ACTIVE_SPEECH_API => speech_api_repo::get_active_speech_api(conn),
        GET_SAMPLE_DURATIONS => speech_api_repo::get_sample_durations(conn, &args),
        GET_LABELS_OF_SPEECH_API => speech_api_repo::get_labels_of_speech_api(conn, &args),
        GET_LABELS_OF_SPEECH_API_VERSION => speech_api_repo::get_labels_of_speech_api_version(conn, &args),
        CREATE_SPEECH_API_VERSION => speech_api_repo::create_speech_api_version(conn, &args),
        _ => Err(StoreError::new(format!("Could not find stored procedure '{}'", name))),
    }
}

/// Named procedure arguments with typed lookup
pub(crate) struct Args<'a> {
    procedure: &'a str,
    args: &'a [(&'static str, Value)],
}

impl Args<'_> {
    fn value(&self, name: &str) -> Result<&Value, StoreError> {
        self.args
            .iter()
            .find(|(arg, _)| *arg == name)
            .map(|(_, value)| value)
            .ok_or_else(|| {
                StoreError::new(format!(
                    "Procedure '{}' expects parameter '@{}', which was not supplied",
                    self.procedure, name
                ))
            })
    }

    pub fn i64(&self, name: &str) -> Result<i64, StoreError> {
        match self.value(name)? {
            Value::Integer(v) => Ok(*v),
            other => Err(self.invalid(name, other)),
        }
    }

    pub fn text(&self, name: &str) -> Result<String, StoreError> {
        match self.value(name)? {
            Value::Text(v) => Ok(v.clone()),
            other => Err(self.invalid(name, other)),
        }
    }

    /// Parse a comma-separated id list argument
    pub fn id_list(&self, name: &str) -> Result<Vec<i64>, StoreError> {
        let csv = self.text(name)?;
        parse_id_csv(&csv).map_err(|bad| {
            StoreError::new(format!(
                "Procedure '{}' could not convert '{}' in '@{}' to an id",
                self.procedure, bad, name
            ))
        })
    }

    fn invalid(&self, name: &str, value: &Value) -> StoreError {
        StoreError::new(format!(
            "Procedure '{}' got {:?} for parameter '@{}'",
            self.procedure,
            value.data_type(),
            name
        ))
    }
}

/// Split "1,2,3" into ids; returns the offending member on failure
fn parse_id_csv(csv: &str) -> Result<Vec<i64>, String> {
    csv.split(',')
        .map(str::trim)
        .filter(|member| !member.is_empty())
        .map(|member| member.parse::<i64>().map_err(|_| member.to_string()))
        .collect()
}

/// Encode ids as a JSON array, bound as a single parameter and read back
/// with `json_each`
pub(crate) fn ids_param(ids: &[i64]) -> Value {
    Value::Text(serde_json::Value::from(ids.to_vec()).to_string())
}

/// Single-column row holding a new row id
pub(crate) fn id_row(id: i64) -> Row {
    Row::new(vec![("id".to_string(), Value::Integer(id))])
}
