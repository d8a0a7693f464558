// SpeechAPIVersion entity for speech-data
// Immutable snapshots of a speech API's label set

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::fetch_rows;
use super::label::Label;
use super::speech_api::SpeechApiRef;
use crate::database::{procedures, queries, Row, Statement, StoreGateway};
use crate::error::{Result, SpeechDataError, StoreError};

/// SQLite `datetime('now')` layout
const STORE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Handle to a version snapshot by id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpeechApiVersionRef {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechApiVersion {
    pub id: i64,
    pub speech_api: SpeechApiRef,
    pub version: i64,
    pub last_updated: NaiveDateTime,
    pub is_active: bool,
}

impl SpeechApiVersion {
    pub fn handle(&self) -> SpeechApiVersionRef {
        SpeechApiVersionRef::new(self.id)
    }

    pub(crate) fn from_row(row: &Row) -> std::result::Result<SpeechApiVersion, StoreError> {
        let last_updated = row.get_text("last_updated")?;

        Ok(SpeechApiVersion {
            id: row.get_i64("id")?,
            speech_api: SpeechApiRef::new(row.get_i64("speech_api_id")?),
            version: row.get_i64("version_number")?,
            last_updated: NaiveDateTime::parse_from_str(&last_updated, STORE_TIMESTAMP_FORMAT)
                .map_err(|e| StoreError::new(format!("Bad timestamp '{}': {}", last_updated, e)))?,
            is_active: row.get_bool("is_active")?,
        })
    }
}

impl SpeechApiVersionRef {
    pub fn new(id: i64) -> Self {
        Self { id }
    }

    pub fn resolve(&self, store: &dyn StoreGateway) -> Result<SpeechApiVersion> {
        let statement = Statement::query(queries::SPEECH_API_VERSION_BY_ID).bind(self.id);

        fetch_rows(store, &statement, SpeechApiVersion::from_row)
            .map_err(|e| {
                SpeechDataError::fetch(format!("Cannot fetch the speechAPIVersion - {}", self.id), e)
            })?
            .into_iter()
            .next()
            .ok_or_else(|| {
                SpeechDataError::NotFound(format!("No speech API version exists with ID - {}", self.id))
            })
    }

    /// Labels captured in this snapshot
    pub fn get_labels_of_speech_api_version(&self, store: &dyn StoreGateway) -> Result<Vec<Label>> {
        let statement = Statement::procedure(procedures::GET_LABELS_OF_SPEECH_API_VERSION)
            .arg("SpeechAPIVersionId", self.id);

        fetch_rows(store, &statement, Label::from_row).map_err(|e| {
            SpeechDataError::fetch(
                format!("Cannot fetch labels of the speechAPIVersion - {}", self.id),
                e,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::TestDb;
    use crate::error::ErrorKind;
    use crate::models::SpeechApi;

    #[test]
    fn test_snapshot_keeps_labels() {
        let db = TestDb::new();
        let yes = Label::create(&*db, "Yes").unwrap();
        let no = Label::create(&*db, "No").unwrap();
        let api = SpeechApi::create(&*db, "YesNo", None, &[yes.id, no.id]).unwrap();

        let version = api.handle().create_version(&*db).unwrap();
        db.deactivate("labels", no.id);

        let labels = version.handle().get_labels_of_speech_api_version(&*db).unwrap();
        assert_eq!(labels, vec![yes, no]);
        assert_eq!(version.handle().resolve(&*db).unwrap(), version);
    }

    #[test]
    fn test_unknown_version_has_no_labels() {
        let db = TestDb::new();

        let labels = SpeechApiVersionRef::new(42)
            .get_labels_of_speech_api_version(&*db)
            .unwrap();
        assert!(labels.is_empty());

        let err = SpeechApiVersionRef::new(42).resolve(&*db).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_timestamp_parsing() {
        use rusqlite::types::Value;

        let row = Row::new(vec![
            ("id".to_string(), Value::Integer(3)),
            ("speech_api_id".to_string(), Value::Integer(1)),
            ("version_number".to_string(), Value::Integer(2)),
            ("is_active".to_string(), Value::Integer(1)),
            ("last_updated".to_string(), Value::Text("2024-03-01 12:30:00".to_string())),
        ]);

        let version = SpeechApiVersion::from_row(&row).unwrap();
        assert_eq!(version.last_updated.to_string(), "2024-03-01 12:30:00");
        assert_eq!(version.speech_api, SpeechApiRef::new(1));

        let bad = Row::new(vec![("last_updated".to_string(), Value::Text("yesterday".to_string()))]);
        assert!(SpeechApiVersion::from_row(&bad).is_err());
    }
}
