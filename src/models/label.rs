// Label entity for speech-data
// Classification tags with a sample count, their collection membership and durations

use serde::{Deserialize, Serialize};

use super::collection::{first_id, Collection, CollectionRef};
use super::fetch_rows;
use crate::database::{procedures, queries, Row, Statement, StoreGateway};
use crate::error::{join_ids, Result, SpeechDataError, StoreError, DUPLICATE_KEY};

/// Handle to a label by id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelRef {
    pub id: i64,
}

/// A fully resolved label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: i64,
    pub name: String,
    pub sample_count: i64,
}

impl Label {
    /// Create a label with no samples; the name must be unique among active labels
    pub fn create(store: &dyn StoreGateway, name: &str) -> Result<Label> {
        let statement = Statement::procedure(procedures::CREATE_LABELS)
            .arg("LabelName", name.to_string());

        let id = store
            .execute(&statement)
            .and_then(|rows| first_id(&rows))
            .map_err(|e| {
                if e.has_code(DUPLICATE_KEY) {
                    SpeechDataError::DuplicateName {
                        entity: "label",
                        name: name.to_string(),
                    }
                } else {
                    SpeechDataError::creation(format!("Cannot create label with name - {}", name), e)
                }
            })?;

        log::info!("Created label {} ('{}')", id, name);

        Ok(Label {
            id,
            name: name.to_string(),
            sample_count: 0,
        })
    }

    /// All active labels
    pub fn get_all(store: &dyn StoreGateway) -> Result<Vec<Label>> {
        fetch_rows(store, &Statement::query(queries::ACTIVE_LABELS), Label::from_row)
            .map_err(|e| SpeechDataError::fetch("Cannot fetch labels", e))
    }

    /// Distinct sample durations of the collections holding any of the labels.
    ///
    /// No labels, or labels outside every collection, give an empty list.
    pub fn get_sample_duration_of_labels(
        store: &dyn StoreGateway,
        labels: &[LabelRef],
    ) -> Result<Vec<i64>> {
        if labels.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = labels.iter().map(|label| label.id).collect();
        let labels_csv = join_ids(&ids);
        let statement = Statement::procedure(procedures::GET_SAMPLE_DURATIONS_OF_LABELS)
            .arg("Labels", labels_csv.clone());

        fetch_rows(store, &statement, |row| row.get_i64("sample_duration_seconds")).map_err(|e| {
            SpeechDataError::fetch(format!("Cannot fetch durations of the labels - {}", labels_csv), e)
        })
    }

    pub fn handle(&self) -> LabelRef {
        LabelRef::new(self.id)
    }

    pub(crate) fn from_row(row: &Row) -> std::result::Result<Label, StoreError> {
        Ok(Label {
            id: row.get_i64("id")?,
            name: row.get_text("name")?,
            sample_count: row.get_i64("sample_count")?,
        })
    }
}

impl LabelRef {
    pub fn new(id: i64) -> Self {
        Self { id }
    }

    /// Fetch the full attribute set of an active label
    pub fn resolve(&self, store: &dyn StoreGateway) -> Result<Label> {
        let statement = Statement::query(queries::ACTIVE_LABEL_BY_ID).bind(self.id);

        fetch_rows(store, &statement, Label::from_row)
            .map_err(|e| SpeechDataError::fetch(format!("Cannot fetch label - {}", self.id), e))?
            .into_iter()
            .next()
            .ok_or_else(|| SpeechDataError::NotFound(format!("No active label exists with ID - {}", self.id)))
    }

    /// Insert a single join row between this label and a collection
    pub fn add_to_collection(&self, store: &dyn StoreGateway, collection: &CollectionRef) -> Result<()> {
        let statement = Statement::query(queries::INSERT_COLLECTION_LABEL)
            .bind(collection.id)
            .bind(self.id);

        store.execute(&statement).map_err(|e| {
            SpeechDataError::mapping(
                format!("Cannot add label - {} to collection {}", self.id, collection.id),
                e,
            )
        })?;

        log::debug!("Added label {} to collection {}", self.id, collection.id);
        Ok(())
    }

    /// Active collections this label belongs to
    pub fn get_collections(&self, store: &dyn StoreGateway) -> Result<Vec<Collection>> {
        let statement = Statement::procedure(procedures::GET_COLLECTIONS).arg("LabelId", self.id);

        fetch_rows(store, &statement, Collection::from_row).map_err(|e| {
            SpeechDataError::fetch(format!("Cannot fetch Collections of Label - {}", self.id), e)
        })
    }
}
