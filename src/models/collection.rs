// Collection entity for speech-data
// Named groups of labels with sampling requirements

use serde::{Deserialize, Serialize};

use super::fetch_rows;
use super::label::LabelRef;
use crate::database::{procedures, queries, Row, Statement, StoreGateway};
use crate::error::{join_ids, Result, SpeechDataError, StoreError, DUPLICATE_KEY};

/// Handle to a collection by id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionRef {
    pub id: i64,
}

/// A fully resolved collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub sample_needed_per_label: i64,
    pub duration_in_seconds_per_sample: i64,
}

/// One label/collection pair produced by a bulk mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionLabelMapping {
    pub label: LabelRef,
    pub label_name: String,
    pub collection: CollectionRef,
    pub collection_name: String,
}

impl Collection {
    /// Create a collection; the name must be unique among active collections
    pub fn create(
        store: &dyn StoreGateway,
        sample_needed_per_label: i64,
        duration_in_seconds_per_sample: i64,
        name: &str,
    ) -> Result<Collection> {
        let statement = Statement::procedure(procedures::CREATE_COLLECTIONS)
            .arg("SampleDurationInSeconds", duration_in_seconds_per_sample)
            .arg("SamplesPerLabel", sample_needed_per_label)
            .arg("Name", name.to_string());

        let id = store
            .execute(&statement)
            .and_then(|rows| first_id(&rows))
            .map_err(|e| {
                if e.has_code(DUPLICATE_KEY) {
                    SpeechDataError::DuplicateName {
                        entity: "collection",
                        name: name.to_string(),
                    }
                } else {
                    SpeechDataError::creation(
                        format!("Cannot create collection with name - {}", name),
                        e,
                    )
                }
            })?;

        log::info!("Created collection {} ('{}')", id, name);

        Ok(Collection {
            id,
            name: name.to_string(),
            sample_needed_per_label,
            duration_in_seconds_per_sample,
        })
    }

    /// All active collections
    pub fn get_all(store: &dyn StoreGateway) -> Result<Vec<Collection>> {
        fetch_rows(store, &Statement::query(queries::ACTIVE_COLLECTIONS), Collection::from_row)
            .map_err(|e| SpeechDataError::fetch("Cannot fetch collections", e))
    }

    pub fn handle(&self) -> CollectionRef {
        CollectionRef::new(self.id)
    }

    pub(crate) fn from_row(row: &Row) -> std::result::Result<Collection, StoreError> {
        Ok(Collection {
            id: row.get_i64("id")?,
            name: row.get_text("name")?,
            sample_needed_per_label: row.get_i64("samples_per_label")?,
            duration_in_seconds_per_sample: row.get_i64("sample_duration_seconds")?,
        })
    }
}

impl CollectionRef {
    pub fn new(id: i64) -> Self {
        Self { id }
    }

    /// Fetch the full attribute set of an active collection
    pub fn resolve(&self, store: &dyn StoreGateway) -> Result<Collection> {
        let statement = Statement::query(queries::ACTIVE_COLLECTION_BY_ID).bind(self.id);

        fetch_rows(store, &statement, Collection::from_row)
            .map_err(|e| SpeechDataError::fetch(format!("Cannot fetch collection - {}", self.id), e))?
            .into_iter()
            .next()
            .ok_or_else(|| {
                SpeechDataError::NotFound(format!("No active collection exists with ID - {}", self.id))
            })
    }

    /// Map labels onto this collection in one store call.
    ///
    /// Returns one mapping per requested label. An empty list is rejected
    /// without touching the store.
    pub fn add_labels(
        &self,
        store: &dyn StoreGateway,
        labels: &[i64],
    ) -> Result<Vec<CollectionLabelMapping>> {
        if labels.is_empty() {
            return Err(SpeechDataError::Validation(format!(
                "At least 1 label is needed to map collection '{}'",
                self.id
            )));
        }

        let labels_csv = join_ids(labels);
        let statement = Statement::procedure(procedures::CREATE_COLLECTION_LABEL_MAPPING)
            .arg("CollectionId", self.id)
            .arg("Labels", labels_csv.clone());

        let mappings = fetch_rows(store, &statement, mapping_from_row).map_err(|e| {
            SpeechDataError::mapping(
                format!("Cannot map collection '{}' with labels - {}", self.id, labels_csv),
                e,
            )
        })?;

        log::info!(
            "Mapped {} labels onto collection {}",
            mappings.len(),
            self.id
        );
        Ok(mappings)
    }
}

fn mapping_from_row(row: &Row) -> std::result::Result<CollectionLabelMapping, StoreError> {
    Ok(CollectionLabelMapping {
        label: LabelRef::new(row.get_i64("label_id")?),
        label_name: row.get_text("label_name")?,
        collection: CollectionRef::new(row.get_i64("collection_id")?),
        collection_name: row.get_text("collection_name")?,
    })
}

/// Id of the row a create procedure just inserted
pub(crate) fn first_id(rows: &[Row]) -> std::result::Result<i64, StoreError> {
    rows.first()
        .ok_or_else(|| StoreError::new("Create procedure returned no rows"))?
        .get_i64("id")
}
