// Collections repository for speech-data
// Procedure bodies for collection creation, label mapping and label membership

use rusqlite::{params, Connection, OptionalExtension};

use super::gateway::Row;
use super::manager::select_rows;
use super::procedures::{id_row, Args};
use crate::error::{join_ids, StoreError, INACTIVE_LABEL, INTEGRITY_VIOLATION};

/// CreateCollections @SampleDurationInSeconds, @SamplesPerLabel, @Name
pub(crate) fn create_collections(conn: &Connection, args: &Args) -> Result<Vec<Row>, StoreError> {
    let duration = args.i64("SampleDurationInSeconds")?;
    let samples_per_label = args.i64("SamplesPerLabel")?;
    let name = args.text("Name")?;

    conn.execute(
        "INSERT INTO collections (name, samples_per_label, sample_duration_seconds) VALUES (?1, ?2, ?3)",
        params![name, samples_per_label, duration],
    )?;

    Ok(vec![id_row(conn.last_insert_rowid())])
}

/// CreateCollectionLabelMapping @CollectionId, @Labels
///
/// Maps every listed label onto the collection. Pairs that already exist are
/// kept; the result lists one row per requested label, in request order.
pub(crate) fn create_collection_label_mapping(
    conn: &Connection,
    args: &Args,
) -> Result<Vec<Row>, StoreError> {
    let collection_id = args.i64("CollectionId")?;
    let label_ids = args.id_list("Labels")?;

    let collection_active = conn
        .query_row(
            "SELECT 1 FROM collections WHERE id = ?1 AND is_active = 1",
            params![collection_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();

    if !collection_active {
        return Err(StoreError::with_code(
            INTEGRITY_VIOLATION,
            format!("No active collection exists with id {}", collection_id),
        ));
    }

    let mut inactive = Vec::new();
    for label_id in &label_ids {
        let label_active = conn
            .query_row(
                "SELECT 1 FROM labels WHERE id = ?1 AND is_active = 1",
                params![label_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !label_active {
            inactive.push(*label_id);
        }
    }

    if !inactive.is_empty() {
        return Err(StoreError::with_code(
            INACTIVE_LABEL,
            format!("Labels {} are not active", join_ids(&inactive)),
        )
        .with_ids(inactive));
    }

    let mut mappings = Vec::with_capacity(label_ids.len());
    for label_id in &label_ids {
        conn.execute(
            "INSERT OR IGNORE INTO collection_labels (collection_id, label_id) VALUES (?1, ?2)",
            params![collection_id, label_id],
        )?;

        mappings.extend(select_rows(
            conn,
            r#"
            SELECT l.id AS label_id, l.name AS label_name,
                   c.id AS collection_id, c.name AS collection_name
            FROM collection_labels cl
            JOIN labels l ON l.id = cl.label_id
            JOIN collections c ON c.id = cl.collection_id
            WHERE cl.collection_id = ?1 AND cl.label_id = ?2
            "#,
            &[collection_id.into(), (*label_id).into()],
        )?);
    }

    Ok(mappings)
}

/// GetCollections @LabelId: active collections a label belongs to
pub(crate) fn get_collections(conn: &Connection, args: &Args) -> Result<Vec<Row>, StoreError> {
    let label_id = args.i64("LabelId")?;

    select_rows(
        conn,
        r#"
        SELECT c.id, c.name, c.samples_per_label, c.sample_duration_seconds
        FROM collection_labels cl
        JOIN collections c ON c.id = cl.collection_id
        WHERE cl.label_id = ?1 AND c.is_active = 1
        ORDER BY c.id
        "#,
        &[label_id.into()],
    )
}

#[cfg(test)]
mod tests {
    use crate::database::gateway::{Statement, StoreGateway};
    use crate::database::procedures;
    use crate::database::test_support::TestDb;
    use crate::error::{DUPLICATE_KEY, INACTIVE_LABEL};

    fn create_collection(db: &TestDb, name: &str) -> i64 {
        let rows = db
            .execute(
                &Statement::procedure(procedures::CREATE_COLLECTIONS)
                    .arg("SampleDurationInSeconds", 2i64)
                    .arg("SamplesPerLabel", 10i64)
                    .arg("Name", name.to_string()),
            )
            .unwrap();
        rows[0].get_i64("id").unwrap()
    }

    fn create_label(db: &TestDb, name: &str) -> i64 {
        let rows = db
            .execute(&Statement::procedure(procedures::CREATE_LABELS).arg("LabelName", name.to_string()))
            .unwrap();
        rows[0].get_i64("id").unwrap()
    }

    #[test]
    fn test_duplicate_collection_name_has_code() {
        let db = TestDb::new();
        create_collection(&db, "Basics");

        let err = db
            .execute(
                &Statement::procedure(procedures::CREATE_COLLECTIONS)
                    .arg("SampleDurationInSeconds", 3i64)
                    .arg("SamplesPerLabel", 5i64)
                    .arg("Name", "Basics".to_string()),
            )
            .unwrap_err();
        assert!(err.has_code(DUPLICATE_KEY));
    }

    #[test]
    fn test_mapping_is_idempotent() {
        let db = TestDb::new();
        let collection = create_collection(&db, "Basics");
        let yes = create_label(&db, "Yes");

        let call = Statement::procedure(procedures::CREATE_COLLECTION_LABEL_MAPPING)
            .arg("CollectionId", collection)
            .arg("Labels", yes.to_string());

        assert_eq!(db.execute(&call).unwrap().len(), 1);
        let again = db.execute(&call).unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].get_text("label_name").unwrap(), "Yes");
        assert_eq!(again[0].get_text("collection_name").unwrap(), "Basics");
    }

    #[test]
    fn test_mapping_with_inactive_label_rolls_back() {
        let db = TestDb::new();
        let collection = create_collection(&db, "Basics");
        let yes = create_label(&db, "Yes");
        let no = create_label(&db, "No");
        db.deactivate("labels", no);

        let err = db
            .execute(
                &Statement::procedure(procedures::CREATE_COLLECTION_LABEL_MAPPING)
                    .arg("CollectionId", collection)
                    .arg("Labels", format!("{},{}", yes, no)),
            )
            .unwrap_err();
        assert!(err.has_code(INACTIVE_LABEL));
        assert_eq!(err.ids, vec![no]);

        let collections = db
            .execute(&Statement::procedure(procedures::GET_COLLECTIONS).arg("LabelId", yes))
            .unwrap();
        assert!(collections.is_empty());
    }

    #[test]
    fn test_get_collections_skips_inactive() {
        let db = TestDb::new();
        let basics = create_collection(&db, "Basics");
        let extras = create_collection(&db, "Extras");
        let yes = create_label(&db, "Yes");

        for collection in [basics, extras] {
            db.execute(
                &Statement::query(crate::database::queries::INSERT_COLLECTION_LABEL)
                    .bind(collection)
                    .bind(yes),
            )
            .unwrap();
        }
        db.deactivate("collections", extras);

        let rows = db
            .execute(&Statement::procedure(procedures::GET_COLLECTIONS).arg("LabelId", yes))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_text("name").unwrap(), "Basics");
    }
}
