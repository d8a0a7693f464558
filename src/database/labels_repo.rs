// Labels repository for speech-data
// Procedure bodies for label creation, duration lookup and name resolution

use rusqlite::{params, Connection};

use super::gateway::Row;
use super::manager::select_rows;
use super::procedures::{id_row, ids_param, Args};
use crate::error::{join_ids, StoreError, INACTIVE_LABEL};

/// CreateLabels @LabelName; new labels start with no samples
pub(crate) fn create_labels(conn: &Connection, args: &Args) -> Result<Vec<Row>, StoreError> {
    let name = args.text("LabelName")?;

    conn.execute(
        "INSERT INTO labels (name, sample_count) VALUES (?1, 0)",
        params![name],
    )?;

    Ok(vec![id_row(conn.last_insert_rowid())])
}

/// GetSampleDurationsOfLabels @Labels
///
/// Distinct sample durations of the active collections holding any of the labels.
pub(crate) fn get_sample_durations_of_labels(
    conn: &Connection,
    args: &Args,
) -> Result<Vec<Row>, StoreError> {
    let label_ids = args.id_list("Labels")?;

    select_rows(
        conn,
        r#"
        SELECT DISTINCT c.sample_duration_seconds
        FROM collection_labels cl
        JOIN collections c ON c.id = cl.collection_id
        WHERE c.is_active = 1
          AND cl.label_id IN (SELECT value FROM json_each(?1))
        ORDER BY c.sample_duration_seconds
        "#,
        &[ids_param(&label_ids)],
    )
}

/// GetLabelNames @LabelIds
///
/// Names in request order. Every id must name an active label, otherwise the
/// call fails with the inactive-label code listing the unknown ids.
pub(crate) fn get_label_names(conn: &Connection, args: &Args) -> Result<Vec<Row>, StoreError> {
    let label_ids = args.id_list("LabelIds")?;

    let rows = select_rows(
        conn,
        r#"
        SELECT j.value AS id, l.name
        FROM json_each(?1) j
        LEFT JOIN labels l ON l.id = j.value AND l.is_active = 1
        ORDER BY j.key
        "#,
        &[ids_param(&label_ids)],
    )?;

    let mut missing = Vec::new();
    for row in &rows {
        if row.get_opt_text("name")?.is_none() {
            missing.push(row.get_i64("id")?);
        }
    }

    if !missing.is_empty() {
        return Err(StoreError::with_code(
            INACTIVE_LABEL,
            format!("Labels {} are not active", join_ids(&missing)),
        )
        .with_ids(missing));
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use crate::database::gateway::{Statement, StoreGateway};
    use crate::database::procedures;
    use crate::database::test_support::TestDb;
    use crate::error::{DUPLICATE_KEY, INACTIVE_LABEL};

    fn create_label(db: &TestDb, name: &str) -> i64 {
        let rows = db
            .execute(&Statement::procedure(procedures::CREATE_LABELS).arg("LabelName", name.to_string()))
            .unwrap();
        rows[0].get_i64("id").unwrap()
    }

    #[test]
    fn test_duplicate_label_name_has_code() {
        let db = TestDb::new();
        create_label(&db, "Yes");

        let err = db
            .execute(&Statement::procedure(procedures::CREATE_LABELS).arg("LabelName", "Yes".to_string()))
            .unwrap_err();
        assert!(err.has_code(DUPLICATE_KEY));
    }

    #[test]
    fn test_label_names_keep_request_order() {
        let db = TestDb::new();
        let yes = create_label(&db, "Yes");
        let no = create_label(&db, "No");

        let rows = db
            .execute(
                &Statement::procedure(procedures::GET_LABEL_NAMES)
                    .arg("LabelIds", format!("{},{}", no, yes)),
            )
            .unwrap();

        let names: Vec<String> = rows.iter().map(|r| r.get_text("name").unwrap()).collect();
        assert_eq!(names, vec!["No", "Yes"]);
    }

    #[test]
    fn test_label_names_reject_unknown_ids() {
        let db = TestDb::new();
        let yes = create_label(&db, "Yes");

        let err = db
            .execute(
                &Statement::procedure(procedures::GET_LABEL_NAMES)
                    .arg("LabelIds", format!("{},999", yes)),
            )
            .unwrap_err();
        assert!(err.has_code(INACTIVE_LABEL));
        assert!(err.message.contains("999"));
        assert_eq!(err.ids, vec![999]);
    }

    #[test]
    fn test_durations_of_unmapped_labels_are_empty() {
        let db = TestDb::new();
        let yes = create_label(&db, "Yes");

        let rows = db
            .execute(
                &Statement::procedure(procedures::GET_SAMPLE_DURATIONS_OF_LABELS)
                    .arg("Labels", yes.to_string()),
            )
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_malformed_id_list_fails() {
        let db = TestDb::new();
        let err = db
            .execute(
                &Statement::procedure(procedures::GET_SAMPLE_DURATIONS_OF_LABELS)
                    .arg("Labels", "1; DROP TABLE labels".to_string()),
            )
            .unwrap_err();
        assert!(err.message.contains("Labels"));
    }
}
