// Speech API repository for speech-data
// Procedure bodies for speech API creation, listings and version snapshots

use rusqlite::{params, Connection, OptionalExtension};

use super::gateway::Row;
use super::manager::select_rows;
use super::procedures::{ids_param, Args};
use crate::error::{join_ids, StoreError, INACTIVE_LABEL, INTEGRITY_VIOLATION};

const SPEECH_API_COLUMNS: &str = "SELECT id, name, type, training_status FROM speech_apis";

/// CreateSpeechAPI @Name, @Description, @Labels
///
/// Every referenced label must be active; the API starts untrained.
pub(crate) fn create_speech_api(conn: &Connection, args: &Args) -> Result<Vec<Row>, StoreError> {
    let name = args.text("Name")?;
    let description = args.text("Description")?;
    let label_ids = args.id_list("Labels")?;

    let inactive: Vec<i64> = select_rows(
        conn,
        r#"
        SELECT j.value AS id
        FROM json_each(?1) j
        LEFT JOIN labels l ON l.id = j.value AND l.is_active = 1
        WHERE l.id IS NULL
        ORDER BY j.key
        "#,
        &[ids_param(&label_ids)],
    )?
    .iter()
    .map(|row| row.get_i64("id"))
    .collect::<Result<_, _>>()?;

    if !inactive.is_empty() {
        return Err(StoreError::with_code(
            INACTIVE_LABEL,
            format!("Labels {} are not active", join_ids(&inactive)),
        )
        .with_ids(inactive));
    }

    conn.execute(
        "INSERT INTO speech_apis (name, description) VALUES (?1, ?2)",
        params![name, description],
    )?;
    let speech_api_id = conn.last_insert_rowid();

    for label_id in &label_ids {
        conn.execute(
            "INSERT OR IGNORE INTO speech_api_labels (speech_api_id, label_id) VALUES (?1, ?2)",
            params![speech_api_id, label_id],
        )?;
    }

    select_rows(
        conn,
        &format!("{} WHERE id = ?1", SPEECH_API_COLUMNS),
        &[speech_api_id.into()],
    )
}

/// GetActiveSpeechAPI
pub(crate) fn get_active_speech_api(conn: &Connection) -> Result<Vec<Row>, StoreError> {
    select_rows(
        conn,
        &format!("{} WHERE is_active = 1 ORDER BY id", SPEECH_API_COLUMNS),
        &[],
    )
}

/// GetSampleDurations @SpeechAPIId
///
/// Distinct durations of the active collections that hold the API's active labels.
pub(crate) fn get_sample_durations(conn: &Connection, args: &Args) -> Result<Vec<Row>, StoreError> {
    let speech_api_id = args.i64("SpeechAPIId")?;

    select_rows(
        conn,
        r#"
        SELECT DISTINCT c.sample_duration_seconds AS sample_duration
        FROM speech_api_labels sal
        JOIN labels l ON l.id = sal.label_id AND l.is_active = 1
        JOIN collection_labels cl ON cl.label_id = l.id
        JOIN collections c ON c.id = cl.collection_id AND c.is_active = 1
        WHERE sal.speech_api_id = ?1
        ORDER BY sample_duration
        "#,
        &[speech_api_id.into()],
    )
}

/// GetLabelsOfSpeechAPI @SpeechAPIId, @SampleDuration
pub(crate) fn get_labels_of_speech_api(conn: &Connection, args: &Args) -> Result<Vec<Row>, StoreError> {
    let speech_api_id = args.i64("SpeechAPIId")?;
    let sample_duration = args.i64("SampleDuration")?;

    select_rows(
        conn,
        r#"
        SELECT DISTINCT l.id, l.name, l.sample_count
        FROM speech_api_labels sal
        JOIN labels l ON l.id = sal.label_id AND l.is_active = 1
        JOIN collection_labels cl ON cl.label_id = l.id
        JOIN collections c ON c.id = cl.collection_id AND c.is_active = 1
        WHERE sal.speech_api_id = ?1
          AND c.sample_duration_seconds = ?2
        ORDER BY l.id
        "#,
        &[speech_api_id.into(), sample_duration.into()],
    )
}

/// GetLabelsOfSpeechAPIVersion @SpeechAPIVersionId
///
/// The snapshot is returned as recorded, including labels deactivated since.
pub(crate) fn get_labels_of_speech_api_version(
    conn: &Connection,
    args: &Args,
) -> Result<Vec<Row>, StoreError> {
    let version_id = args.i64("SpeechAPIVersionId")?;

    select_rows(
        conn,
        r#"
        SELECT l.id, l.name, l.sample_count
        FROM speech_api_version_labels vl
        JOIN labels l ON l.id = vl.label_id
        WHERE vl.speech_api_version_id = ?1
        ORDER BY l.id
        "#,
        &[version_id.into()],
    )
}

/// CreateSpeechAPIVersion @SpeechAPIId
///
/// Appends a snapshot of the API's current label set under the next version
/// number. Existing versions are never touched.
pub(crate) fn create_speech_api_version(conn: &Connection, args: &Args) -> Result<Vec<Row>, StoreError> {
    let speech_api_id = args.i64("SpeechAPIId")?;

    let active = conn
        .query_row(
            "SELECT 1 FROM speech_apis WHERE id = ?1 AND is_active = 1",
            params![speech_api_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();

    if !active {
        return Err(StoreError::with_code(
            INTEGRITY_VIOLATION,
            format!("No active speech API exists with id {}", speech_api_id),
        ));
    }

    let next_version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version_number), 0) + 1 FROM speech_api_versions WHERE speech_api_id = ?1",
        params![speech_api_id],
        |row| row.get(0),
    )?;

    conn.execute(
        "INSERT INTO speech_api_versions (speech_api_id, version_number) VALUES (?1, ?2)",
        params![speech_api_id, next_version],
    )?;
    let version_id = conn.last_insert_rowid();

    conn.execute(
        r#"
        INSERT INTO speech_api_version_labels (speech_api_version_id, label_id)
        SELECT ?1, label_id FROM speech_api_labels WHERE speech_api_id = ?2
        "#,
        params![version_id, speech_api_id],
    )?;

    select_rows(conn, super::queries::SPEECH_API_VERSION_BY_ID, &[version_id.into()])
}
