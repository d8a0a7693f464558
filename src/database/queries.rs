// Inline queries for speech-data
// Fixed SQL text with positional bound parameters; no value is ever formatted in

/// Active collections
pub const ACTIVE_COLLECTIONS: &str = r#"
    SELECT id, name, sample_duration_seconds, samples_per_label
    FROM collections
    WHERE is_active = 1
    ORDER BY id
"#;

/// One active collection; ?1 = collection id
pub const ACTIVE_COLLECTION_BY_ID: &str = r#"
    SELECT id, name, sample_duration_seconds, samples_per_label
    FROM collections
    WHERE id = ?1 AND is_active = 1
"#;

/// Active labels
pub const ACTIVE_LABELS: &str = r#"
    SELECT id, name, sample_count
    FROM labels
    WHERE is_active = 1
    ORDER BY id
"#;

/// One active label; ?1 = label id
pub const ACTIVE_LABEL_BY_ID: &str = r#"
    SELECT id, name, sample_count
    FROM labels
    WHERE id = ?1 AND is_active = 1
"#;

/// Single join row; ?1 = collection id, ?2 = label id
pub const INSERT_COLLECTION_LABEL: &str = r#"
    INSERT INTO collection_labels (collection_id, label_id)
    SELECT ?1, ?2
"#;

/// Version history of one speech API; ?1 = speech API id
pub const SPEECH_API_VERSIONS: &str = r#"
    SELECT id, speech_api_id, version_number, is_active, updated_at AS last_updated
    FROM speech_api_versions
    WHERE speech_api_id = ?1
    ORDER BY version_number
"#;

/// One version snapshot; ?1 = version id
pub const SPEECH_API_VERSION_BY_ID: &str = r#"
    SELECT id, speech_api_id, version_number, is_active, updated_at AS last_updated
    FROM speech_api_versions
    WHERE id = ?1
"#;

/// Name of an active speech API; ?1 = speech API id
pub const ACTIVE_SPEECH_API_NAME: &str = r#"
    SELECT name
    FROM speech_apis
    WHERE id = ?1 AND is_active = 1
"#;

/// One active speech API; ?1 = speech API id
pub const ACTIVE_SPEECH_API_BY_ID: &str = r#"
    SELECT id, name, type, training_status
    FROM speech_apis
    WHERE id = ?1 AND is_active = 1
"#;
