// Entity models for speech-data
//
// Each entity comes in two states:
// - a handle (`*Ref`) that only knows its id and resolves the rest on demand
// - a resolved value carrying the full attribute set
//
// Entities refer to each other through handles, never by embedding state.

mod collection;
mod label;
mod speech_api;
mod speech_api_version;

pub use collection::{Collection, CollectionLabelMapping, CollectionRef};
pub use label::{Label, LabelRef};
pub use speech_api::{SpeechApi, SpeechApiRef, DEFAULT_SAMPLE_DURATION_CUT_OFF};
pub use speech_api_version::{SpeechApiVersion, SpeechApiVersionRef};

use crate::database::{Row, Statement, StoreGateway};
use crate::error::StoreError;

/// Execute a statement and parse every row, failing on the first bad row
pub(crate) fn fetch_rows<T>(
    store: &dyn StoreGateway,
    statement: &Statement,
    parse: impl Fn(&Row) -> Result<T, StoreError>,
) -> Result<Vec<T>, StoreError> {
    store.execute(statement)?.iter().map(parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::TestDb;

    // Label "Yes" and "No" go into collection "Basics", and the mapping is
    // visible from the label side.
    #[test]
    fn test_basics_collection_scenario() {
        let db = TestDb::new();
        let store: &dyn StoreGateway = &*db;

        let yes = Label::create(store, "Yes").unwrap();
        let no = Label::create(store, "No").unwrap();
        let basics = Collection::create(store, 10, 2, "Basics").unwrap();

        let mappings = basics
            .handle()
            .add_labels(store, &[yes.id, no.id])
            .unwrap();

        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[0].label, yes.handle());
        assert_eq!(mappings[0].label_name, "Yes");
        assert_eq!(mappings[1].label, no.handle());
        assert_eq!(mappings[1].label_name, "No");
        for mapping in &mappings {
            assert_eq!(mapping.collection, basics.handle());
            assert_eq!(mapping.collection_name, "Basics");
        }

        let collections = LabelRef::new(yes.id).get_collections(store).unwrap();
        assert_eq!(collections, vec![basics]);
    }
}
