//! Drives a `WatchChangeAggregator` through an existence-filter mismatch and
//! shows the synthetic `Removed` entries a target reset produces.
//!
//! Run with: `cargo run --example watch_aggregator_existence_filter_reset`

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use firestore_watch_sync::firestore::model::{DocumentKey, ResourcePath, Timestamp};
use firestore_watch_sync::firestore::remote::target_metadata::{
    QueryData, QueryPurpose, TargetMetadataProvider, TargetQuery,
};
use firestore_watch_sync::firestore::remote::{
    DocumentWatchChange, ExistenceFilterChange, MaybeDocument, TargetChangeState,
    WatchChangeAggregator, WatchDocument, WatchTargetChange,
};
use firestore_watch_sync::firestore::value::MapValue;

/// A toy stand-in for the local query cache: holds the registered query and
/// the keys the local store believed were matched as of the last snapshot.
struct InMemoryMetadata {
    queries: Mutex<BTreeMap<i32, QueryData>>,
    synced_keys: Mutex<BTreeMap<i32, BTreeSet<DocumentKey>>>,
}

impl InMemoryMetadata {
    fn new() -> Self {
        Self {
            queries: Mutex::new(BTreeMap::new()),
            synced_keys: Mutex::new(BTreeMap::new()),
        }
    }

    fn register(&self, target_id: i32, path: &str) {
        let query = TargetQuery::collection(ResourcePath::from_string(path).unwrap());
        self.queries.lock().unwrap().insert(
            target_id,
            QueryData {
                target_id,
                purpose: QueryPurpose::Listen,
                query,
            },
        );
    }

    fn seed_synced_keys(&self, target_id: i32, keys: &[&str]) {
        let set = keys
            .iter()
            .map(|path| DocumentKey::from_string(path).unwrap())
            .collect();
        self.synced_keys.lock().unwrap().insert(target_id, set);
    }
}

impl TargetMetadataProvider for InMemoryMetadata {
    fn query_data(&self, target_id: i32) -> Option<QueryData> {
        self.queries.lock().unwrap().get(&target_id).cloned()
    }

    fn existing_keys(&self, target_id: i32) -> BTreeSet<DocumentKey> {
        self.synced_keys
            .lock()
            .unwrap()
            .get(&target_id)
            .cloned()
            .unwrap_or_default()
    }
}

fn main() {
    let metadata = Arc::new(InMemoryMetadata::new());
    metadata.register(1, "rooms");
    // The local store believes target 1 last synced two documents.
    metadata.seed_synced_keys(1, &["rooms/eros", "rooms/psyche"]);

    let mut aggregator = WatchChangeAggregator::new(metadata.clone());

    aggregator.record_pending_target_request(1);
    aggregator.add_target_change(WatchTargetChange {
        state: TargetChangeState::Added,
        target_ids: vec![1],
        resume_token: Vec::new(),
        cause: None,
    });
    aggregator.add_target_change(WatchTargetChange {
        state: TargetChangeState::Current,
        target_ids: vec![1],
        resume_token: b"tok-before-mismatch".to_vec(),
        cause: None,
    });

    // A fresh document arrives for the target this batch...
    let key = DocumentKey::from_string("rooms/eros").unwrap();
    aggregator.add_document_change(DocumentWatchChange {
        updated_target_ids: vec![1],
        removed_target_ids: vec![],
        key: key.clone(),
        new_doc: Some(MaybeDocument::Document(WatchDocument {
            key,
            fields: MapValue::new(BTreeMap::new()),
            version: Timestamp::new(1, 0),
        })),
    });

    // ...but the server's existence filter reports a count that disagrees
    // with the client's own bookkeeping (2 synced + 0 net change here, since
    // "rooms/eros" was already synced so the change is a Modified, not an
    // Added). The aggregator never decides this itself: the caller compares
    // the filter's count against `current_size` and only then calls
    // `handle_existence_filter_mismatch`, which forces a full target reset.
    let filter = ExistenceFilterChange {
        target_id: 1,
        count: 5,
    };
    if aggregator.current_size(filter.target_id) != filter.count {
        aggregator.handle_existence_filter_mismatch(filter.target_id);
    }

    let event = aggregator.create_remote_event(Timestamp::new(2, 0));
    let change = event.target_changes.get(&1).expect("target 1 is active");
    println!("target 1 after reset:");
    println!("  current: {}", change.current);
    println!("  resume_token: {:?}", String::from_utf8_lossy(&change.resume_token));
    println!("  removed: {:?}", change.removed_documents);
    println!(
        "  (no bodies synthesized for the reset removals: document_updates has {} entries)",
        event.document_updates.len()
    );
}
