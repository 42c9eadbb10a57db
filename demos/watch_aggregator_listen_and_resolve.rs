//! Drives a `WatchChangeAggregator` through a listen + limbo-resolution
//! session and prints the `RemoteEvent` it produces at the snapshot
//! boundary.
//!
//! Run with: `cargo run --example watch_aggregator_listen_and_resolve`

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use firestore_watch_sync::firestore::model::{DocumentKey, ResourcePath, Timestamp};
use firestore_watch_sync::firestore::remote::target_metadata::{
    QueryData, QueryPurpose, TargetMetadataProvider, TargetQuery,
};
use firestore_watch_sync::firestore::remote::{
    DocumentWatchChange, MaybeDocument, TargetChangeState, WatchChangeAggregator, WatchDocument,
    WatchTargetChange,
};
use firestore_watch_sync::firestore::value::MapValue;

/// A toy stand-in for the local query cache the real aggregator is driven
/// by: holds the registered queries and the keys each target last synced.
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

    fn register(&self, target_id: i32, path: &str, purpose: QueryPurpose) {
        let query = TargetQuery::collection(ResourcePath::from_string(path).unwrap());
        self.queries.lock().unwrap().insert(
            target_id,
            QueryData {
                target_id,
                purpose,
                query,
            },
        );
    }

    /// Simulates the client unsubscribing `target_id`: the next emission
    /// will treat it as inactive.
    fn unregister(&self, target_id: i32) {
        self.queries.lock().unwrap().remove(&target_id);
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
    // Target 1: a normal listen on the "rooms" collection.
    metadata.register(1, "rooms", QueryPurpose::Listen);
    // Target 2: a dedicated limbo-resolution target for a single document
    // the client suspects may no longer exist.
    metadata.register(2, "rooms", QueryPurpose::LimboResolution);

    let mut aggregator = WatchChangeAggregator::new(metadata.clone());

    for target_id in [1, 2] {
        aggregator.record_pending_target_request(target_id);
        aggregator.add_target_change(WatchTargetChange {
            state: TargetChangeState::Added,
            target_ids: vec![target_id],
            resume_token: Vec::new(),
            cause: None,
        });
        aggregator.add_target_change(WatchTargetChange {
            state: TargetChangeState::Current,
            target_ids: vec![target_id],
            resume_token: format!("resume-{target_id}").into_bytes(),
            cause: None,
        });
    }

    let key = DocumentKey::from_string("rooms/eros").unwrap();
    aggregator.add_document_change(DocumentWatchChange {
        updated_target_ids: vec![1, 2],
        removed_target_ids: vec![],
        key: key.clone(),
        new_doc: Some(MaybeDocument::Document(WatchDocument {
            key,
            fields: MapValue::new(BTreeMap::new()),
            version: Timestamp::new(1, 0),
        })),
    });

    // Target 1's listen goes away before the snapshot boundary; target 2's
    // limbo-resolution listen is now the only claimant of "rooms/eros", so
    // it becomes resolved.
    metadata.unregister(1);

    let event = aggregator.create_remote_event(Timestamp::new(2, 0));
    println!("target changes: {}", event.target_changes.len());
    for (target_id, change) in &event.target_changes {
        println!(
            "  target {target_id}: current={} added={} modified={} removed={}",
            change.current,
            change.added_documents.len(),
            change.modified_documents.len(),
            change.removed_documents.len()
        );
    }
    println!(
        "resolved limbo documents: {}",
        event.resolved_limbo_documents.len()
    );
}
