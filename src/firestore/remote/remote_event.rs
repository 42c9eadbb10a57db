use std::collections::{BTreeMap, BTreeSet};

use crate::firestore::model::{document_key::DocumentKey, timestamp::Timestamp};
use crate::firestore::remote::watch_change::MaybeDocument;

/// The consolidated output of a snapshot boundary: per-target deltas, the
/// set of documents no longer referenced by any non-limbo target, and the
/// document bodies those deltas refer to.
#[derive(Debug, Clone)]
pub struct RemoteEvent {
    pub snapshot_version: Timestamp,
    pub target_changes: BTreeMap<i32, TargetChange>,
    pub resolved_limbo_documents: BTreeSet<DocumentKey>,
    pub document_updates: BTreeMap<DocumentKey, MaybeDocument>,
}

impl RemoteEvent {
    pub fn is_empty(&self) -> bool {
        self.target_changes.is_empty()
            && self.document_updates.is_empty()
            && self.resolved_limbo_documents.is_empty()
    }
}

/// Per-target delta mirroring the Firestore JS `TargetChange` type.
#[derive(Debug, Clone, Default)]
pub struct TargetChange {
    pub current: bool,
    pub resume_token: Vec<u8>,
    pub snapshot_version: Timestamp,
    pub added_documents: BTreeSet<DocumentKey>,
    pub modified_documents: BTreeSet<DocumentKey>,
    pub removed_documents: BTreeSet<DocumentKey>,
}
