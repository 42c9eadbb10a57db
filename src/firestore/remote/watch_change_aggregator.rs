use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::firestore::model::{DocumentKey, Timestamp};
use crate::firestore::remote::remote_event::{RemoteEvent, TargetChange};
use crate::firestore::remote::target_metadata::{QueryData, QueryPurpose, TargetMetadataProvider};
use crate::firestore::remote::watch_change::{
    ChangeType, DocumentWatchChange, MaybeDocument, TargetChangeState, WatchChange, WatchDocument,
    WatchTargetChange,
};

/// Bookkeeping for one target since the last emitted snapshot.
///
/// Created lazily on first reference (see [`WatchChangeAggregator::ensure`])
/// and never deleted except by [`WatchChangeAggregator::reset_target`]; a
/// target stops mattering when the collaborator's
/// [`TargetMetadataProvider::query_data`] starts returning `None` for it,
/// not by dropping this struct.
struct TargetState {
    pending_responses: u32,
    current: bool,
    resume_token: Vec<u8>,
    snapshot_changes: BTreeMap<DocumentKey, ChangeType>,
}

impl TargetState {
    fn new() -> Self {
        Self {
            pending_responses: 0,
            current: false,
            resume_token: Vec::new(),
            snapshot_changes: BTreeMap::new(),
        }
    }
}

/// Consumes `DocumentWatchChange`, `WatchTargetChange`, and
/// `ExistenceFilterChange` records and accumulates them into a
/// [`RemoteEvent`] per target, flushed on demand by
/// [`WatchChangeAggregator::create_remote_event`].
///
/// Single-threaded, synchronous, in-memory: every method here is expected to
/// run on the caller's watch-stream event loop with no suspension between
/// calls, so no interior locking is needed.
pub struct WatchChangeAggregator<P: TargetMetadataProvider> {
    metadata: Arc<P>,
    target_states: BTreeMap<i32, TargetState>,
    document_updates: BTreeMap<DocumentKey, MaybeDocument>,
    document_target_mapping: BTreeMap<DocumentKey, BTreeSet<i32>>,
}

impl<P: TargetMetadataProvider> WatchChangeAggregator<P> {
    pub fn new(metadata: Arc<P>) -> Self {
        Self {
            metadata,
            target_states: BTreeMap::new(),
            document_updates: BTreeMap::new(),
            document_target_mapping: BTreeMap::new(),
        }
    }

    /// Dispatches one decoded watch-stream record to the matching handler.
    ///
    /// `WatchChange::ExistenceFilter` is deliberately left undispatched: per
    /// spec, the aggregator never decides a mismatch itself. A caller that
    /// receives an `ExistenceFilterChange` must compare its count against
    /// [`Self::current_size`] itself and call
    /// [`Self::handle_existence_filter_mismatch`] directly on disagreement.
    pub fn handle_watch_change(&mut self, change: WatchChange) {
        match change {
            WatchChange::Document(change) => self.add_document_change(change),
            WatchChange::Target(change) => self.add_target_change(change),
            WatchChange::ExistenceFilter(_) => {}
        }
    }

    /// Records that the client sent a Listen or Unlisten RPC for `target_id`
    /// so a later Added/Removed ack can be balanced against it. Until the
    /// ack arrives the target is not active and contributes nothing to any
    /// `RemoteEvent`.
    pub fn record_pending_target_request(&mut self, target_id: i32) {
        self.ensure(target_id).pending_responses += 1;
    }

    pub fn add_document_change(&mut self, change: DocumentWatchChange) {
        let DocumentWatchChange {
            updated_target_ids,
            removed_target_ids,
            key,
            new_doc,
        } = change;

        for target_id in updated_target_ids {
            match &new_doc {
                Some(MaybeDocument::Document(doc)) => self.add_document(target_id, doc.clone()),
                Some(no_doc @ MaybeDocument::NoDocument { .. }) => {
                    self.remove_document(target_id, key.clone(), Some(no_doc.clone()));
                }
                None => self.remove_document(target_id, key.clone(), None),
            }
        }

        for target_id in removed_target_ids {
            self.remove_document(target_id, key.clone(), None);
        }
    }

    pub fn add_target_change(&mut self, change: WatchTargetChange) {
        for &target_id in &change.target_ids {
            match change.state {
                TargetChangeState::NoChange => {
                    if self.is_active_target(target_id) {
                        self.update_resume_token(target_id, &change.resume_token);
                    }
                }
                TargetChangeState::Added => {
                    if self.record_target_response(target_id) {
                        self.ensure(target_id).current = false;
                    }
                    self.update_resume_token(target_id, &change.resume_token);
                }
                TargetChangeState::Removed => {
                    self.record_target_response(target_id);
                    assert!(
                        change.cause.is_none(),
                        "an errored Removed change must be translated into a user-visible \
                         error and an unregister by the caller, never forwarded here"
                    );
                }
                TargetChangeState::Current => {
                    if self.is_active_target(target_id) {
                        self.ensure(target_id).current = true;
                        self.update_resume_token(target_id, &change.resume_token);
                    }
                }
                TargetChangeState::Reset => {
                    if self.is_active_target(target_id) {
                        self.reset_target(target_id);
                        self.update_resume_token(target_id, &change.resume_token);
                    }
                }
            }
        }
    }

    /// Called by an upstream comparator once it has decided `target_id`'s
    /// existence filter disagrees with [`Self::current_size`].
    pub fn handle_existence_filter_mismatch(&mut self, target_id: i32) {
        self.reset_target(target_id);
    }

    /// `|existing keys| + net added/removed this batch`, used by the
    /// upstream existence-filter comparator.
    pub fn current_size(&self, target_id: i32) -> i64 {
        let existing = self.metadata.existing_keys(target_id).len() as i64;
        let delta: i64 = self
            .target_states
            .get(&target_id)
            .map(|state| {
                state
                    .snapshot_changes
                    .values()
                    .map(|change_type| match change_type {
                        ChangeType::Added => 1,
                        ChangeType::Modified => 0,
                        ChangeType::Removed => -1,
                    })
                    .sum()
            })
            .unwrap_or(0);
        existing + delta
    }

    /// Drops `target_states[target_id]` and re-queues a synthetic `Removed`
    /// entry for every key the local store last believed belonged to the
    /// target, so the server's silence on re-send after a reset still
    /// results in those documents being dropped from the next snapshot.
    pub fn reset_target(&mut self, target_id: i32) {
        self.target_states.remove(&target_id);
        for key in self.metadata.existing_keys(target_id) {
            self.remove_document(target_id, key, None);
        }
    }

    /// Builds the `RemoteEvent` for the active targets, synthesizing the
    /// missing-single-document case, computing resolved limbo documents,
    /// and clearing all per-batch state before returning.
    pub fn create_remote_event(&mut self, snapshot_version: Timestamp) -> RemoteEvent {
        let active_targets: Vec<i32> = self
            .target_states
            .keys()
            .copied()
            .filter(|&target_id| self.is_active_target(target_id))
            .collect();

        let mut target_changes = BTreeMap::new();

        for target_id in active_targets {
            let query_data = match self.query_data(target_id) {
                Some(query_data) => query_data,
                None => continue,
            };

            let needs_synthesis = {
                let state = self
                    .target_states
                    .get(&target_id)
                    .expect("active target has state");
                state.snapshot_changes.is_empty()
                    && state.current
                    && query_data.query.is_document_query()
            };

            if needs_synthesis {
                if let Ok(key) = DocumentKey::from_path(query_data.query.path.clone()) {
                    self.synthesize_missing_document(target_id, key, snapshot_version);
                }
            }

            let state = self
                .target_states
                .get_mut(&target_id)
                .expect("active target has state");

            let mut added = BTreeSet::new();
            let mut modified = BTreeSet::new();
            let mut removed = BTreeSet::new();
            for (key, change_type) in std::mem::take(&mut state.snapshot_changes) {
                match change_type {
                    ChangeType::Added => {
                        added.insert(key);
                    }
                    ChangeType::Modified => {
                        modified.insert(key);
                    }
                    ChangeType::Removed => {
                        removed.insert(key);
                    }
                }
            }

            target_changes.insert(
                target_id,
                TargetChange {
                    current: state.current,
                    resume_token: state.resume_token.clone(),
                    snapshot_version,
                    added_documents: added,
                    modified_documents: modified,
                    removed_documents: removed,
                },
            );
        }

        let resolved_limbo_documents = self.compute_resolved_limbo_documents();
        let document_updates = std::mem::take(&mut self.document_updates);
        self.document_target_mapping.clear();

        RemoteEvent {
            snapshot_version,
            target_changes,
            resolved_limbo_documents,
            document_updates,
        }
    }

    fn add_document(&mut self, target_id: i32, doc: WatchDocument) {
        if !self.is_active_target(target_id) {
            return;
        }
        let key = doc.key.clone();
        let change_type = if self.has_synced_document(target_id, &key) {
            ChangeType::Modified
        } else {
            ChangeType::Added
        };
        self.ensure(target_id)
            .snapshot_changes
            .insert(key.clone(), change_type);
        self.document_updates
            .insert(key.clone(), MaybeDocument::Document(doc));
        self.document_target_mapping
            .entry(key)
            .or_default()
            .insert(target_id);
    }

    fn remove_document(
        &mut self,
        target_id: i32,
        key: DocumentKey,
        removed_document: Option<MaybeDocument>,
    ) {
        if !self.is_active_target(target_id) {
            return;
        }
        if self.has_synced_document(target_id, &key) {
            self.ensure(target_id)
                .snapshot_changes
                .insert(key.clone(), ChangeType::Removed);
            if let Some(doc) = removed_document {
                self.document_updates.insert(key.clone(), doc);
            }
        } else if let Some(state) = self.target_states.get_mut(&target_id) {
            state.snapshot_changes.remove(&key);
        }
        // Ensure the reverse-index entry exists even when this key was never
        // added in this batch (e.g. a reset re-removing a previously synced
        // key) so an empty claimant set still surfaces for resolved-limbo
        // computation instead of being silently absent from the map.
        self.document_target_mapping
            .entry(key)
            .or_default()
            .remove(&target_id);
    }

    /// Bypasses the usual `has_synced_document` gate: a document query with
    /// no changes this snapshot and no body ever observed is, by
    /// construction, absent, regardless of whether the local store had
    /// previously synced a body for it.
    fn synthesize_missing_document(&mut self, target_id: i32, key: DocumentKey, version: Timestamp) {
        self.ensure(target_id)
            .snapshot_changes
            .insert(key.clone(), ChangeType::Removed);
        self.document_updates
            .insert(key.clone(), MaybeDocument::NoDocument { key, version });
    }

    fn compute_resolved_limbo_documents(&self) -> BTreeSet<DocumentKey> {
        let mut resolved = BTreeSet::new();
        'keys: for (key, targets) in &self.document_target_mapping {
            for &target_id in targets {
                if !self.is_active_target(target_id) {
                    continue;
                }
                match self.query_data(target_id) {
                    Some(query_data) if query_data.purpose == QueryPurpose::LimboResolution => {
                        continue;
                    }
                    _ => continue 'keys,
                }
            }
            resolved.insert(key.clone());
        }
        resolved
    }

    fn ensure(&mut self, target_id: i32) -> &mut TargetState {
        self.target_states
            .entry(target_id)
            .or_insert_with(TargetState::new)
    }

    /// Decrements the outstanding-ack counter and reports whether it just
    /// reached zero, so callers can distinguish a fresh `Added` ack (which
    /// should drop `current` back to false) from one that still has more
    /// acks outstanding.
    fn record_target_response(&mut self, target_id: i32) -> bool {
        let state = self.ensure(target_id);
        state.pending_responses -= 1;
        state.pending_responses == 0
    }

    fn update_resume_token(&mut self, target_id: i32, token: &[u8]) {
        if !token.is_empty() {
            self.ensure(target_id).resume_token = token.to_vec();
        }
    }

    fn query_data(&self, target_id: i32) -> Option<QueryData> {
        self.metadata.query_data(target_id)
    }

    fn has_synced_document(&self, target_id: i32, key: &DocumentKey) -> bool {
        self.metadata.existing_keys(target_id).contains(key)
    }

    fn is_active_target(&self, target_id: i32) -> bool {
        let pending = self
            .target_states
            .get(&target_id)
            .map(|state| state.pending_responses)
            .unwrap_or(0);
        pending == 0 && self.query_data(target_id).is_some()
    }
}
