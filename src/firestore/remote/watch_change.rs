use crate::firestore::error::FirestoreError;
use crate::firestore::model::{DocumentKey, Timestamp};
use crate::firestore::value::MapValue;

/// One of the three record types the watch stream emits. Decoding these out
/// of the wire protocol is a concern of the network layer; this type is the
/// aggregator's input boundary.
#[derive(Debug, Clone)]
pub enum WatchChange {
    Document(DocumentWatchChange),
    Target(WatchTargetChange),
    ExistenceFilter(ExistenceFilterChange),
}

/// A document body or an explicit absence, each carrying the version at
/// which it was observed.
#[derive(Debug, Clone, PartialEq)]
pub enum MaybeDocument {
    Document(WatchDocument),
    NoDocument { key: DocumentKey, version: Timestamp },
}

impl MaybeDocument {
    pub fn key(&self) -> &DocumentKey {
        match self {
            MaybeDocument::Document(doc) => &doc.key,
            MaybeDocument::NoDocument { key, .. } => key,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatchDocument {
    pub key: DocumentKey,
    pub fields: MapValue,
    pub version: Timestamp,
}

/// A document changed for a set of targets and/or fell out of a set of
/// targets, reported against a single key.
///
/// `new_doc` distinguishes three cases for each of `updated_target_ids`:
/// `Some(Document(..))` is a body update, `Some(NoDocument(..))` is an
/// authoritative deletion, and `None` means the key left the target's view
/// without the server sending a body to synthesize a deletion from.
#[derive(Debug, Clone)]
pub struct DocumentWatchChange {
    pub updated_target_ids: Vec<i32>,
    pub removed_target_ids: Vec<i32>,
    pub key: DocumentKey,
    pub new_doc: Option<MaybeDocument>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetChangeState {
    NoChange,
    Added,
    Removed,
    Current,
    Reset,
}

#[derive(Debug, Clone)]
pub struct WatchTargetChange {
    pub state: TargetChangeState,
    pub target_ids: Vec<i32>,
    /// Empty means "no token carried by this change".
    pub resume_token: Vec<u8>,
    pub cause: Option<FirestoreError>,
}

/// A server-sent cardinality hint for a target. The aggregator does not
/// decide whether this disagrees with its own bookkeeping; a caller compares
/// `count` against [`super::WatchChangeAggregator::current_size`] and, on
/// mismatch, calls `handle_existence_filter_mismatch`.
#[derive(Debug, Clone, Copy)]
pub struct ExistenceFilterChange {
    pub target_id: i32,
    pub count: i64,
}

/// What kind of document change a target accumulated since the last emitted
/// snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
}
