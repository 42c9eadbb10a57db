use std::collections::BTreeSet;

use crate::firestore::model::{DocumentKey, ResourcePath};

/// Why a target is being listened to.
///
/// Only the `LimboResolution` variant changes aggregator behavior: it marks
/// a target as a dedicated single-document listen used to confirm whether a
/// document a client suspects exists actually does. Such targets are
/// excluded when deciding whether a document has become fully unreferenced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryPurpose {
    Listen,
    ExistenceFilterMismatch,
    LimboResolution,
}

/// The portion of a query's shape the aggregator needs: whether it names a
/// single document (as opposed to a collection) and, if so, which one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetQuery {
    pub path: ResourcePath,
    pub collection_group: Option<String>,
}

impl TargetQuery {
    pub fn collection(path: ResourcePath) -> Self {
        Self {
            path,
            collection_group: None,
        }
    }

    pub fn collection_group(path: ResourcePath, collection_id: impl Into<String>) -> Self {
        Self {
            path,
            collection_group: Some(collection_id.into()),
        }
    }

    pub fn document(path: ResourcePath) -> Self {
        Self {
            path,
            collection_group: None,
        }
    }

    /// True when `path` names a document rather than a collection: an even,
    /// non-empty number of segments and no collection-group fan-out.
    pub fn is_document_query(&self) -> bool {
        self.collection_group.is_none() && !self.path.is_empty() && self.path.len() % 2 == 0
    }
}

/// Metadata the aggregator is told about an active listen target.
///
/// Supplied by the collaborator that owns query registration (the local
/// query cache); the aggregator only ever reads it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryData {
    pub target_id: i32,
    pub purpose: QueryPurpose,
    pub query: TargetQuery,
}

/// The two read-only callbacks the aggregator needs from its surrounding
/// local store. Implementors must return data observable at call time; the
/// aggregator never caches or mutates anything it reads through this trait.
pub trait TargetMetadataProvider: Send + Sync {
    /// Current `QueryData` for `target_id`, or `None` if the caller has
    /// stopped listening (the target is inert from the aggregator's view).
    fn query_data(&self, target_id: i32) -> Option<QueryData>;

    /// Document keys the local store believes `target_id` matched as of the
    /// last emitted snapshot.
    fn existing_keys(&self, target_id: i32) -> BTreeSet<DocumentKey>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_path_is_a_document_query() {
        let query = TargetQuery::document(ResourcePath::from_string("rooms/eros").unwrap());
        assert!(query.is_document_query());
    }

    #[test]
    fn collection_path_is_not_a_document_query() {
        let query = TargetQuery::collection(ResourcePath::from_string("rooms").unwrap());
        assert!(!query.is_document_query());
    }

    #[test]
    fn collection_group_is_never_a_document_query() {
        let query =
            TargetQuery::collection_group(ResourcePath::root(), "rooms");
        assert!(!query.is_document_query());
    }
}
