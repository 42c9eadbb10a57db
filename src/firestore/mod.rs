#![doc = include_str!("README.md")]
pub mod error;
pub mod model;
pub mod remote;
pub mod value;

#[doc(inline)]
pub use model::{DocumentKey, FieldPath, GeoPoint, ResourcePath, Timestamp};

#[doc(inline)]
pub use remote::{
    ChangeType, DocumentWatchChange, ExistenceFilterChange, MaybeDocument, QueryData,
    QueryPurpose, RemoteEvent, TargetChange, TargetChangeState, TargetMetadataProvider,
    WatchChange, WatchChangeAggregator, WatchTargetChange,
};

#[doc(inline)]
pub use value::{ArrayValue, BytesValue, FirestoreValue, MapValue, ValueKind};

#[doc(inline)]
pub use error::{FirestoreError, FirestoreErrorCode, FirestoreResult};
