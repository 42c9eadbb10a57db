pub mod remote_event;
pub mod target_metadata;
pub mod watch_change;
pub mod watch_change_aggregator;

pub use remote_event::{RemoteEvent, TargetChange};
pub use target_metadata::{QueryData, QueryPurpose, TargetMetadataProvider, TargetQuery};
pub use watch_change::{
    ChangeType, DocumentWatchChange, ExistenceFilterChange, MaybeDocument, TargetChangeState,
    WatchChange, WatchDocument, WatchTargetChange,
};
pub use watch_change_aggregator::WatchChangeAggregator;
