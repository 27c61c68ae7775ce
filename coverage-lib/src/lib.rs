pub mod bucket;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod planner;
pub mod reconciler;
pub mod source;

pub use bucket::{bucketize, Buckets, Span};
pub use dispatch::{dispatch_all, DispatchReport, DispatchRequest, TaskId, TaskSink};
pub use error::CoverageError;
pub use model::{BlockRange, ReconciliationResult, WorkerTaskSpec};
pub use planner::{plan, plan_with, PlanOptions};
pub use reconciler::{
    reconcile, reconcile_blocks, reconcile_network, ReconcileOptions, Reconciler,
};
pub use source::{block_pages, IndexedBlockSource, LatestBlockOracle, PageRequest};
