//! Table builder
//!
//! Turns a pre-order stream of node events into a database directory in two
//! phases that are separate types:
//!
//! ```text
//! Builder --close--> ClosedBuild --reconcile--> Reconciler --finish--> Finished
//!  (append)           (streams closed)           (patch replay)         (metadata written)
//! ```
//!
//! Memory use is independent of document size: records, overflow values
//! and deferred patches all stream to disk.

mod builder;
mod inline;
mod patch;
mod reconcile;

pub use builder::{BuildStats, Builder, LeafKind};
pub use inline::inline_int;
pub use patch::{Patch, PatchLog, PatchReader};
pub use reconcile::{ClosedBuild, Finished, Reconciler};
