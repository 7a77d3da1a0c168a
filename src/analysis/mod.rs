//! Analysis modules.
//!
//! Load → clean → bucket → aggregate. `clean` builds the immutable
//! dataset, the remaining modules are pure statistics over it, and
//! `pipeline` strings them together into a [`Summary`](crate::models::Summary).

pub mod buckets;
pub mod categorical;
pub mod clean;
pub mod correlation;
pub mod pipeline;
pub mod stats;
pub mod timeseries;

pub use buckets::{BucketDef, BucketSet};
pub use clean::clean;
pub use pipeline::Pipeline;
