//! Built-in job handler implementations.

pub mod garbage_collect;

pub use garbage_collect::{GarbageCollectJobHandler, GARBAGE_COLLECT_JOB_TYPE};
