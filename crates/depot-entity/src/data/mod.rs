//! Job data domain entities.

pub mod kind;
pub mod model;

pub use kind::{JobDataEncoding, JobDataKind};
pub use model::JobData;
