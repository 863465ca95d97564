//! Concrete repository implementations.

pub mod blob;
pub mod job;
pub mod job_data;

pub use blob::BlobRepository;
pub use job::JobRepository;
pub use job_data::JobDataRepository;
