//! Blob storage primitives.

pub mod model;

pub use model::{BlobHead, BlobPartPayload};
