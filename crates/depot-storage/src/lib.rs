//! # depot-storage
//!
//! Chunked durable blob storage for pkgdepot. Payloads of arbitrary size
//! are split into ordered parts under a head record and reconstructed
//! exactly on read, with length verification before any bytes are returned.
//!
//! Two implementations of the [`depot_core::traits::DataStore`] contract
//! live here: [`pg::PgDataStore`] persisting to PostgreSQL and
//! [`memory::MemoryDataStore`] keeping payloads in process memory.

pub mod chunk;
pub mod integrity;
pub mod memory;
pub mod pg;

pub use memory::MemoryDataStore;
pub use pg::PgDataStore;
