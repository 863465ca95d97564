//! # depot-database
//!
//! PostgreSQL connection management and concrete repository
//! implementations for the pkgdepot job core.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
