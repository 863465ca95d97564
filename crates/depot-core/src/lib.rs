//! # depot-core
//!
//! Core crate for pkgdepot. Contains the unified error system,
//! configuration schemas, identifier code helpers, pagination types, and
//! the durable data-store contract.
//!
//! This crate has **no** internal dependencies on other pkgdepot crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
