//! Core types and trait definitions for the Lectern classroom sync layer.
//!
//! This crate is deliberately free of database dependencies. All other
//! crates depend on it; it depends on no storage backend.

pub mod answer;
pub mod error;
pub mod points;
pub mod question;
pub mod session;
pub mod store;

pub use error::{Error, Result};
