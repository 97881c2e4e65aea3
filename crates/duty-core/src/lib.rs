//! Core types for the duty incident log.
//!
//! This crate holds the typed incident record, the normalisation boundary
//! between stored rows and typed records, the location directory editor, the
//! operator form contract, the daily report formatter, and the
//! [`store::IncidentStore`] trait. It carries no database or HTTP
//! dependencies.

pub mod directory;
pub mod error;
pub mod form;
pub mod incident;
pub mod normalize;
pub mod report;
pub mod store;

pub use error::{Error, Result};
