//! Core types and trait definitions for the ClaimStore.
//!
//! This crate has no HTTP or database dependencies.
//! Storage backends implement [`store::ClaimStore`]; the REST layer and the
//! administrative binary depend only on that abstraction.

pub mod claim;
pub mod equivalence;
pub mod error;
pub mod registry;
pub mod store;
pub mod submission;

pub use error::{Error, Rejection, Result};
