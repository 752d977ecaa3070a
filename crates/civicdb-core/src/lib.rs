//! civicdb-core
//!
//! Shared foundation for the civic question answering workspace: domain
//! types, the error enum, figment-backed configuration, the collaborator
//! traits implemented by the embed and vector crates, and the textual vector
//! literal codec used by the corpus snapshot.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;
pub mod vector;

pub use error::{Error, Result};
