//! Core abstractions for class diagram synchronization
//!
//! This module defines the data model shared by every stage of the pipeline
//! and the traits a language plugin implements to feed it.

mod config;
mod database;
mod detector;
mod diagnostic;
mod error;
mod extractor;
pub mod logging;
mod naming;
mod types;

pub use config::*;
pub use database::*;
pub use detector::*;
pub use diagnostic::*;
pub use error::*;
pub use extractor::*;
pub use logging::*;
pub use naming::*;
pub use types::*;
