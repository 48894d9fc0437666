//! Core types for tradedesk
//!
//! This crate defines the pieces shared by every orchestration subsystem:
//! the error taxonomy that all subsystem errors collapse into, and the
//! generation counter used to discard results of superseded operations.

pub mod error;
pub mod generation;

pub use error::{Error, Result};
pub use generation::{Generation, GenerationCounter};
