//! Concierge - routes user queries to one of two specialist handlers
//!
//! A router classifies each query and delegates it to a Support or Wellness
//! specialist. Each specialist runs a bounded tool-use loop that ends only
//! when the model calls `finalize`. Sessions keep one ordered history per id.

pub mod agents;
pub mod config;
pub mod error;
pub mod llm;
pub mod runner;
pub mod session;
pub mod tools;

pub use error::{ConciergeError, ErrorBody, Result};
