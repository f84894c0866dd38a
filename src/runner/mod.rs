//! Turn runner module - serves one query end-to-end.
//!
//! This module provides:
//! - TurnRunner, which validates the query, serializes turns per session,
//!   drives the router and aggregates its event stream
//! - Construction from configuration against a real or scripted backend

mod turn_runner;

pub use turn_runner::TurnRunner;
