//! # Pingstat Common
//!
//! Shared vocabulary of the probing workspace: the data model handed between
//! the probing core and its presentation layers, the error taxonomy, and the
//! configuration surface.

pub mod config;
pub mod error;
pub mod network;
pub mod stats;

pub use error::{ProbeError, Result};
