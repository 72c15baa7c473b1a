//! Storage Layer
//!
//! JSON configuration persistence.

pub mod config;

pub use config::*;
