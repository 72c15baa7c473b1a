//! Services
//!
//! Capability providers and local capabilities (`tools`), and the turn
//! orchestration that drives them (`orchestrator`).

pub mod orchestrator;
pub mod tools;
