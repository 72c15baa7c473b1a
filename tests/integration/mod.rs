//! Integration Tests Module
//!
//! End-to-end coverage of the runtime through its public API: the capability
//! registry, the execution sandbox, the orchestration loop, and the protocol
//! client talking to mock providers over both transports.

// Capability registry behavior
mod registry_test;

// Path confinement, command validation and edit targeting
mod sandbox_test;

// Orchestration loop states, approval, cancellation and event order
mod agentic_loop_test;

// Protocol client and provider manager over a stdio mock provider
mod mcp_stdio_test;
