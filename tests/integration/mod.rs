//! Integration test suite for reviewtask.
//!
//! End-to-end coverage of the self-update state machine, driven against a
//! local HTTP fixture server so no test ever reaches the network.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **fixture**: minimal canned-response HTTP server plus release
//!   archive/checksum builders
//! - **update_flow**: the orchestrator's terminal states (done, up to
//!   date, verification failures, rollback)
//! - **cli**: argument surface of the installed binary

mod cli;
mod fixture;
mod update_flow;
