//! `bangbang-node` library crate.
//!
//! Re-exports the runner pieces for integration testing. The binary
//! entrypoint lives in `main.rs`.

pub mod context;
pub mod printer;
pub mod runner;
