//! # hkg
//!
//! Library half of the `hkg` binary, exposed so the commands can be driven
//! from integration tests.

pub mod cli;
pub mod config;
