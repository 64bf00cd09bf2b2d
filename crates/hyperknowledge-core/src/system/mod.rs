//! # System Module
//!
//! Summary metrics of a store, used for status reporting.

mod metrics;

pub use metrics::*;
