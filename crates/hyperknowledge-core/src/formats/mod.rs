//! # Formats
//!
//! Serialized forms of a whole store. File I/O lives in the app layer.

pub mod snapshot;

pub use snapshot::{graph_from_json, graph_to_json, snapshot_checksum};

#[cfg(feature = "crypto-hash")]
pub use snapshot::{snapshot_crypto_hash, verify_crypto_hash};
