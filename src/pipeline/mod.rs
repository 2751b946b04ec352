//! Read streaming
//!
//! `streaming.rs` feeds alignment records from a reader thread into a
//! [`BridgeResolver`](crate::assembly::BridgeResolver) held behind a lock.

pub mod streaming;

pub use streaming::{StreamingResolver, StreamingStats};
