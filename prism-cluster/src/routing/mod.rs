//! Shard routing table and request-dispatch iterator subsystem.
//!
//! An `IndexShardRoutingTable` is the immutable, read-optimized grouping of
//! every replica of one `(index, shard_number)` pair. It is built once (via
//! [`IndexShardRoutingTableBuilder`] or by decoding the wire form) and then
//! read concurrently, without locking, by every search and indexing
//! operation that needs to pick a shard copy to target. The family of
//! [`ShardIteratorPolicy`] values describes every way a client preference
//! (round-robin, prefer a node, prefer a zone/rack, primary-first,
//! only-on-node) can turn that table into an ordered [`ShardIterator`] to
//! walk.
//!
//! This module has no compile-time dependency on [`crate::placement`] or
//! any other control-plane machinery: it is a standalone read-path library,
//! fed by whatever produces `ShardRouting` values and a
//! [`NodeAttributeSource`] for attribute-aware preferences.

mod builder;
mod codec;
mod iterator;
mod shard_id;
mod shard_routing;
mod table;

pub use builder::IndexShardRoutingTableBuilder;
pub use codec::{decode_fat, decode_thin, encode_fat, encode_thin, read_vu32, read_vu64, write_vu32, write_vu64, RoutingError};
pub use iterator::{build_iterator, ShardIterator, ShardIteratorPolicy};
pub use shard_id::ShardId;
pub use shard_routing::{ShardRouting, ShardRoutingState};
pub use table::{AttributesKey, AttributesRoutings, IndexShardRoutingTable, NodeAttributeSource};
