//! Incremental construction of an `IndexShardRoutingTable`.

use super::shard_id::ShardId;
use super::shard_routing::ShardRouting;
use super::table::IndexShardRoutingTable;

/// Accumulates `ShardRouting` entries for one shard group, then freezes them
/// into an `IndexShardRoutingTable`. Single use: `build()` consumes the
/// builder.
#[derive(Debug, Clone)]
pub struct IndexShardRoutingTableBuilder {
    shard_id: ShardId,
    shards: Vec<ShardRouting>,
    allocated_post_api: bool,
}

impl IndexShardRoutingTableBuilder {
    pub fn new(shard_id: ShardId) -> Self {
        Self {
            shard_id,
            shards: Vec::new(),
            allocated_post_api: false,
        }
    }

    /// Pre-seed from an already-materialized list, e.g. the wire codec or
    /// `normalize_versions`. Applies the same duplicate-assignment rule as
    /// repeated `add_shard` calls.
    pub fn from_entries(shard_id: ShardId, entries: Vec<ShardRouting>, allocated_post_api: bool) -> Self {
        let mut builder = Self::new(shard_id);
        builder.allocated_post_api = allocated_post_api;
        for entry in entries {
            builder.add_shard(entry);
        }
        builder
    }

    /// Append `entry`, unless another already-assigned entry in this builder
    /// occupies the same node: in that case the new entry is dropped
    /// silently rather than treated as an error.
    pub fn add_shard(&mut self, entry: ShardRouting) -> &mut Self {
        if let Some(node_id) = entry.current_node_id() {
            let duplicate = self
                .shards
                .iter()
                .any(|existing| existing.assigned_to_node() && existing.current_node_id() == Some(node_id));
            if duplicate {
                tracing::debug!(
                    shard = %self.shard_id,
                    node_id,
                    "dropping duplicate shard assignment to the same node"
                );
                return self;
            }
        }
        self.shards.push(entry);
        self
    }

    /// Structural remove by equality.
    pub fn remove_shard(&mut self, entry: &ShardRouting) -> &mut Self {
        if let Some(pos) = self.shards.iter().position(|s| s == entry) {
            self.shards.remove(pos);
        }
        self
    }

    pub fn shards(&self) -> &[ShardRouting] {
        &self.shards
    }

    /// OR the flag in (it only ever latches true) rather than overwrite it — used by
    /// the wire codec to seed a builder from a decoded `allocatedPostApi`
    /// byte before replaying the decoded entries.
    pub fn set_allocated_post_api(&mut self, value: bool) -> &mut Self {
        self.allocated_post_api = self.allocated_post_api || value;
        self
    }

    /// Freeze the accumulated entries. Promotes `allocated_post_api` to
    /// `true` if any primary in the (possibly still-false) builder state is
    /// active — mirroring `IndexShardRoutingTable::from_parts`'s own
    /// promotion so the flag is correct even for callers that inspect the
    /// builder before calling `build()`.
    pub fn build(mut self) -> IndexShardRoutingTable {
        if !self.allocated_post_api && self.shards.iter().any(|s| s.primary() && s.active()) {
            self.allocated_post_api = true;
        }
        IndexShardRoutingTable::from_parts(self.shard_id, self.shards, self.allocated_post_api)
    }
}
