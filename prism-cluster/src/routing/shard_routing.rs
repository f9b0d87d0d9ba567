//! A single replica of a shard, and its allocation lifecycle.

use super::shard_id::ShardId;
use serde::{Deserialize, Serialize};

/// Lifecycle state of one shard replica.
///
/// ```text
/// UNASSIGNED --allocate--> INITIALIZING --start--> STARTED --relocateOut--> RELOCATING
///      ^                        |                      ^                        |
///      +----------fail/cancel---+                      +-------relocateDone-----+
/// ```
///
/// Only `Started` and `Relocating` are *active*. Only non-`Unassigned` states
/// carry a `current_node_id`. Terminal states do not exist at this layer: a
/// shard disappears only when its owning index is removed, which is handled
/// above the routing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardRoutingState {
    Unassigned,
    Initializing,
    Started,
    Relocating,
}

impl ShardRoutingState {
    /// Active shards admit reads.
    pub fn is_active(&self) -> bool {
        matches!(self, ShardRoutingState::Started | ShardRoutingState::Relocating)
    }

    /// Decode from the single-byte wire representation.
    pub fn from_wire_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(ShardRoutingState::Unassigned),
            1 => Some(ShardRoutingState::Initializing),
            2 => Some(ShardRoutingState::Started),
            3 => Some(ShardRoutingState::Relocating),
            _ => None,
        }
    }

    /// Encode to the single-byte wire representation.
    pub fn to_wire_byte(self) -> u8 {
        match self {
            ShardRoutingState::Unassigned => 0,
            ShardRoutingState::Initializing => 1,
            ShardRoutingState::Started => 2,
            ShardRoutingState::Relocating => 3,
        }
    }
}

/// One replica (primary or not) of one shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardRouting {
    shard_id: ShardId,
    primary: bool,
    current_node_id: Option<String>,
    relocating_node_id: Option<String>,
    state: ShardRoutingState,
    version: u64,
    allocation_id: Option<String>,
}

impl ShardRouting {
    /// Construct an unassigned replica.
    pub fn new_unassigned(shard_id: ShardId, primary: bool) -> Self {
        Self {
            shard_id,
            primary,
            current_node_id: None,
            relocating_node_id: None,
            state: ShardRoutingState::Unassigned,
            version: 0,
            allocation_id: None,
        }
    }

    /// Full constructor, used by the builder/codec and by tests.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        shard_id: ShardId,
        primary: bool,
        current_node_id: Option<String>,
        relocating_node_id: Option<String>,
        state: ShardRoutingState,
        version: u64,
        allocation_id: Option<String>,
    ) -> Self {
        Self {
            shard_id,
            primary,
            current_node_id,
            relocating_node_id,
            state,
            version,
            allocation_id,
        }
    }

    pub fn shard_id(&self) -> &ShardId {
        &self.shard_id
    }

    pub fn primary(&self) -> bool {
        self.primary
    }

    pub fn current_node_id(&self) -> Option<&str> {
        self.current_node_id.as_deref()
    }

    pub fn relocating_node_id(&self) -> Option<&str> {
        self.relocating_node_id.as_deref()
    }

    pub fn state(&self) -> ShardRoutingState {
        self.state
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn allocation_id(&self) -> Option<&str> {
        self.allocation_id.as_deref()
    }

    /// STARTED or RELOCATING.
    pub fn active(&self) -> bool {
        self.state.is_active()
    }

    /// A current node id is present.
    pub fn assigned_to_node(&self) -> bool {
        self.current_node_id.is_some()
    }

    /// Clone of self with `version` raised to `version`, if higher than the current one.
    pub fn with_version_at_least(&self, version: u64) -> Self {
        if self.version >= version {
            self.clone()
        } else {
            let mut clone = self.clone();
            clone.version = version;
            clone
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard_id() -> ShardId {
        ShardId::new("products", 0)
    }

    #[test]
    fn active_predicate() {
        assert!(!ShardRoutingState::Unassigned.is_active());
        assert!(!ShardRoutingState::Initializing.is_active());
        assert!(ShardRoutingState::Started.is_active());
        assert!(ShardRoutingState::Relocating.is_active());
    }

    #[test]
    fn wire_byte_roundtrip() {
        for state in [
            ShardRoutingState::Unassigned,
            ShardRoutingState::Initializing,
            ShardRoutingState::Started,
            ShardRoutingState::Relocating,
        ] {
            assert_eq!(ShardRoutingState::from_wire_byte(state.to_wire_byte()), Some(state));
        }
        assert_eq!(ShardRoutingState::from_wire_byte(200), None);
    }

    #[test]
    fn with_version_at_least_is_identity_when_already_high_enough() {
        let r = ShardRouting::new(
            shard_id(),
            true,
            Some("node-1".into()),
            None,
            ShardRoutingState::Started,
            5,
            None,
        );
        let bumped = r.with_version_at_least(3);
        assert_eq!(bumped.version(), 5);
    }

    #[test]
    fn with_version_at_least_bumps_when_lower() {
        let r = ShardRouting::new(
            shard_id(),
            false,
            Some("node-2".into()),
            None,
            ShardRoutingState::Started,
            2,
            None,
        );
        let bumped = r.with_version_at_least(7);
        assert_eq!(bumped.version(), 7);
        assert_eq!(r.version(), 2);
    }

    #[test]
    fn unassigned_has_no_node() {
        let r = ShardRouting::new_unassigned(shard_id(), true);
        assert!(!r.assigned_to_node());
        assert!(!r.active());
    }
}
