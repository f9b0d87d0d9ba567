//! `IndexShardRoutingTable`: the immutable, per-shard group of all replicas.

use super::shard_id::ShardId;
use super::shard_routing::{ShardRouting, ShardRoutingState};
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// The tuple of attribute *names* used as a cache key for preference grouping.
/// Equality and hashing are by element-wise comparison of the name tuple;
/// the values a node reports for those names are not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributesKey {
    names: Vec<String>,
}

impl AttributesKey {
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Partition of `activeShards` relative to one local node's attribute values:
/// shards whose node shares every requested attribute value with the local
/// node (`with_same_attribute`), and the rest (`without_same_attribute`),
/// in source order.
#[derive(Debug, Clone)]
pub struct AttributesRoutings {
    with_same_attribute: Vec<Arc<ShardRouting>>,
    without_same_attribute: Vec<Arc<ShardRouting>>,
}

impl AttributesRoutings {
    fn new(with_same_attribute: Vec<Arc<ShardRouting>>, without_same_attribute: Vec<Arc<ShardRouting>>) -> Self {
        Self {
            with_same_attribute,
            without_same_attribute,
        }
    }

    pub fn with_same_attribute(&self) -> &[Arc<ShardRouting>] {
        &self.with_same_attribute
    }

    pub fn without_same_attribute(&self) -> &[Arc<ShardRouting>] {
        &self.without_same_attribute
    }

    pub fn total_size(&self) -> usize {
        self.with_same_attribute.len() + self.without_same_attribute.len()
    }
}

/// Looks up a node's attribute map by node id. Kept as a trait so `routing`
/// has no compile-time dependency on `placement::ClusterState` — any
/// control-plane representation of "nodes and their attributes" can drive
/// `preferAttributesActiveShardsIt`.
pub trait NodeAttributeSource {
    fn attributes(&self, node_id: &str) -> Option<&HashMap<String, String>>;
}

impl NodeAttributeSource for HashMap<String, HashMap<String, String>> {
    fn attributes(&self, node_id: &str) -> Option<&HashMap<String, String>> {
        self.get(node_id)
    }
}

/// One shard group: every replica (primary and non-primary) of one
/// `(index, shard_number)` pair, immutable once built.
///
/// The only two fields that ever
/// change after construction are `counter` (lock-free, monotonically
/// advanced) and the attribute-group cache (copy-on-write, append-only).
pub struct IndexShardRoutingTable {
    shard_id: ShardId,
    shards: Vec<Arc<ShardRouting>>,
    primary: Option<usize>,
    replicas: Vec<usize>,
    active_shards: Vec<usize>,
    assigned_shards: Vec<usize>,
    allocated_post_api: bool,
    counter: AtomicI64,
    cache: RwLock<Arc<HashMap<AttributesKey, Arc<AttributesRoutings>>>>,
    cache_write_lock: Mutex<()>,
}

impl IndexShardRoutingTable {
    /// Single-pass construction from an ordered, already-deduplicated list
    /// of replicas. Used by `IndexShardRoutingTableBuilder::build` — callers
    /// should go through the builder rather than this directly so the
    /// duplicate-assignment rule is enforced.
    pub(super) fn from_parts(shard_id: ShardId, shards: Vec<ShardRouting>, allocated_post_api: bool) -> Self {
        let shards: Vec<Arc<ShardRouting>> = shards.into_iter().map(Arc::new).collect();

        let mut primary = None;
        let mut replicas = Vec::new();
        let mut active_shards = Vec::new();
        let mut assigned_shards = Vec::new();
        let mut any_primary_active = false;

        for (i, s) in shards.iter().enumerate() {
            if s.primary() {
                primary = Some(i);
                if s.active() {
                    any_primary_active = true;
                }
            } else {
                replicas.push(i);
            }
            if s.active() {
                active_shards.push(i);
            }
            if s.assigned_to_node() {
                assigned_shards.push(i);
            }
        }

        let allocated_post_api = allocated_post_api || any_primary_active;

        let counter_seed = if shards.is_empty() {
            0
        } else {
            rand::thread_rng().gen_range(0..shards.len() as i64)
        };

        Self {
            shard_id,
            shards,
            primary,
            replicas,
            active_shards,
            assigned_shards,
            allocated_post_api,
            counter: AtomicI64::new(counter_seed),
            cache: RwLock::new(Arc::new(HashMap::new())),
            cache_write_lock: Mutex::new(()),
        }
    }

    pub fn shard_id(&self) -> &ShardId {
        &self.shard_id
    }

    pub fn size(&self) -> usize {
        self.shards.len()
    }

    pub fn shards(&self) -> &[Arc<ShardRouting>] {
        &self.shards
    }

    pub fn primary_shard(&self) -> Option<&Arc<ShardRouting>> {
        self.primary.map(|i| &self.shards[i])
    }

    pub fn replica_shards(&self) -> Vec<Arc<ShardRouting>> {
        self.replicas.iter().map(|&i| self.shards[i].clone()).collect()
    }

    pub fn active_shards(&self) -> Vec<Arc<ShardRouting>> {
        self.active_shards.iter().map(|&i| self.shards[i].clone()).collect()
    }

    pub fn assigned_shards(&self) -> Vec<Arc<ShardRouting>> {
        self.assigned_shards.iter().map(|&i| self.shards[i].clone()).collect()
    }

    pub fn allocated_post_api(&self) -> bool {
        self.allocated_post_api
    }

    pub fn count_with_state(&self, state: ShardRoutingState) -> usize {
        self.shards.iter().filter(|s| s.state() == state).count()
    }

    pub fn shards_with_state(&self, states: &[ShardRoutingState]) -> Vec<Arc<ShardRouting>> {
        self.shards
            .iter()
            .filter(|s| states.contains(&s.state()))
            .cloned()
            .collect()
    }

    /// Current counter value without advancing it. Exposed for tests that
    /// need to assert on the seed without going through a
    /// randomized iterator call.
    pub fn counter_value(&self) -> i64 {
        self.counter.load(Ordering::Relaxed)
    }

    /// `counter.fetchAndIncrement()`: called exactly once per randomized
    /// iterator construction. The raw signed value is returned; callers take
    /// its absolute value modulo a sequence length themselves, since the same
    /// fetched value can feed two differently-sized subsequences (as
    /// `preferAttributesActiveShardsIt` does).
    pub(super) fn advance_counter(&self) -> i64 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Test-only hook to pin the counter to a known value before exercising
    /// a randomized iterator policy.
    #[cfg(test)]
    pub(super) fn set_counter_for_test(&self, value: i64) {
        self.counter.store(value, Ordering::Relaxed);
    }

    /// `normalizeVersions`: every entry's version raised to the max version
    /// present. Returns a fresh table only when a bump is actually needed;
    /// otherwise this identity-like operation produces an observationally-
    /// equal table built from clones (the routing layer has no
    /// shared-ownership table type, so "same instance" is approximated by
    /// "same shard list, same flags" — see DESIGN.md).
    pub fn normalize_versions(&self) -> IndexShardRoutingTable {
        if self.shards.len() <= 1 {
            return self.clone_shallow();
        }
        let max_version = self.shards.iter().map(|s| s.version()).max().unwrap_or(0);
        if self.shards.iter().all(|s| s.version() == max_version) {
            return self.clone_shallow();
        }
        tracing::debug!(
            shard = %self.shard_id,
            max_version,
            "normalizing shard routing table versions"
        );
        let bumped: Vec<ShardRouting> = self
            .shards
            .iter()
            .map(|s| s.with_version_at_least(max_version))
            .collect();
        IndexShardRoutingTable::from_parts(self.shard_id.clone(), bumped, self.allocated_post_api)
    }

    /// Clone the shard list and re-derive a table with a fresh random
    /// counter seed and an empty cache (not a literal bitwise copy —
    /// field-level observational equality is preserved, not shared internal
    /// cache state).
    fn clone_shallow(&self) -> IndexShardRoutingTable {
        let shards: Vec<ShardRouting> = self.shards.iter().map(|s| (**s).clone()).collect();
        IndexShardRoutingTable::from_parts(self.shard_id.clone(), shards, self.allocated_post_api)
    }

    /// Cache-miss path of `preferAttributesActiveShardsIt`. Partitions
    /// `activeShards` by whether the owning node shares every requested
    /// attribute's value with `local_node_id`, then publishes the result
    /// into the per-table cache under `AttributesKey(attrs)`.
    pub(super) fn attribute_routings(
        &self,
        attrs: &[String],
        local_node_id: &str,
        nodes: &dyn NodeAttributeSource,
    ) -> Arc<AttributesRoutings> {
        let key = AttributesKey::new(attrs.iter().cloned());

        if let Some(hit) = self.cache.read().get(&key).cloned() {
            return hit;
        }

        let _guard = self.cache_write_lock.lock();
        // Re-check: another thread may have populated it while we waited.
        if let Some(hit) = self.cache.read().get(&key).cloned() {
            return hit;
        }

        let local_attrs = nodes.attributes(local_node_id);
        let mut from: Vec<Arc<ShardRouting>> = self.active_shards().into_iter().collect();
        let mut to: Vec<Arc<ShardRouting>> = Vec::new();

        for name in attrs {
            let Some(local_value) = local_attrs.and_then(|a| a.get(name)) else {
                continue;
            };
            let mut remaining = Vec::with_capacity(from.len());
            for shard in from.into_iter() {
                let matches = shard
                    .current_node_id()
                    .and_then(|node_id| nodes.attributes(node_id))
                    .and_then(|a| a.get(name))
                    .map(|v| v == local_value)
                    .unwrap_or(false);
                if matches {
                    to.push(shard);
                } else {
                    remaining.push(shard);
                }
            }
            from = remaining;
        }

        let routings = Arc::new(AttributesRoutings::new(to, from));

        let mut new_map = (**self.cache.read()).clone();
        new_map.insert(key, routings.clone());
        *self.cache.write() = Arc::new(new_map);

        routings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::shard_routing::ShardRoutingState;

    fn routing(node: &str, primary: bool, state: ShardRoutingState, version: u64) -> ShardRouting {
        ShardRouting::new(
            ShardId::new("idx", 0),
            primary,
            Some(node.to_string()),
            None,
            state,
            version,
            None,
        )
    }

    #[test]
    fn empty_table_has_no_primary_and_zero_size() {
        let table = IndexShardRoutingTable::from_parts(ShardId::new("idx", 0), vec![], false);
        assert_eq!(table.size(), 0);
        assert!(table.primary_shard().is_none());
        assert!(!table.allocated_post_api());
    }

    #[test]
    fn single_active_primary_forces_allocated_post_api() {
        let table = IndexShardRoutingTable::from_parts(
            ShardId::new("idx", 0),
            vec![routing("A", true, ShardRoutingState::Started, 5)],
            false,
        );
        assert!(table.allocated_post_api());
        assert!(table.primary_shard().is_some());
    }

    #[test]
    fn replicas_active_assigned_preserve_order() {
        let shards = vec![
            routing("A", true, ShardRoutingState::Started, 1),
            routing("B", false, ShardRoutingState::Started, 1),
            ShardRouting::new_unassigned(ShardId::new("idx", 0), false),
            routing("C", false, ShardRoutingState::Initializing, 1),
        ];
        let table = IndexShardRoutingTable::from_parts(ShardId::new("idx", 0), shards, false);

        assert_eq!(table.replica_shards().len(), 3);
        assert_eq!(table.active_shards().len(), 2);
        assert_eq!(table.assigned_shards().len(), 3);

        let active_nodes: Vec<_> = table
            .active_shards()
            .iter()
            .map(|s| s.current_node_id().unwrap().to_string())
            .collect();
        assert_eq!(active_nodes, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn normalize_versions_is_identity_when_already_equal() {
        let shards = vec![
            routing("A", true, ShardRoutingState::Started, 3),
            routing("B", false, ShardRoutingState::Started, 3),
        ];
        let table = IndexShardRoutingTable::from_parts(ShardId::new("idx", 0), shards, false);
        let normalized = table.normalize_versions();
        assert_eq!(normalized.shards()[0].version(), 3);
        assert_eq!(normalized.shards()[1].version(), 3);
    }

    #[test]
    fn normalize_versions_bumps_to_max() {
        let shards = vec![
            routing("A", true, ShardRoutingState::Started, 7),
            routing("B", false, ShardRoutingState::Started, 2),
        ];
        let table = IndexShardRoutingTable::from_parts(ShardId::new("idx", 0), shards, false);
        let normalized = table.normalize_versions();
        assert!(normalized.shards().iter().all(|s| s.version() >= 7));
    }

    #[test]
    fn normalize_versions_idempotent() {
        let shards = vec![
            routing("A", true, ShardRoutingState::Started, 7),
            routing("B", false, ShardRoutingState::Started, 2),
        ];
        let table = IndexShardRoutingTable::from_parts(ShardId::new("idx", 0), shards, false);
        let once = table.normalize_versions();
        let twice = once.normalize_versions();
        let versions_once: Vec<_> = once.shards().iter().map(|s| s.version()).collect();
        let versions_twice: Vec<_> = twice.shards().iter().map(|s| s.version()).collect();
        assert_eq!(versions_once, versions_twice);
    }

    struct FakeNodes(HashMap<String, HashMap<String, String>>);

    impl NodeAttributeSource for FakeNodes {
        fn attributes(&self, node_id: &str) -> Option<&HashMap<String, String>> {
            self.0.get(node_id)
        }
    }

    fn rack_nodes() -> FakeNodes {
        let mut m = HashMap::new();
        m.insert("A".into(), HashMap::from([("rack".to_string(), "r1".to_string())]));
        m.insert("B".into(), HashMap::from([("rack".to_string(), "r1".to_string())]));
        m.insert("C".into(), HashMap::from([("rack".to_string(), "r2".to_string())]));
        FakeNodes(m)
    }

    #[test]
    fn attribute_routings_partitions_by_same_attribute_value() {
        let shards = vec![
            routing("A", true, ShardRoutingState::Started, 1),
            routing("B", false, ShardRoutingState::Started, 1),
            routing("C", false, ShardRoutingState::Started, 1),
        ];
        let table = IndexShardRoutingTable::from_parts(ShardId::new("idx", 0), shards, false);
        let nodes = rack_nodes();

        let routings = table.attribute_routings(&["rack".to_string()], "A", &nodes);
        assert_eq!(routings.with_same_attribute().len(), 2);
        assert_eq!(routings.without_same_attribute().len(), 1);
        assert_eq!(routings.without_same_attribute()[0].current_node_id(), Some("C"));
    }

    #[test]
    fn attribute_routings_cache_hit_returns_same_arc() {
        let shards = vec![
            routing("A", true, ShardRoutingState::Started, 1),
            routing("B", false, ShardRoutingState::Started, 1),
        ];
        let table = IndexShardRoutingTable::from_parts(ShardId::new("idx", 0), shards, false);
        let nodes = rack_nodes();

        let first = table.attribute_routings(&["rack".to_string()], "A", &nodes);
        let second = table.attribute_routings(&["rack".to_string()], "A", &nodes);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn attribute_routings_skips_absent_local_attribute() {
        let shards = vec![routing("A", true, ShardRoutingState::Started, 1)];
        let table = IndexShardRoutingTable::from_parts(ShardId::new("idx", 0), shards, false);
        let nodes = FakeNodes(HashMap::new());

        let routings = table.attribute_routings(&["zone".to_string()], "A", &nodes);
        assert_eq!(routings.with_same_attribute().len(), 0);
        assert_eq!(routings.without_same_attribute().len(), 1);
    }
}
