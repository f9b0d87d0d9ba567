//! `ShardIterator`: a single-pass cursor over a materialized replica
//! ordering, and the selection policies that produce one.

use super::shard_id::ShardId;
use super::shard_routing::ShardRouting;
use super::table::{IndexShardRoutingTable, NodeAttributeSource};
use std::sync::Arc;

/// A materialized, ordered sequence of replicas plus a read cursor.
///
/// Iterators own their ordering (`Arc<ShardRouting>` clones), so they remain
/// valid even after the `IndexShardRoutingTable` that produced them is
/// dropped. Single-pass: there is no
/// restart operation.
#[derive(Debug, Clone)]
pub struct ShardIterator {
    shard_id: ShardId,
    ordered: Vec<Arc<ShardRouting>>,
    position: usize,
}

impl ShardIterator {
    fn new(shard_id: ShardId, ordered: Vec<Arc<ShardRouting>>) -> Self {
        Self {
            shard_id,
            ordered,
            position: 0,
        }
    }

    /// Advance the cursor, returning the next replica or `None` once
    /// exhausted. Never errors: an iterator over an empty sequence simply
    /// yields nothing.
    pub fn next(&mut self) -> Option<Arc<ShardRouting>> {
        let item = self.ordered.get(self.position).cloned();
        if item.is_some() {
            self.position += 1;
        }
        item
    }

    /// Number of elements not yet consumed.
    pub fn remaining(&self) -> usize {
        self.ordered.len() - self.position
    }

    pub fn shard_id(&self) -> &ShardId {
        &self.shard_id
    }

    /// Total size of the materialized ordering, consumed or not. Useful in
    /// tests asserting element-multiset preservation without draining
    /// the cursor.
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

/// Which replica sequence a policy draws from and how it orders it.
/// A tagged enum plus one dispatch function (`build_iterator`) rather than
/// per-policy trait objects, so the hot dispatch path stays flat.
#[derive(Debug, Clone)]
pub enum ShardIteratorPolicy {
    Shards,
    ShardsRandom,
    ShardsAt(i64),
    ActiveShards,
    ActiveShardsRandom,
    ActiveShardsAt(i64),
    AssignedShards,
    AssignedShardsRandom,
    AssignedShardsAt(i64),
    PrimaryShard,
    PrimaryFirstActiveShards,
    PreferNodeShards(String),
    PreferNodeActiveShards(String),
    PreferNodeAssignedShards(String),
    /// Filters over *all* shards, not `activeShards`, despite the name —
    /// preserved verbatim from the upstream behavior.
    OnlyNodeActiveShards(String),
    PreferAttributesActiveShards { attrs: Vec<String>, local_node_id: String },
    PreferAttributesActiveShardsAt { attrs: Vec<String>, local_node_id: String, index: i64 },
}

fn rotate(seq: &[Arc<ShardRouting>], start: i64) -> Vec<Arc<ShardRouting>> {
    let n = seq.len();
    if n == 0 {
        return Vec::new();
    }
    let k = (start.unsigned_abs() as usize) % n;
    (0..n).map(|i| seq[(k + i) % n].clone()).collect()
}

fn swap_primary_to_front(seq: &mut [Arc<ShardRouting>]) {
    if let Some(pos) = seq.iter().position(|s| s.primary()) {
        seq.swap(0, pos);
    }
}

fn swap_node_to_front(seq: &mut [Arc<ShardRouting>], node_id: &str) {
    if let Some(pos) = seq.iter().position(|s| s.current_node_id() == Some(node_id)) {
        seq.swap(0, pos);
    }
}

/// Build a `ShardIterator` for `policy` over `table`. `nodes` is only
/// consulted by the `PreferAttributes*` variants; every other policy
/// ignores it — the node attribute map is supplied by the caller, not
/// owned by the table.
pub fn build_iterator(
    table: &IndexShardRoutingTable,
    policy: &ShardIteratorPolicy,
    nodes: &dyn NodeAttributeSource,
) -> ShardIterator {
    let shard_id = table.shard_id().clone();
    let ordered = match policy {
        ShardIteratorPolicy::Shards => table.shards().to_vec(),
        ShardIteratorPolicy::ShardsRandom => rotate(table.shards(), table.advance_counter()),
        ShardIteratorPolicy::ShardsAt(i) => rotate(table.shards(), *i),

        ShardIteratorPolicy::ActiveShards => table.active_shards(),
        ShardIteratorPolicy::ActiveShardsRandom => rotate(&table.active_shards(), table.advance_counter()),
        ShardIteratorPolicy::ActiveShardsAt(i) => rotate(&table.active_shards(), *i),

        ShardIteratorPolicy::AssignedShards => table.assigned_shards(),
        ShardIteratorPolicy::AssignedShardsRandom => rotate(&table.assigned_shards(), table.advance_counter()),
        ShardIteratorPolicy::AssignedShardsAt(i) => rotate(&table.assigned_shards(), *i),

        ShardIteratorPolicy::PrimaryShard => table.primary_shard().cloned().into_iter().collect(),

        ShardIteratorPolicy::PrimaryFirstActiveShards => {
            let mut seq = rotate(&table.active_shards(), table.advance_counter());
            swap_primary_to_front(&mut seq);
            seq
        }

        ShardIteratorPolicy::PreferNodeShards(node_id) => {
            let mut seq = rotate(table.shards(), table.advance_counter());
            swap_node_to_front(&mut seq, node_id);
            seq
        }
        ShardIteratorPolicy::PreferNodeActiveShards(node_id) => {
            let mut seq = rotate(&table.active_shards(), table.advance_counter());
            swap_node_to_front(&mut seq, node_id);
            seq
        }
        ShardIteratorPolicy::PreferNodeAssignedShards(node_id) => {
            let mut seq = rotate(&table.assigned_shards(), table.advance_counter());
            swap_node_to_front(&mut seq, node_id);
            seq
        }

        ShardIteratorPolicy::OnlyNodeActiveShards(node_id) => table
            .shards()
            .iter()
            .filter(|s| s.current_node_id() == Some(node_id.as_str()))
            .cloned()
            .collect(),

        ShardIteratorPolicy::PreferAttributesActiveShards { attrs, local_node_id } => {
            let routings = table.attribute_routings(attrs, local_node_id, nodes);
            let index = table.advance_counter();
            let mut ordered = rotate(routings.with_same_attribute(), index);
            ordered.extend(rotate(routings.without_same_attribute(), index));
            ordered
        }
        ShardIteratorPolicy::PreferAttributesActiveShardsAt { attrs, local_node_id, index } => {
            let routings = table.attribute_routings(attrs, local_node_id, nodes);
            let mut ordered = rotate(routings.with_same_attribute(), *index);
            ordered.extend(rotate(routings.without_same_attribute(), *index));
            ordered
        }
    };
    ShardIterator::new(shard_id, ordered)
}

/// Node attribute source with no nodes at all, for policies that are known
/// not to consult it. Avoids forcing every call site of the non-attribute
/// convenience methods below to supply one.
struct NoAttributes;
impl NodeAttributeSource for NoAttributes {
    fn attributes(&self, _node_id: &str) -> Option<&std::collections::HashMap<String, String>> {
        None
    }
}

impl IndexShardRoutingTable {
    pub fn shards_it(&self) -> ShardIterator {
        build_iterator(self, &ShardIteratorPolicy::Shards, &NoAttributes)
    }

    pub fn shards_random_it(&self) -> ShardIterator {
        build_iterator(self, &ShardIteratorPolicy::ShardsRandom, &NoAttributes)
    }

    pub fn shards_it_at(&self, index: i64) -> ShardIterator {
        build_iterator(self, &ShardIteratorPolicy::ShardsAt(index), &NoAttributes)
    }

    pub fn active_shards_it(&self) -> ShardIterator {
        build_iterator(self, &ShardIteratorPolicy::ActiveShards, &NoAttributes)
    }

    pub fn active_shards_random_it(&self) -> ShardIterator {
        build_iterator(self, &ShardIteratorPolicy::ActiveShardsRandom, &NoAttributes)
    }

    pub fn active_shards_it_at(&self, index: i64) -> ShardIterator {
        build_iterator(self, &ShardIteratorPolicy::ActiveShardsAt(index), &NoAttributes)
    }

    pub fn assigned_shards_it(&self) -> ShardIterator {
        build_iterator(self, &ShardIteratorPolicy::AssignedShards, &NoAttributes)
    }

    pub fn assigned_shards_random_it(&self) -> ShardIterator {
        build_iterator(self, &ShardIteratorPolicy::AssignedShardsRandom, &NoAttributes)
    }

    pub fn assigned_shards_it_at(&self, index: i64) -> ShardIterator {
        build_iterator(self, &ShardIteratorPolicy::AssignedShardsAt(index), &NoAttributes)
    }

    pub fn primary_shard_it(&self) -> ShardIterator {
        build_iterator(self, &ShardIteratorPolicy::PrimaryShard, &NoAttributes)
    }

    pub fn primary_first_active_shards_it(&self) -> ShardIterator {
        build_iterator(self, &ShardIteratorPolicy::PrimaryFirstActiveShards, &NoAttributes)
    }

    pub fn prefer_node_shards_it(&self, node_id: &str) -> ShardIterator {
        build_iterator(self, &ShardIteratorPolicy::PreferNodeShards(node_id.to_string()), &NoAttributes)
    }

    pub fn prefer_node_active_shards_it(&self, node_id: &str) -> ShardIterator {
        build_iterator(
            self,
            &ShardIteratorPolicy::PreferNodeActiveShards(node_id.to_string()),
            &NoAttributes,
        )
    }

    pub fn prefer_node_assigned_shards_it(&self, node_id: &str) -> ShardIterator {
        build_iterator(
            self,
            &ShardIteratorPolicy::PreferNodeAssignedShards(node_id.to_string()),
            &NoAttributes,
        )
    }

    /// Matches upstream's quirk of filtering all shards, not just active
    /// ones, despite the name.
    pub fn only_node_active_shards_it(&self, node_id: &str) -> ShardIterator {
        build_iterator(self, &ShardIteratorPolicy::OnlyNodeActiveShards(node_id.to_string()), &NoAttributes)
    }

    pub fn prefer_attributes_active_shards_it(
        &self,
        attrs: &[String],
        local_node_id: &str,
        nodes: &dyn NodeAttributeSource,
    ) -> ShardIterator {
        build_iterator(
            self,
            &ShardIteratorPolicy::PreferAttributesActiveShards {
                attrs: attrs.to_vec(),
                local_node_id: local_node_id.to_string(),
            },
            nodes,
        )
    }

    pub fn prefer_attributes_active_shards_it_at(
        &self,
        attrs: &[String],
        local_node_id: &str,
        index: i64,
        nodes: &dyn NodeAttributeSource,
    ) -> ShardIterator {
        build_iterator(
            self,
            &ShardIteratorPolicy::PreferAttributesActiveShardsAt {
                attrs: attrs.to_vec(),
                local_node_id: local_node_id.to_string(),
                index,
            },
            nodes,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::shard_id::ShardId;
    use crate::routing::shard_routing::ShardRoutingState;
    use std::collections::HashMap;

    fn routing(node: &str, primary: bool, state: ShardRoutingState) -> ShardRouting {
        ShardRouting::new(ShardId::new("idx", 0), primary, Some(node.to_string()), None, state, 1, None)
    }

    fn three_shard_table() -> IndexShardRoutingTable {
        IndexShardRoutingTable::from_parts(
            ShardId::new("idx", 0),
            vec![
                routing("A", true, ShardRoutingState::Started),
                routing("B", false, ShardRoutingState::Started),
                routing("C", false, ShardRoutingState::Started),
            ],
            false,
        )
    }

    fn drain(it: &mut ShardIterator) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(s) = it.next() {
            out.push(s.current_node_id().unwrap().to_string());
        }
        out
    }

    #[test]
    fn shards_it_is_identity() {
        let table = three_shard_table();
        let mut it = table.shards_it();
        assert_eq!(drain(&mut it), vec!["A", "B", "C"]);
    }

    #[test]
    fn shards_it_at_rotates() {
        let table = three_shard_table();
        let mut it = table.shards_it_at(1);
        assert_eq!(drain(&mut it), vec!["B", "C", "A"]);
    }

    #[test]
    fn round_robin_successive_rotations() {
        let table = IndexShardRoutingTable::from_parts(
            ShardId::new("idx", 0),
            vec![
                routing("A", true, ShardRoutingState::Started),
                routing("B", false, ShardRoutingState::Started),
                routing("C", false, ShardRoutingState::Started),
            ],
            false,
        );
        // Force the seeded-at-build counter to a known value for determinism.
        table.set_counter_for_test(0);

        assert_eq!(drain(&mut table.shards_random_it()), vec!["A", "B", "C"]);
        assert_eq!(drain(&mut table.shards_random_it()), vec!["B", "C", "A"]);
        assert_eq!(drain(&mut table.shards_random_it()), vec!["C", "A", "B"]);
    }

    #[test]
    fn empty_table_yields_no_elements_without_error() {
        let table = IndexShardRoutingTable::from_parts(ShardId::new("idx", 0), vec![], false);
        let mut it = table.shards_it();
        assert_eq!(it.next(), None);
        assert_eq!(it.remaining(), 0);
    }

    #[test]
    fn primary_first_active_shards_it_yields_primary_first_when_active() {
        let table = three_shard_table();
        let mut it = table.primary_first_active_shards_it();
        let first = it.next().unwrap();
        assert!(first.primary());
    }

    #[test]
    fn prefer_node_shards_it_puts_matching_node_first() {
        let table = three_shard_table();
        let mut it = table.prefer_node_shards_it("C");
        let first = it.next().unwrap();
        assert_eq!(first.current_node_id(), Some("C"));
    }

    #[test]
    fn prefer_node_shards_it_no_match_is_just_the_rotation() {
        let table = IndexShardRoutingTable::from_parts(
            ShardId::new("idx", 0),
            vec![routing("A", true, ShardRoutingState::Started)],
            false,
        );
        let mut it = table.prefer_node_shards_it("B");
        assert_eq!(drain(&mut it), vec!["A"]);
    }

    #[test]
    fn only_node_active_shards_it_includes_inactive() {
        // Spec.md §9: this policy filters `shards`, not `activeShards`,
        // despite its name — an unassigned-but-matching node would never
        // happen (unassigned has no node id), but an INITIALIZING shard on
        // the node must still show up even though it is not active.
        let table = IndexShardRoutingTable::from_parts(
            ShardId::new("idx", 0),
            vec![
                routing("A", true, ShardRoutingState::Started),
                routing("B", false, ShardRoutingState::Initializing),
            ],
            false,
        );
        let mut it = table.only_node_active_shards_it("B");
        let got = drain(&mut it);
        assert_eq!(got, vec!["B"]);
    }

    #[test]
    fn prefer_attributes_partitions_before_interleaving() {
        let mut nodes = HashMap::new();
        nodes.insert("A".to_string(), HashMap::from([("rack".to_string(), "r1".to_string())]));
        nodes.insert("B".to_string(), HashMap::from([("rack".to_string(), "r1".to_string())]));
        nodes.insert("C".to_string(), HashMap::from([("rack".to_string(), "r2".to_string())]));

        let table = three_shard_table();
        let attrs = vec!["rack".to_string()];

        let mut it0 = table.prefer_attributes_active_shards_it_at(&attrs, "A", 0, &nodes);
        assert_eq!(drain(&mut it0), vec!["A", "B", "C"]);

        let mut it1 = table.prefer_attributes_active_shards_it_at(&attrs, "A", 1, &nodes);
        assert_eq!(drain(&mut it1), vec!["B", "A", "C"]);

        let mut it2 = table.prefer_attributes_active_shards_it_at(&attrs, "A", 2, &nodes);
        assert_eq!(drain(&mut it2), vec!["A", "B", "C"]);
    }

    #[test]
    fn negative_counter_wraps_via_absolute_value() {
        let table = three_shard_table();
        // Drive the counter to a value whose fetch returns -1.
        table.set_counter_for_test(-1);
        let mut it = table.shards_random_it();
        // abs(-1) % 3 == 1 -> rotation starting at index 1.
        assert_eq!(drain(&mut it), vec!["B", "C", "A"]);
    }
}
