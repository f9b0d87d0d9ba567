mod backend;
pub mod shard;

pub use backend::ShardedGraphBackend;
pub use shard::{GraphEdge, GraphNode, GraphShard, GraphStats};
