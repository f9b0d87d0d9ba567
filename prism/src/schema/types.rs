use serde::{Deserialize, Serialize};

use crate::storage::StorageConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub collection: String,
    #[serde(default)]
    pub description: Option<String>,
    pub backends: Backends,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub embedding_generation: Option<EmbeddingGenerationConfig>,

    /// Faceted search configuration
    #[serde(default)]
    pub facets: Option<FacetConfig>,

    /// Boosting configuration
    #[serde(default)]
    pub boosting: Option<BoostingConfig>,

    /// Storage backend configuration (local or S3)
    #[serde(default)]
    pub storage: StorageConfig,

    /// System fields configuration (auto-indexed fields for ranking)
    #[serde(default)]
    pub system_fields: SystemFieldsConfig,

    /// Hybrid search configuration
    #[serde(default)]
    pub hybrid: Option<HybridConfig>,

    /// Replication configuration for distributed deployments
    #[serde(default)]
    pub replication: Option<ReplicationConfig>,

    /// ILM policy name for index lifecycle management
    #[serde(default)]
    pub ilm_policy: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Backends {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextBackendConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<VectorBackendConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<GraphBackendConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBackendConfig {
    pub fields: Vec<TextField>,

    /// BM25 k1 parameter for term saturation (default: 1.2)
    /// Higher values increase the impact of term frequency
    #[serde(default)]
    pub bm25_k1: Option<f32>,

    /// BM25 b parameter for document length normalization (default: 0.75)
    /// 0 = no length normalization, 1 = full normalization
    #[serde(default)]
    pub bm25_b: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub stored: bool,
    #[serde(default)]
    pub indexed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    String,
    I64,
    U64,
    F64,
    Bool,
    Date,
    Bytes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorBackendConfig {
    pub embedding_field: String,
    pub dimension: usize,
    #[serde(default = "default_distance")]
    pub distance: VectorDistance,
    #[serde(default = "default_hnsw_m")]
    pub hnsw_m: usize,
    #[serde(default = "default_hnsw_ef_construction")]
    pub hnsw_ef_construction: usize,
    #[serde(default = "default_hnsw_ef_search")]
    pub hnsw_ef_search: usize,
    #[serde(default = "default_vector_weight")]
    pub vector_weight: f32,
}

fn default_vector_weight() -> f32 {
    0.5
}

fn default_distance() -> VectorDistance {
    VectorDistance::Cosine
}

fn default_hnsw_m() -> usize {
    16
}

fn default_hnsw_ef_construction() -> usize {
    200
}

fn default_hnsw_ef_search() -> usize {
    100
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorDistance {
    Cosine,
    Euclidean,
    Dot,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexingConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_commit_interval_secs")]
    pub commit_interval_secs: u64,
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
}

fn default_batch_size() -> usize {
    1000
}

fn default_commit_interval_secs() -> u64 {
    5
}

fn default_worker_threads() -> usize {
    4
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuotaConfig {
    #[serde(default)]
    pub max_documents: Option<usize>,
    #[serde(default)]
    pub max_size_mb: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingGenerationConfig {
    pub enabled: bool,
    pub model: String,
    pub source_field: String,
    pub target_field: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetConfig {
    /// Fields allowed to be faceted
    #[serde(default)]
    pub allowed: Vec<String>,

    /// Default facets if not specified in query
    #[serde(default)]
    pub default: Vec<String>,

    /// Per-field facet configuration
    #[serde(default)]
    pub configs: Vec<FieldFacetConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldFacetConfig {
    pub field: String,

    #[serde(rename = "type")]
    pub facet_type: FacetType,

    /// Max values to return (for terms aggregation)
    #[serde(default = "default_facet_size")]
    pub size: usize,

    /// Interval for date_histogram (e.g., "day", "week", "month")
    #[serde(default)]
    pub interval: Option<String>,
}

fn default_facet_size() -> usize {
    10
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetType {
    Terms,
    DateHistogram,
    Range,
    Stats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostingConfig {
    /// Recency decay configuration
    #[serde(default)]
    pub recency: Option<RecencyDecayConfig>,

    /// Context-based boosting (project, session, etc.)
    #[serde(default)]
    pub context: Vec<ContextBoostConfig>,

    /// Field-specific weights
    #[serde(default)]
    pub field_weights: std::collections::HashMap<String, f32>,

    /// Custom ranking signals: named numeric fields with scoring weights.
    /// Each signal references a stored f64/i64/u64 field in the document
    /// and contributes `field_value * weight` to the final score.
    #[serde(default)]
    pub signals: Vec<RankingSignal>,
}

/// A custom ranking signal that maps a document field to a scoring weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingSignal {
    /// Name of the document field (must be a stored numeric field)
    pub name: String,
    /// Weight multiplier for this signal's contribution to the score
    #[serde(default = "default_signal_weight")]
    pub weight: f32,
}

fn default_signal_weight() -> f32 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecencyDecayConfig {
    /// Field containing timestamp
    pub field: String,

    /// Decay function: exponential, linear, gauss
    #[serde(default = "default_decay_function")]
    pub decay_function: String,

    /// Time scale (e.g., "7d", "30d", "1h")
    pub scale: String,

    /// Offset before decay starts
    #[serde(default)]
    pub offset: Option<String>,

    /// Decay rate (0.0 to 1.0)
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f32,
}

fn default_decay_function() -> String {
    "exponential".to_string()
}

fn default_decay_rate() -> f32 {
    0.5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextBoostConfig {
    /// Field to match
    pub field: String,

    /// Match current context value
    #[serde(default)]
    pub match_current: bool,

    /// Boost multiplier
    #[serde(default = "default_boost_multiplier")]
    pub boost: f32,
}

fn default_boost_multiplier() -> f32 {
    1.5
}

/// Configuration for automatically indexed system fields.
/// These fields enable ranking features without requiring migration later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemFieldsConfig {
    /// Automatically add _indexed_at timestamp to all documents (default: true)
    /// Required for recency/freshness scoring
    #[serde(default = "default_indexed_at_enabled")]
    pub indexed_at: bool,

    /// Enable per-document _boost field (default: false)
    /// Allows setting custom boost multipliers per document for popularity signals
    #[serde(default)]
    pub document_boost: bool,
}

impl Default for SystemFieldsConfig {
    fn default() -> Self {
        Self {
            indexed_at: true,
            document_boost: false,
        }
    }
}

fn default_indexed_at_enabled() -> bool {
    true
}

/// Configuration for hybrid search defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridConfig {
    /// Default merge strategy: "rrf" or "weighted" (default: "rrf")
    #[serde(default = "default_merge_strategy")]
    pub default_strategy: String,

    /// RRF k parameter - higher values reduce rank influence (default: 60)
    #[serde(default = "default_rrf_k")]
    pub rrf_k: usize,

    /// Default text weight for weighted merge (default: 0.5)
    #[serde(default = "default_text_weight")]
    pub text_weight: f32,

    /// Default vector weight for weighted merge (default: 0.5)
    #[serde(default = "default_vector_weight_hybrid")]
    pub vector_weight: f32,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            default_strategy: "rrf".to_string(),
            rrf_k: 60,
            text_weight: 0.5,
            vector_weight: 0.5,
        }
    }
}

fn default_merge_strategy() -> String {
    "rrf".to_string()
}

fn default_rrf_k() -> usize {
    60
}

fn default_text_weight() -> f32 {
    0.5
}

fn default_vector_weight_hybrid() -> f32 {
    0.5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphBackendConfig {
    pub path: String,
    pub edges: Vec<EdgeTypeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeTypeConfig {
    pub edge_type: String,
    pub from_field: String,
    pub to_field: String,
}

/// Replication configuration for distributed deployments
///
/// Controls how many replicas of each shard are maintained and
/// how they are placed across the cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Number of copies of each shard (including primary)
    /// Default: 1 (no replication)
    #[serde(default = "default_replication_factor")]
    pub factor: usize,

    /// Minimum number of replicas that must acknowledge a write
    /// Default: 1 (synchronous write to at least one replica)
    #[serde(default = "default_min_replicas")]
    pub min_replicas_for_write: usize,

    /// Placement strategy for replicas
    /// - "zone-aware": Spread replicas across zones (default)
    /// - "rack-aware": Spread replicas across racks within a zone
    /// - "none": No placement constraints
    #[serde(default = "default_placement_strategy")]
    pub placement_strategy: String,
}

fn default_replication_factor() -> usize {
    1
}

fn default_min_replicas() -> usize {
    1
}

fn default_placement_strategy() -> String {
    "zone-aware".to_string()
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            factor: default_replication_factor(),
            min_replicas_for_write: default_min_replicas(),
            placement_strategy: default_placement_strategy(),
        }
    }
}

impl ReplicationConfig {
    /// Validate replication configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.factor == 0 {
            return Err("Replication factor must be at least 1".to_string());
        }
        if self.min_replicas_for_write > self.factor {
            return Err(format!(
                "min_replicas_for_write ({}) cannot exceed replication factor ({})",
                self.min_replicas_for_write, self.factor
            ));
        }
        let valid_strategies = ["zone-aware", "rack-aware", "none"];
        if !valid_strategies.contains(&self.placement_strategy.as_str()) {
            return Err(format!(
                "Invalid placement strategy '{}'. Valid values: {:?}",
                self.placement_strategy, valid_strategies
            ));
        }
        Ok(())
    }

    /// Check if replication is enabled (factor > 1)
    pub fn is_replicated(&self) -> bool {
        self.factor > 1
    }
}
