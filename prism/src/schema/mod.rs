pub mod loader;
pub mod types;

pub use loader::SchemaLoader;
pub use types::{
    Backends, BoostingConfig, CollectionSchema, CrossEncoderSchemaConfig, FieldType,
    GraphBackendConfig, IndexingConfig, QuotaConfig, RecencyDecayConfig, RerankerType,
    RerankingConfig, TextBackendConfig, TextField, TokenizerType, TreeSitterOptions,
    VectorBackendConfig,
};
