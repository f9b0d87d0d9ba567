pub mod mapping;
pub mod types;

pub use mapping::convert_es_mapping;
pub use types::{SourceField, SourceFieldType, SourceSchema};
