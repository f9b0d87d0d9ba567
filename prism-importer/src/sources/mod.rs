pub mod elasticsearch;
pub mod traits;

pub use elasticsearch::{AuthMethod, ElasticsearchSource};
pub use traits::ImportSource;
