pub mod discover;
pub mod export;
pub mod import;

pub use discover::SchemaDiscoverer;
pub use export::DataExporter;
pub use import::DataImporter;
