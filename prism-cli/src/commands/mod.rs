pub mod attach;
pub mod benchmark;
pub mod detach;
pub mod export;
pub mod import;
pub mod inspect;
pub mod optimize;
pub mod restore;

pub use attach::run_attach;
pub use benchmark::run_benchmark;
pub use detach::run_detach;
pub use export::run_export;
pub use import::run_import;
pub use inspect::run_inspect;
pub use optimize::run_optimize;
pub use restore::run_restore;
