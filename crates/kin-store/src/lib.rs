pub mod config;
pub mod error;
pub mod schema;
pub mod store;

pub use config::{Config, LlmConfig, ParserConfig, default_base_dir};
pub use error::{Result, StoreError};
pub use store::Store;
