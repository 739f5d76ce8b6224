pub mod config;
pub mod error;
pub mod security;
pub mod storage;
pub mod traits;
pub mod tree;
pub mod types;
pub mod validation;

pub use config::{AuthConfig, LogFormat, LoggingConfig, ServerConfig, Settings};
pub use error::*;
pub use security::*;
pub use storage::*;
pub use traits::*;
pub use tree::{attach_operations, build_operation_tree, replay, TreeStats};
pub use types::*;
pub use validation::*;
