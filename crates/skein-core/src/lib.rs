pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{AppConfig, EngineConfig};
pub use error::{Result, SkeinError};
pub use traits::{Backend, Condition, JoinStrategy, MergeStrategy};
pub use types::*;
