//! Configuration sections of `resources.toml`.

mod cache;
mod serve;
mod set;

pub use cache::CacheConfig;
pub use serve::ServeConfig;
pub use set::SetConfig;
