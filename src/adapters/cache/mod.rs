//! [`crate::domain::ports::cache::SearchCacheProvider`] implementations.

mod moka_provider;
mod null;

#[cfg(feature = "cache-redis")]
mod redis;

pub use moka_provider::MokaSearchCacheProvider;
pub use null::NullSearchCacheProvider;

#[cfg(feature = "cache-redis")]
pub use redis::{RedisCacheConfig, RedisSearchCacheProvider};
