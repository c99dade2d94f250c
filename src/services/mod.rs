pub mod cache;

pub use cache::{CacheConfig, CacheError, CacheService, RetrievalOutcome, RetrievalRequest};
