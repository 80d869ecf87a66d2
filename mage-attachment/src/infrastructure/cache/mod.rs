mod memory;

pub use memory::{CacheStats, InMemoryMediaCache};
