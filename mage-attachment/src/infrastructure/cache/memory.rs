//! 媒体字节内存缓存
//!
//! 按字节预算约束的层级缓存，键为远端标识加层级后缀。
//! 预算写满后按写入时间从最旧条目开始腾退。

use std::collections::HashMap;
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::domain::repository::MediaByteCache;

#[derive(Clone)]
struct CacheEntry {
    bytes: Bytes,
    stored_at: Instant,
}

pub struct InMemoryMediaCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    budget_bytes: usize,
}

impl InMemoryMediaCache {
    pub fn new(budget_bytes: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            budget_bytes,
        }
    }

    /// 获取缓存统计信息
    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        CacheStats {
            total_entries: entries.len(),
            total_bytes: entries.values().map(|entry| entry.bytes.len()).sum(),
            budget_bytes: self.budget_bytes,
        }
    }

    /// 腾退最旧条目，直到能装下新增字节
    fn evict_for(&self, entries: &mut HashMap<String, CacheEntry>, incoming: usize) {
        let mut used: usize = entries.values().map(|entry| entry.bytes.len()).sum();
        if used + incoming <= self.budget_bytes {
            return;
        }

        let mut ordered: Vec<(String, Instant, usize)> = entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.stored_at, entry.bytes.len()))
            .collect();
        ordered.sort_by_key(|(_, stored_at, _)| *stored_at);

        let mut removed = 0usize;
        for (key, _, len) in ordered {
            if used + incoming <= self.budget_bytes {
                break;
            }
            entries.remove(&key);
            used -= len;
            removed += 1;
        }

        if removed > 0 {
            warn!(
                removed_count = removed,
                remaining_size = entries.len(),
                "evicted oldest media cache entries over byte budget"
            );
        }
    }
}

#[async_trait::async_trait]
impl MediaByteCache for InMemoryMediaCache {
    async fn exists(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    async fn fetch(&self, key: &str) -> Option<Bytes> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        Some(entry.bytes.clone())
    }

    async fn store(&self, key: &str, bytes: Bytes) {
        // 超过整个预算的单条目不进缓存
        if bytes.len() > self.budget_bytes {
            warn!(
                key = %key,
                bytes = bytes.len(),
                budget = self.budget_bytes,
                "media larger than cache budget, not cached"
            );
            return;
        }

        let mut entries = self.entries.write().await;
        entries.remove(key);
        self.evict_for(&mut entries, bytes.len());
        entries.insert(
            key.to_string(),
            CacheEntry {
                bytes,
                stored_at: Instant::now(),
            },
        );
        debug!(key = %key, cache_size = entries.len(), "media cached");
    }

    async fn invalidate(&self, key: &str) {
        let mut entries = self.entries.write().await;
        if entries.remove(key).is_some() {
            debug!(key = %key, "media cache entry invalidated");
        }
    }
}

/// 缓存统计信息
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_bytes: usize,
    pub budget_bytes: usize,
}
