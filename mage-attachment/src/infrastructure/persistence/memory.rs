use std::collections::HashMap;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::model::Attachment;
use crate::domain::repository::AttachmentStore;

struct StoredRecord {
    attachment: Attachment,
    updated_at: DateTime<Utc>,
}

/// 内存附件记录存储
///
/// 宿主应用通常以自身持久层实现替换，这里用于测试与单机运行。
#[derive(Default)]
pub struct InMemoryAttachmentStore {
    records: RwLock<HashMap<String, StoredRecord>>,
}

impl InMemoryAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, attachment: Attachment) {
        let mut records = self.records.write().await;
        records.insert(
            attachment.id.clone(),
            StoredRecord {
                attachment,
                updated_at: Utc::now(),
            },
        );
    }

    pub async fn updated_at(&self, id: &str) -> Option<DateTime<Utc>> {
        self.records.read().await.get(id).map(|r| r.updated_at)
    }
}

#[async_trait::async_trait]
impl AttachmentStore for InMemoryAttachmentStore {
    async fn load_attachment(&self, id: &str) -> Result<Option<Attachment>> {
        Ok(self
            .records
            .read()
            .await
            .get(id)
            .map(|record| record.attachment.clone()))
    }

    async fn update_local_path(&self, id: &str, path: &str) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| anyhow!("attachment not found: {id}"))?;
        record.attachment.stored_local_path = Some(path.to_string());
        record.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_load() {
        let store = InMemoryAttachmentStore::new();
        let attachment = Attachment::new_local("photo.png", "image/png");
        store.insert(attachment.clone()).await;

        let loaded = store
            .load_attachment(&attachment.id)
            .await
            .expect("load")
            .expect("present");
        assert_eq!(loaded.file_name.as_deref(), Some("photo.png"));
        assert!(store.load_attachment("missing").await.expect("load").is_none());
    }

    #[tokio::test]
    async fn test_update_local_path_rewrites_record() {
        let store = InMemoryAttachmentStore::new();
        let attachment = Attachment::new_local("photo.png", "image/png");
        store.insert(attachment.clone()).await;
        let before = store.updated_at(&attachment.id).await.expect("stamp");

        store
            .update_local_path(&attachment.id, "/documents/attachments/photo.png")
            .await
            .expect("update");

        let loaded = store
            .load_attachment(&attachment.id)
            .await
            .expect("load")
            .expect("present");
        assert_eq!(
            loaded.stored_local_path.as_deref(),
            Some("/documents/attachments/photo.png")
        );
        assert!(store.updated_at(&attachment.id).await.expect("stamp") >= before);
    }

    #[tokio::test]
    async fn test_update_missing_record_fails() {
        let store = InMemoryAttachmentStore::new();
        assert!(store.update_local_path("missing", "/path").await.is_err());
    }
}
