//! Process-local thumbnail registry

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A thumbnail held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredThumbnail {
    /// Raw image bytes
    pub data: Bytes,
    /// Declared content type
    pub content_type: String,
}

#[derive(Debug, Clone)]
struct Entry {
    generation: u64,
    thumbnail: StoredThumbnail,
}

/// Receipt for an insert, used to revert exactly that insert
#[derive(Debug)]
pub struct Insertion {
    video_id: Uuid,
    generation: u64,
    previous: Option<Entry>,
}

impl Insertion {
    /// Video the entry was stored for
    #[must_use]
    pub const fn video_id(&self) -> Uuid {
        self.video_id
    }
}

/// In-memory map from video ID to its thumbnail
///
/// Unbounded and not durable: entries live until replaced or the process exits.
/// Every insert gets a fresh generation so a revert never clobbers a newer
/// upload for the same video.
#[derive(Debug, Default)]
pub struct ThumbnailRegistry {
    entries: RwLock<HashMap<Uuid, Entry>>,
    next_generation: AtomicU64,
}

impl ThumbnailRegistry {
    /// Creates an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `thumbnail` for `video_id`
    pub async fn insert(&self, video_id: Uuid, thumbnail: StoredThumbnail) -> Insertion {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let previous = self.entries.write().await.insert(
            video_id,
            Entry {
                generation,
                thumbnail,
            },
        );

        Insertion {
            video_id,
            generation,
            previous,
        }
    }

    /// Undoes `insertion` if its entry is still the current one
    ///
    /// The replaced entry is put back, or the video's entry is removed if there
    /// was none. Returns `false` when a later insert already superseded it.
    pub async fn revert(&self, insertion: Insertion) -> bool {
        let mut entries = self.entries.write().await;

        let current = entries
            .get(&insertion.video_id)
            .map(|entry| entry.generation);
        if current != Some(insertion.generation) {
            return false;
        }

        match insertion.previous {
            Some(previous) => {
                entries.insert(insertion.video_id, previous);
            }
            None => {
                entries.remove(&insertion.video_id);
            }
        }
        true
    }

    /// Returns the thumbnail for `video_id`
    pub async fn get(&self, video_id: Uuid) -> Option<StoredThumbnail> {
        self.entries
            .read()
            .await
            .get(&video_id)
            .map(|entry| entry.thumbnail.clone())
    }

    /// Whether the registry is empty
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn thumbnail(byte: u8) -> StoredThumbnail {
        StoredThumbnail {
            data: Bytes::from(vec![byte; 16]),
            content_type: "image/png".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_get_revert() {
        let registry = ThumbnailRegistry::new();
        let id = Uuid::new_v4();

        let first = registry.insert(id, thumbnail(1)).await;
        assert_eq!(first.video_id(), id);
        assert_eq!(registry.get(id).await, Some(thumbnail(1)));

        let second = registry.insert(id, thumbnail(2)).await;
        assert_eq!(registry.get(id).await, Some(thumbnail(2)));

        assert!(registry.revert(second).await);
        assert_eq!(registry.get(id).await, Some(thumbnail(1)));

        assert!(registry.revert(first).await);
        assert!(registry.get(id).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_revert_keeps_newer_entry() {
        let registry = ThumbnailRegistry::new();
        let id = Uuid::new_v4();

        let stale = registry.insert(id, thumbnail(1)).await;
        let _newer = registry.insert(id, thumbnail(2)).await;

        assert!(!registry.revert(stale).await);
        assert_eq!(registry.get(id).await, Some(thumbnail(2)));
    }

    #[tokio::test]
    async fn test_out_of_order_reverts_unwind_to_the_original() {
        let registry = ThumbnailRegistry::new();
        let id = Uuid::new_v4();
        let _original = registry.insert(id, thumbnail(0)).await;

        let a = registry.insert(id, thumbnail(1)).await;
        let b = registry.insert(id, thumbnail(2)).await;

        // b put a's entry back unchanged, so a can still unwind to the original
        assert!(registry.revert(b).await);
        assert!(registry.revert(a).await);
        assert_eq!(registry.get(id).await, Some(thumbnail(0)));
    }

    #[tokio::test]
    async fn test_concurrent_inserts_for_different_videos() {
        let registry = Arc::new(ThumbnailRegistry::new());

        let tasks: Vec<_> = (0..32u8)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    let id = Uuid::new_v4();
                    let insertion = registry.insert(id, thumbnail(i)).await;
                    if i % 2 == 0 {
                        assert!(registry.revert(insertion).await);
                        None
                    } else {
                        Some(id)
                    }
                })
            })
            .collect();

        let mut kept = Vec::new();
        for task in tasks {
            kept.extend(task.await.unwrap());
        }

        assert_eq!(kept.len(), 16);
        for id in kept {
            assert!(registry.get(id).await.is_some());
        }
    }
}
