use std::collections::BTreeMap;

use async_std::sync::Mutex;
use time::OffsetDateTime;

use super::photos::{PhotoId, PhotoStore};
use super::Error;
use crate::models::photos::{NewPhoto, Photo};

/// Process-local photo store, used when no database is configured.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    next_id: PhotoId,
    photos: BTreeMap<PhotoId, Photo>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            inner: Mutex::new(Inner {
                next_id: 1,
                photos: BTreeMap::new(),
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PhotoStore for MemoryStore {
    #[tracing::instrument(skip(self))]
    async fn get_all_photos(&self) -> Result<Vec<Photo>, Error> {
        let inner = self.inner.lock().await;
        Ok(inner.photos.values().cloned().collect())
    }

    #[tracing::instrument(skip(self))]
    async fn get_photo_by_id(&self, photo_id: PhotoId) -> Result<Option<Photo>, Error> {
        let inner = self.inner.lock().await;
        Ok(inner.photos.get(&photo_id).cloned())
    }

    #[tracing::instrument(skip(self))]
    async fn insert_photo(&self, photo: &NewPhoto) -> Result<PhotoId, Error> {
        let mut inner = self.inner.lock().await;

        let id = inner.next_id;
        inner.next_id = id.checked_add(1).ok_or(Error::IdsExhausted)?;

        let now = OffsetDateTime::now_utc();
        inner.photos.insert(
            id,
            Photo {
                id,
                source: photo.source().to_string(),
                caption: photo.caption().to_string(),
                created_at: now,
                updated_at: now,
            },
        );

        Ok(id)
    }

    #[tracing::instrument(skip(self))]
    async fn update_photo(&self, photo_id: PhotoId, photo: &NewPhoto) -> Result<bool, Error> {
        let mut inner = self.inner.lock().await;

        match inner.photos.get_mut(&photo_id) {
            Some(existing) => {
                existing.source = photo.source().to_string();
                existing.caption = photo.caption().to_string();
                existing.updated_at = OffsetDateTime::now_utc();
                Ok(true)
            },
            None => Ok(false),
        }
    }
}
