use crate::{
    error::{Result, StudioError},
    models::{ImageRecord, NewImage, PageRange, Paged, SaveOutcome, SavedImage},
    storage::{
        parse_base_url, public_object_url,
        search::WebSearch,
        traits::{BlobStore, ImageQuery, RecordStore, StoredBlob},
        validate_object_path,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, StoredBlob>>,
    public_base: url::Url,
    bucket: String,
}

impl MemoryBlobStore {
    pub fn new(public_base_url: &str, bucket: &str) -> Result<Self> {
        Ok(Self {
            objects: RwLock::new(HashMap::new()),
            public_base: parse_base_url(public_base_url)?,
            bucket: bucket.to_string(),
        })
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.objects.read().await.contains_key(path)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        validate_object_path(path)?;

        let mut objects = self.objects.write().await;
        if objects.contains_key(path) {
            return Err(StudioError::persistence(format!(
                "The resource already exists: {}",
                path
            )));
        }
        objects.insert(
            path.to_string(),
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
            },
        );

        Ok(path.to_string())
    }

    fn public_url(&self, path: &str) -> String {
        public_object_url(&self.public_base, &self.bucket, path)
    }

    async fn fetch(&self, path: &str) -> Result<Option<StoredBlob>> {
        Ok(self.objects.read().await.get(path).cloned())
    }

    async fn remove(&self, paths: &[String]) -> Result<()> {
        let mut objects = self.objects.write().await;
        for path in paths {
            objects.remove(path);
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

#[derive(Debug, Clone)]
struct SaveRow {
    user_id: String,
    image_id: String,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    images: Vec<ImageRecord>,
    saves: Vec<SaveRow>,
}

/// Keeps rows in insertion order, so "newest first" is a reverse scan.
#[derive(Default)]
pub struct MemoryRecordStore {
    tables: RwLock<Tables>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_image(&self, image: NewImage) -> Result<ImageRecord> {
        let record = image.into_record(Uuid::new_v4().to_string(), Utc::now());
        self.tables.write().await.images.push(record.clone());
        Ok(record)
    }

    async fn get_image(&self, id: &str) -> Result<Option<ImageRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.images.iter().find(|image| image.id == id).cloned())
    }

    async fn delete_image(&self, id: &str) -> Result<()> {
        self.tables.write().await.images.retain(|image| image.id != id);
        Ok(())
    }

    async fn list_images(&self, query: ImageQuery, range: PageRange) -> Result<Paged<ImageRecord>> {
        let search = query.search.as_deref().map(WebSearch::parse);
        let tables = self.tables.read().await;

        let matching: Vec<ImageRecord> = tables
            .images
            .iter()
            .rev()
            .filter(|image| {
                query
                    .author_id
                    .as_deref()
                    .map_or(true, |author| image.author_id == author)
            })
            .filter(|image| search.as_ref().map_or(true, |s| s.matches(&image.prompt)))
            .cloned()
            .collect();

        Ok(Paged::from_sorted(matching, range))
    }

    async fn insert_save(&self, user_id: &str, image_id: &str) -> Result<SaveOutcome> {
        let mut tables = self.tables.write().await;
        if !tables.images.iter().any(|image| image.id == image_id) {
            return Err(StudioError::NotFound);
        }
        if tables
            .saves
            .iter()
            .any(|save| save.user_id == user_id && save.image_id == image_id)
        {
            return Ok(SaveOutcome::AlreadySaved);
        }

        tables.saves.push(SaveRow {
            user_id: user_id.to_string(),
            image_id: image_id.to_string(),
            created_at: Utc::now(),
        });
        Ok(SaveOutcome::Created)
    }

    async fn delete_save(&self, user_id: &str, image_id: &str) -> Result<()> {
        self.tables
            .write()
            .await
            .saves
            .retain(|save| !(save.user_id == user_id && save.image_id == image_id));
        Ok(())
    }

    async fn delete_saves_for_image(&self, image_id: &str) -> Result<()> {
        self.tables
            .write()
            .await
            .saves
            .retain(|save| save.image_id != image_id);
        Ok(())
    }

    async fn saved_image_ids(&self, user_id: &str, image_ids: &[String]) -> Result<Vec<String>> {
        let tables = self.tables.read().await;
        Ok(tables
            .saves
            .iter()
            .filter(|save| save.user_id == user_id && image_ids.contains(&save.image_id))
            .map(|save| save.image_id.clone())
            .collect())
    }

    async fn list_saves(&self, user_id: &str, range: PageRange) -> Result<Paged<SavedImage>> {
        let tables = self.tables.read().await;

        let saved: Vec<SavedImage> = tables
            .saves
            .iter()
            .rev()
            .filter(|save| save.user_id == user_id)
            .filter_map(|save| {
                tables
                    .images
                    .iter()
                    .find(|image| image.id == save.image_id)
                    .map(|image| SavedImage::new(image.clone(), save.created_at))
            })
            .collect();

        Ok(Paged::from_sorted(saved, range))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
