use crate::{
    error::Result,
    models::{ImageRecord, NewImage, PageRange, Paged, SaveOutcome, SavedImage},
};
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Object storage addressed by path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` at `path` and returns the stored path. Must fail, not
    /// overwrite, when an object already exists there.
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;

    fn public_url(&self, path: &str) -> String;

    async fn fetch(&self, path: &str) -> Result<Option<StoredBlob>>;

    /// Missing paths are ignored.
    async fn remove(&self, paths: &[String]) -> Result<()>;

    async fn health_check(&self) -> Result<bool>;
}

#[derive(Debug, Clone, Default)]
pub struct ImageQuery {
    pub author_id: Option<String>,
    pub search: Option<String>,
}

/// Structured metadata rows for images and saves.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_image(&self, image: NewImage) -> Result<ImageRecord>;

    async fn get_image(&self, id: &str) -> Result<Option<ImageRecord>>;

    async fn delete_image(&self, id: &str) -> Result<()>;

    /// Newest first.
    async fn list_images(&self, query: ImageQuery, range: PageRange) -> Result<Paged<ImageRecord>>;

    /// `NotFound` when the image does not exist.
    async fn insert_save(&self, user_id: &str, image_id: &str) -> Result<SaveOutcome>;

    async fn delete_save(&self, user_id: &str, image_id: &str) -> Result<()>;

    async fn delete_saves_for_image(&self, image_id: &str) -> Result<()>;

    async fn saved_image_ids(&self, user_id: &str, image_ids: &[String]) -> Result<Vec<String>>;

    /// Most recently saved first.
    async fn list_saves(&self, user_id: &str, range: PageRange) -> Result<Paged<SavedImage>>;

    async fn health_check(&self) -> Result<bool>;
}
