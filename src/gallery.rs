use crate::{
    error::{Result, StudioError},
    models::{
        FeedItem, Identity, ImageRecord, PageRange, PageResponse, SaveOutcome, SaveState,
        SavedImage,
    },
    storage::{extract_storage_path, BlobStore, ImageQuery, RecordStore},
};
use std::sync::Arc;

pub const FEED_DEFAULT_LIMIT: usize = 12;
pub const FEED_MAX_LIMIT: usize = 30;
pub const COLLECTION_DEFAULT_LIMIT: usize = 12;
pub const COLLECTION_MAX_LIMIT: usize = 30;
pub const HISTORY_DEFAULT_LIMIT: usize = 10;
pub const HISTORY_MAX_LIMIT: usize = 50;

/// Read side of the studio plus saves and deletion.
#[derive(Clone)]
pub struct Gallery {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    bucket: String,
}

fn require(identity: Option<&Identity>) -> Result<&Identity> {
    identity.ok_or(StudioError::Unauthenticated)
}

impl Gallery {
    pub fn new(records: Arc<dyn RecordStore>, blobs: Arc<dyn BlobStore>, bucket: &str) -> Self {
        Self {
            records,
            blobs,
            bucket: bucket.to_string(),
        }
    }

    /// Public feed, newest first, optionally filtered by a web-style search.
    pub async fn feed(
        &self,
        search: Option<&str>,
        range: PageRange,
    ) -> Result<PageResponse<FeedItem>> {
        let query = ImageQuery {
            author_id: None,
            search: search
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string),
        };
        let page = self.records.list_images(query, range).await?;
        Ok(PageResponse::new(page.map(FeedItem::from), range))
    }

    pub async fn history(
        &self,
        identity: Option<&Identity>,
        range: PageRange,
    ) -> Result<PageResponse<ImageRecord>> {
        let identity = require(identity)?;
        let query = ImageQuery {
            author_id: Some(identity.id.clone()),
            search: None,
        };
        let page = self.records.list_images(query, range).await?;
        Ok(PageResponse::new(page, range))
    }

    pub async fn collection(
        &self,
        identity: Option<&Identity>,
        range: PageRange,
    ) -> Result<PageResponse<SavedImage>> {
        let identity = require(identity)?;
        let page = self.records.list_saves(&identity.id, range).await?;
        Ok(PageResponse::new(page, range))
    }

    /// Which of `image_ids` the caller has saved. Anonymous callers have saved nothing.
    pub async fn saved_ids(
        &self,
        identity: Option<&Identity>,
        image_ids: &[String],
    ) -> Result<Vec<String>> {
        let ids: Vec<String> = image_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();

        match identity {
            Some(identity) if !ids.is_empty() => {
                self.records.saved_image_ids(&identity.id, &ids).await
            }
            _ => Ok(Vec::new()),
        }
    }

    pub async fn save(
        &self,
        identity: Option<&Identity>,
        image_id: &str,
    ) -> Result<(SaveOutcome, SaveState)> {
        let identity = require(identity)?;
        let image_id = non_empty_id(image_id)?;

        let outcome = self.records.insert_save(&identity.id, image_id).await?;
        if outcome == SaveOutcome::Created {
            log::info!("{} saved {}", identity.id, image_id);
        }

        Ok((
            outcome,
            SaveState {
                image_id: image_id.to_string(),
                saved: true,
            },
        ))
    }

    pub async fn unsave(&self, identity: Option<&Identity>, image_id: &str) -> Result<SaveState> {
        let identity = require(identity)?;
        let image_id = non_empty_id(image_id)?;

        self.records.delete_save(&identity.id, image_id).await?;
        Ok(SaveState {
            image_id: image_id.to_string(),
            saved: false,
        })
    }

    pub async fn get_image(&self, id: &str) -> Result<ImageRecord> {
        self.records.get_image(id).await?.ok_or(StudioError::NotFound)
    }

    /// Author-only. Saves go first, then the blob, then the record.
    pub async fn delete_image(&self, identity: Option<&Identity>, id: &str) -> Result<()> {
        let identity = require(identity)?;
        let image = self.get_image(id).await?;
        if image.author_id != identity.id {
            return Err(StudioError::Forbidden);
        }

        self.records.delete_saves_for_image(id).await?;

        match extract_storage_path(&image.url, &self.bucket) {
            Some(path) => self.blobs.remove(&[path]).await?,
            None => log::warn!("No storage path in {}; leaving blob in place", image.url),
        }

        self.records.delete_image(id).await?;
        log::info!("{} deleted image {}", identity.id, id);
        Ok(())
    }
}

fn non_empty_id(image_id: &str) -> Result<&str> {
    let trimmed = image_id.trim();
    if trimmed.is_empty() {
        return Err(StudioError::InvalidInput("Missing image_id".into()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewImage;
    use crate::storage::{MemoryBlobStore, MemoryRecordStore};

    struct Fixture {
        gallery: Gallery,
        records: Arc<MemoryRecordStore>,
        blobs: Arc<MemoryBlobStore>,
    }

    fn fixture() -> Fixture {
        let records = Arc::new(MemoryRecordStore::new());
        let blobs = Arc::new(MemoryBlobStore::new("http://localhost:8080", "images").unwrap());
        Fixture {
            gallery: Gallery::new(records.clone(), blobs.clone(), "images"),
            records,
            blobs,
        }
    }

    async fn publish(fixture: &Fixture, author: &str, prompt: &str, seed: &str) -> ImageRecord {
        let path = format!("{}/{}.png", author, seed);
        fixture.blobs.upload(&path, vec![7], "image/png").await.unwrap();
        fixture
            .records
            .insert_image(NewImage {
                url: fixture.blobs.public_url(&path),
                prompt: prompt.to_string(),
                negative_prompt: None,
                resolution: "512x512".to_string(),
                color: None,
                guidance: None,
                seed: seed.to_string(),
                author_id: author.to_string(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn feed_pages_and_searches() {
        let fixture = fixture();
        for i in 0..5 {
            publish(&fixture, "alice", &format!("red cat {}", i), &format!("s{}", i)).await;
        }
        publish(&fixture, "bob", "blue whale", "w").await;

        let page = fixture.gallery.feed(None, PageRange::new(1, 4)).await.unwrap();
        assert_eq!(page.count, 6);
        assert_eq!(page.items.len(), 4);
        assert!(page.has_more);
        assert_eq!(page.items[0].prompt, "blue whale");

        let last = fixture.gallery.feed(None, PageRange::new(2, 4)).await.unwrap();
        assert_eq!(last.items.len(), 2);
        assert!(!last.has_more);

        let found = fixture
            .gallery
            .feed(Some("  whale "), PageRange::new(1, 12))
            .await
            .unwrap();
        assert_eq!(found.count, 1);
        assert_eq!(found.items[0].author_id, "bob");
    }

    #[tokio::test]
    async fn feed_past_the_last_page_is_empty() {
        let fixture = fixture();
        publish(&fixture, "alice", "a cat", "1").await;

        let range = PageRange::from_params(
            Some("9223372036854775807"),
            None,
            FEED_DEFAULT_LIMIT,
            FEED_MAX_LIMIT,
        );
        let page = fixture.gallery.feed(None, range).await.unwrap();
        assert_eq!(page.count, 1);
        assert!(page.items.is_empty());
        assert!(!page.has_more);
        assert_eq!(page.page, crate::models::MAX_PAGE);
    }

    #[tokio::test]
    async fn history_is_private_to_the_author() {
        let fixture = fixture();
        publish(&fixture, "alice", "a", "1").await;
        publish(&fixture, "bob", "b", "2").await;

        let alice = Identity::new("alice");
        let page = fixture
            .gallery
            .history(Some(&alice), PageRange::new(1, 10))
            .await
            .unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.items[0].author_id, "alice");

        assert!(matches!(
            fixture.gallery.history(None, PageRange::new(1, 10)).await,
            Err(StudioError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn save_is_idempotent_and_shows_in_collection() {
        let fixture = fixture();
        let image = publish(&fixture, "alice", "a cat", "1").await;
        let bob = Identity::new("bob");

        let (first, state) = fixture.gallery.save(Some(&bob), &image.id).await.unwrap();
        assert_eq!(first, SaveOutcome::Created);
        assert!(state.saved);
        let (second, _) = fixture.gallery.save(Some(&bob), &image.id).await.unwrap();
        assert_eq!(second, SaveOutcome::AlreadySaved);

        let collection = fixture
            .gallery
            .collection(Some(&bob), PageRange::new(1, 12))
            .await
            .unwrap();
        assert_eq!(collection.count, 1);
        assert_eq!(collection.items[0].image.id, image.id);

        let ids = fixture
            .gallery
            .saved_ids(Some(&bob), &[image.id.clone(), " ".into()])
            .await
            .unwrap();
        assert_eq!(ids, vec![image.id.clone()]);
        assert!(fixture.gallery.saved_ids(None, &[image.id.clone()]).await.unwrap().is_empty());

        let state = fixture.gallery.unsave(Some(&bob), &image.id).await.unwrap();
        assert!(!state.saved);
        fixture.gallery.unsave(Some(&bob), &image.id).await.unwrap();
    }

    #[tokio::test]
    async fn save_validates_input() {
        let fixture = fixture();
        let bob = Identity::new("bob");

        assert!(matches!(
            fixture.gallery.save(Some(&bob), "  ").await,
            Err(StudioError::InvalidInput(_))
        ));
        assert!(matches!(
            fixture.gallery.save(Some(&bob), "missing").await,
            Err(StudioError::NotFound)
        ));
        assert!(matches!(
            fixture.gallery.save(None, "missing").await,
            Err(StudioError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn only_the_author_can_delete() {
        let fixture = fixture();
        let image = publish(&fixture, "alice", "a cat", "1").await;
        let bob = Identity::new("bob");
        fixture.gallery.save(Some(&bob), &image.id).await.unwrap();

        assert!(matches!(
            fixture.gallery.delete_image(Some(&bob), &image.id).await,
            Err(StudioError::Forbidden)
        ));
        assert!(matches!(
            fixture.gallery.delete_image(Some(&bob), "missing").await,
            Err(StudioError::NotFound)
        ));

        let alice = Identity::new("alice");
        fixture.gallery.delete_image(Some(&alice), &image.id).await.unwrap();

        assert!(!fixture.blobs.contains("alice/1.png").await);
        assert!(matches!(
            fixture.gallery.get_image(&image.id).await,
            Err(StudioError::NotFound)
        ));
        assert!(fixture
            .records
            .saved_image_ids("bob", &[image.id])
            .await
            .unwrap()
            .is_empty());
    }
}
