use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw output of a single provider call.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub seed_used: String,
}

impl GenerationResult {
    pub fn extension(&self) -> &'static str {
        extension_for(&self.content_type)
    }
}

pub fn extension_for(content_type: &str) -> &'static str {
    if content_type.contains("png") {
        "png"
    } else {
        "jpg"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: String,
    pub url: String,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub resolution: String,
    pub color: Option<String>,
    pub guidance: Option<f64>,
    pub seed: Option<String>,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewImage {
    pub url: String,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub resolution: String,
    pub color: Option<String>,
    pub guidance: Option<f64>,
    pub seed: String,
    pub author_id: String,
}

impl NewImage {
    pub fn into_record(self, id: String, created_at: DateTime<Utc>) -> ImageRecord {
        ImageRecord {
            id,
            url: self.url,
            prompt: self.prompt,
            negative_prompt: self.negative_prompt,
            resolution: self.resolution,
            color: self.color,
            guidance: self.guidance,
            seed: Some(self.seed),
            author_id: self.author_id,
            created_at,
        }
    }
}

/// Public feed entry; deliberately omits generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,
    pub url: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    pub author_id: String,
}

impl From<ImageRecord> for FeedItem {
    fn from(record: ImageRecord) -> Self {
        FeedItem {
            id: record.id,
            url: record.url,
            prompt: record.prompt,
            created_at: record.created_at,
            author_id: record.author_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedImage {
    #[serde(flatten)]
    pub image: ImageRecord,
    pub author_name: Option<String>,
    pub author_avatar_url: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl SavedImage {
    pub fn new(image: ImageRecord, saved_at: DateTime<Utc>) -> Self {
        SavedImage {
            image,
            author_name: None,
            author_avatar_url: None,
            saved_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    AlreadySaved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveState {
    pub image_id: String,
    pub saved: bool,
}
