use crate::{
    config::PostgresConfig,
    error::{Result, StudioError},
    models::{ImageRecord, NewImage, PageRange, Paged, SaveOutcome, SavedImage},
    storage::traits::{ImageQuery, RecordStore},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Config, Object, Pool, Runtime};
use tokio_postgres::{error::SqlState, types::ToSql, NoTls, Row};
use uuid::Uuid;

const IMAGE_COLUMNS: &str =
    "id, url, prompt, negative_prompt, resolution, color, guidance, seed, author_id, created_at";

pub struct PostgresRecordStore {
    pool: Pool,
}

impl PostgresRecordStore {
    pub async fn new(config: PostgresConfig) -> Result<Self> {
        let mut cfg = Config::new();
        cfg.host = config.host;
        cfg.port = config.port;
        cfg.user = config.username;
        cfg.password = config.password;
        cfg.dbname = config.database;

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StudioError::ConfigError(format!("Failed to create pool: {}", e)))?;

        let storage = Self { pool };
        storage.initialize_schema().await?;

        Ok(storage)
    }

    async fn client(&self) -> Result<Object> {
        self.pool
            .get()
            .await
            .map_err(|e| StudioError::persistence(format!("Failed to get connection: {}", e)))
    }

    async fn initialize_schema(&self) -> Result<()> {
        let client = self.client().await?;

        client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS images (
                    id TEXT PRIMARY KEY,
                    url TEXT NOT NULL,
                    prompt TEXT NOT NULL,
                    negative_prompt TEXT,
                    resolution TEXT NOT NULL,
                    color TEXT,
                    guidance DOUBLE PRECISION,
                    seed TEXT,
                    author_id TEXT NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );
                CREATE INDEX IF NOT EXISTS idx_images_author ON images(author_id, created_at DESC);
                CREATE INDEX IF NOT EXISTS idx_images_created ON images(created_at DESC);
                CREATE INDEX IF NOT EXISTS idx_images_prompt_fts
                    ON images USING GIN (to_tsvector('english', prompt));
                CREATE TABLE IF NOT EXISTS saves (
                    user_id TEXT NOT NULL,
                    image_id TEXT NOT NULL REFERENCES images(id) ON DELETE CASCADE,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    PRIMARY KEY (user_id, image_id)
                );",
            )
            .await
            .map_err(|e| StudioError::persistence(format!("Failed to create schema: {}", e)))?;

        log::info!("PostgreSQL record storage schema initialized");
        Ok(())
    }

    fn image_from_row(row: &Row) -> ImageRecord {
        ImageRecord {
            id: row.get("id"),
            url: row.get("url"),
            prompt: row.get("prompt"),
            negative_prompt: row.get("negative_prompt"),
            resolution: row.get("resolution"),
            color: row.get("color"),
            guidance: row.get("guidance"),
            seed: row.get("seed"),
            author_id: row.get("author_id"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    async fn insert_image(&self, image: NewImage) -> Result<ImageRecord> {
        let client = self.client().await?;
        let id = Uuid::new_v4().to_string();

        let row = client
            .query_one(
                &format!(
                    "INSERT INTO images (id, url, prompt, negative_prompt, resolution, color, guidance, seed, author_id)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                     RETURNING {}",
                    IMAGE_COLUMNS
                ),
                &[
                    &id,
                    &image.url,
                    &image.prompt,
                    &image.negative_prompt,
                    &image.resolution,
                    &image.color,
                    &image.guidance,
                    &image.seed,
                    &image.author_id,
                ],
            )
            .await
            .map_err(|e| StudioError::persistence(format!("Failed to insert image: {}", e)))?;

        Ok(Self::image_from_row(&row))
    }

    async fn get_image(&self, id: &str) -> Result<Option<ImageRecord>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                &format!("SELECT {} FROM images WHERE id = $1", IMAGE_COLUMNS),
                &[&id],
            )
            .await
            .map_err(|e| StudioError::persistence(format!("Failed to load image: {}", e)))?;

        Ok(row.as_ref().map(Self::image_from_row))
    }

    async fn delete_image(&self, id: &str) -> Result<()> {
        let client = self.client().await?;
        client
            .execute("DELETE FROM images WHERE id = $1", &[&id])
            .await
            .map_err(|e| StudioError::persistence(format!("Failed to delete image: {}", e)))?;
        Ok(())
    }

    async fn list_images(&self, query: ImageQuery, range: PageRange) -> Result<Paged<ImageRecord>> {
        let client = self.client().await?;

        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn ToSql + Sync + Send>> = Vec::new();
        if let Some(author_id) = query.author_id {
            params.push(Box::new(author_id));
            conditions.push(format!("author_id = ${}", params.len()));
        }
        if let Some(search) = query.search.filter(|s| !s.trim().is_empty()) {
            params.push(Box::new(search));
            conditions.push(format!(
                "to_tsvector('english', prompt) @@ websearch_to_tsquery('english', ${})",
                params.len()
            ));
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let filter_params: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let total: i64 = client
            .query_one(
                &format!("SELECT COUNT(*) FROM images {}", where_clause),
                &filter_params,
            )
            .await
            .map_err(|e| StudioError::persistence(format!("Failed to count images: {}", e)))?
            .get(0);

        let limit = i64::try_from(range.limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(range.offset()).unwrap_or(i64::MAX);
        let mut page_params = filter_params.clone();
        page_params.push(&limit);
        page_params.push(&offset);

        let rows = client
            .query(
                &format!(
                    "SELECT {} FROM images {} ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
                    IMAGE_COLUMNS,
                    where_clause,
                    filter_params.len() + 1,
                    filter_params.len() + 2
                ),
                &page_params,
            )
            .await
            .map_err(|e| StudioError::persistence(format!("Failed to list images: {}", e)))?;

        Ok(Paged {
            items: rows.iter().map(Self::image_from_row).collect(),
            total: total as usize,
        })
    }

    async fn insert_save(&self, user_id: &str, image_id: &str) -> Result<SaveOutcome> {
        let client = self.client().await?;
        let result = client
            .execute(
                "INSERT INTO saves (user_id, image_id) VALUES ($1, $2)",
                &[&user_id, &image_id],
            )
            .await;

        match result {
            Ok(_) => Ok(SaveOutcome::Created),
            Err(e) if e.code() == Some(&SqlState::UNIQUE_VIOLATION) => Ok(SaveOutcome::AlreadySaved),
            Err(e) if e.code() == Some(&SqlState::FOREIGN_KEY_VIOLATION) => {
                Err(StudioError::NotFound)
            }
            Err(e) => Err(StudioError::persistence(format!("Failed to save image: {}", e))),
        }
    }

    async fn delete_save(&self, user_id: &str, image_id: &str) -> Result<()> {
        let client = self.client().await?;
        client
            .execute(
                "DELETE FROM saves WHERE user_id = $1 AND image_id = $2",
                &[&user_id, &image_id],
            )
            .await
            .map_err(|e| StudioError::persistence(format!("Failed to delete save: {}", e)))?;
        Ok(())
    }

    async fn delete_saves_for_image(&self, image_id: &str) -> Result<()> {
        let client = self.client().await?;
        client
            .execute("DELETE FROM saves WHERE image_id = $1", &[&image_id])
            .await
            .map_err(|e| StudioError::persistence(format!("Failed to delete saves: {}", e)))?;
        Ok(())
    }

    async fn saved_image_ids(&self, user_id: &str, image_ids: &[String]) -> Result<Vec<String>> {
        let client = self.client().await?;
        let ids: Vec<String> = image_ids.to_vec();
        let rows = client
            .query(
                "SELECT image_id FROM saves WHERE user_id = $1 AND image_id = ANY($2)",
                &[&user_id, &ids],
            )
            .await
            .map_err(|e| StudioError::persistence(format!("Failed to load saves: {}", e)))?;

        Ok(rows.iter().map(|row| row.get("image_id")).collect())
    }

    async fn list_saves(&self, user_id: &str, range: PageRange) -> Result<Paged<SavedImage>> {
        let client = self.client().await?;

        let total: i64 = client
            .query_one(
                "SELECT COUNT(*) FROM saves s JOIN images i ON i.id = s.image_id WHERE s.user_id = $1",
                &[&user_id],
            )
            .await
            .map_err(|e| StudioError::persistence(format!("Failed to count saves: {}", e)))?
            .get(0);

        let limit = i64::try_from(range.limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(range.offset()).unwrap_or(i64::MAX);
        let rows = client
            .query(
                "SELECT i.id, i.url, i.prompt, i.negative_prompt, i.resolution, i.color, i.guidance,
                        i.seed, i.author_id, i.created_at, s.created_at AS saved_at
                 FROM saves s JOIN images i ON i.id = s.image_id
                 WHERE s.user_id = $1
                 ORDER BY s.created_at DESC
                 LIMIT $2 OFFSET $3",
                &[&user_id, &limit, &offset],
            )
            .await
            .map_err(|e| StudioError::persistence(format!("Failed to list saves: {}", e)))?;

        let items = rows
            .iter()
            .map(|row| {
                let saved_at: DateTime<Utc> = row.get("saved_at");
                SavedImage::new(Self::image_from_row(row), saved_at)
            })
            .collect();

        Ok(Paged {
            items,
            total: total as usize,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        let client = self.client().await?;
        Ok(client.simple_query("SELECT 1").await.is_ok())
    }
}
