//! Video metadata storage module for `DynamoDB` operations

mod error;

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
pub use error::{VideoStorageError, VideoStorageResult};
use serde::{Deserialize, Serialize};
use serde_dynamo::{from_items, to_item};
use strum::Display;
use uuid::Uuid;

/// A video record as stored in the `videos` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    /// Primary key - unique video ID (UUID v4)
    pub id: Uuid,
    /// Owner of the video
    pub user_id: Uuid,
    /// Display title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// Location of the thumbnail, if one was uploaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Location of the video file, if one was uploaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// Timestamp of record creation
    pub created_at: i64,
    /// Timestamp of the last update
    pub updated_at: i64,
}

/// Request to create a new draft video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoCreateRequest {
    /// Owner of the new video
    pub user_id: Uuid,
    /// Display title
    pub title: String,
    /// Free-form description
    pub description: String,
}

/// `DynamoDB` attribute names for the videos table
#[derive(Debug, Display)]
#[strum(serialize_all = "snake_case")]
pub enum VideoAttribute {
    /// Primary key - unique video ID
    Id,
    /// Owner ID (used for GSI)
    UserId,
    /// Creation timestamp
    CreatedAt,
}

/// Metadata persistence used by the upload flows
///
/// Records are created outside the upload flows and never deleted by them.
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Creates a new draft video owned by `request.user_id`
    async fn create(&self, request: VideoCreateRequest) -> VideoStorageResult<Video>;

    /// Loads a video by ID
    async fn get(&self, id: Uuid) -> VideoStorageResult<Option<Video>>;

    /// Persists every field of an existing video
    ///
    /// Fails with `VideoStorageError::VideoNotFound` if the record does not exist.
    async fn update(&self, video: &Video) -> VideoStorageResult<()>;

    /// Lists the videos owned by `user_id`, newest first
    async fn list_by_owner(&self, user_id: Uuid) -> VideoStorageResult<Vec<Video>>;
}

/// Storage client for the `videos` table
pub struct VideoStorage {
    dynamodb_client: Arc<DynamoDbClient>,
    table_name: String,
    owner_index_name: String,
}

impl VideoStorage {
    /// Creates a new storage instance
    ///
    /// # Arguments
    ///
    /// * `dynamodb_client` - Pre-configured `DynamoDB` client
    /// * `table_name` - `DynamoDB` table name for videos
    /// * `owner_index_name` - Name of the GSI keyed by `user_id`
    #[must_use]
    pub const fn new(
        dynamodb_client: Arc<DynamoDbClient>,
        table_name: String,
        owner_index_name: String,
    ) -> Self {
        Self {
            dynamodb_client,
            table_name,
            owner_index_name,
        }
    }
}

#[async_trait]
impl VideoStore for VideoStorage {
    async fn create(&self, request: VideoCreateRequest) -> VideoStorageResult<Video> {
        let now = chrono::Utc::now().timestamp();
        let video = Video {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            title: request.title,
            description: request.description,
            thumbnail_url: None,
            video_url: None,
            created_at: now,
            updated_at: now,
        };

        let item = to_item(&video)?;

        self.dynamodb_client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(#pk)")
            .expression_attribute_names("#pk", VideoAttribute::Id.to_string())
            .send()
            .await?;

        tracing::debug!(video_id = %video.id, "Created video record");

        Ok(video)
    }

    async fn get(&self, id: Uuid) -> VideoStorageResult<Option<Video>> {
        let response = self
            .dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .key(
                VideoAttribute::Id.to_string(),
                AttributeValue::S(id.to_string()),
            )
            .send()
            .await?;

        response
            .item()
            .map(|item| {
                serde_dynamo::from_item(item.clone())
                    .map_err(|e| VideoStorageError::SerializationError(e.to_string()))
            })
            .transpose()
    }

    async fn update(&self, video: &Video) -> VideoStorageResult<()> {
        let item = to_item(video)?;

        self.dynamodb_client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_exists(#pk)")
            .expression_attribute_names("#pk", VideoAttribute::Id.to_string())
            .send()
            .await
            .map_err(|err| {
                if matches!(
                    err,
                    SdkError::ServiceError(ref svc) if svc.err().is_conditional_check_failed_exception()
                ) {
                    VideoStorageError::VideoNotFound(video.id)
                } else {
                    err.into()
                }
            })?;

        Ok(())
    }

    async fn list_by_owner(&self, user_id: Uuid) -> VideoStorageResult<Vec<Video>> {
        // Query pages stop at 1 MB, so follow `LastEvaluatedKey` to the end
        let items = self
            .dynamodb_client
            .query()
            .table_name(&self.table_name)
            .index_name(&self.owner_index_name)
            .key_condition_expression("#user_id = :user_id")
            .expression_attribute_names("#user_id", VideoAttribute::UserId.to_string())
            .expression_attribute_values(":user_id", AttributeValue::S(user_id.to_string()))
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await?;

        let mut videos = from_items::<_, Video>(items)?;
        videos.sort_by_key(|v| std::cmp::Reverse(v.created_at));

        Ok(videos)
    }
}
