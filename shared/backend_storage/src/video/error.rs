//! Error types for video metadata storage operations

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::{
    get_item::GetItemError, put_item::PutItemError, query::QueryError,
};
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for video storage operations
pub type VideoStorageResult<T> = Result<T, VideoStorageError>;

/// Storage error types for video metadata operations
#[derive(Debug, Error)]
pub enum VideoStorageError {
    /// Failed to write a video record into `DynamoDB`
    #[error("Failed to write video into DynamoDB: {0:?}")]
    DynamoDbPutError(#[from] SdkError<PutItemError>),

    /// Failed to get a video record from `DynamoDB`
    #[error("Failed to get video from DynamoDB: {0:?}")]
    DynamoDbGetError(#[from] SdkError<GetItemError>),

    /// Failed to query video records from `DynamoDB`
    #[error("Failed to query videos from DynamoDB: {0:?}")]
    DynamoDbQueryError(#[from] SdkError<QueryError>),

    /// The record to update does not exist
    #[error("Video not found: {0}")]
    VideoNotFound(Uuid),

    /// The backing store refused the write for a reason of its own
    #[error("Video store unavailable: {0}")]
    Unavailable(String),

    /// Failed to parse a video record from a `DynamoDB` item
    #[error("Failed to parse video: {0}")]
    SerializationError(String),
}

impl From<serde_dynamo::Error> for VideoStorageError {
    fn from(err: serde_dynamo::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
