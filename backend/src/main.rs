use std::sync::Arc;
use std::time::Duration;

use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_s3::Client as S3Client;

use backend::{
    jwt::JwtManager,
    media::{FfmpegTranscoder, FfprobeInspector, MediaPipeline},
    placement::{PlacementConfig, S3ObjectStorage, StoragePlacement, ThumbnailRegistry},
    server::{self, Services},
    types::Environment,
    upload::UploadService,
};
use backend_storage::video::VideoStorage;
use tracing_subscriber::{filter::LevelFilter, fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env();

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(environment.tracing_level()).into())
        .from_env_lossy();

    // Configure logging format based on environment
    // Use JSON format for staging/production (Datadog), regular format for development
    match environment {
        Environment::Production | Environment::Staging => {
            fmt().json().with_env_filter(env_filter).init();
        }
        Environment::Development { .. } => {
            fmt().with_env_filter(env_filter).init();
        }
    }

    let aws_config = environment.aws_config().await;
    let s3_client = Arc::new(S3Client::from_conf(environment.s3_client_config().await));
    let dynamodb_client = Arc::new(DynamoDbClient::new(&aws_config));

    let store = Arc::new(VideoStorage::new(
        dynamodb_client,
        environment.videos_table_name(),
        environment.videos_owner_index_name(),
    ));

    let registry = Arc::new(ThumbnailRegistry::new());
    let placement = Arc::new(StoragePlacement::new(
        PlacementConfig {
            thumbnail_strategy: environment.thumbnail_placement(),
            url_form: environment.object_url_form(),
            bucket: environment.s3_bucket(),
            region: environment.s3_region(),
            platform_base_url: environment.platform_base_url(),
            presign_ttl: Duration::from_secs(environment.presigned_url_expiry_secs()),
        },
        Arc::new(S3ObjectStorage::new(s3_client)),
        registry.clone(),
    ));

    let media = Arc::new(MediaPipeline::new(
        Arc::new(FfprobeInspector::new(environment.ffprobe_path())),
        Arc::new(FfmpegTranscoder::new(environment.ffmpeg_path())),
        environment.max_concurrent_media_jobs(),
    ));

    let uploads = Arc::new(UploadService::new(store.clone(), placement.clone(), media));
    let jwt_manager = Arc::new(JwtManager::new(&environment.jwt_secret()));

    let services = Services {
        jwt_manager,
        store,
        placement,
        registry,
        uploads,
    };

    server::start(environment, services).await
}
