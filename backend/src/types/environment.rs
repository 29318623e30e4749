//! Environment configuration for different deployment stages

use std::env;
use std::str::FromStr;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};
use tracing::Level;

use crate::placement::{ObjectUrlForm, PlacementStrategy};

/// Default expiry for presigned retrieval URLs (5 minutes)
const DEFAULT_PRESIGNED_URL_EXPIRY_SECS: u64 = 5 * 60;

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack`)
    Development {
        /// Optional override for presigned URL expiry in seconds
        presign_expiry_override: Option<u64>,
    },
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => {
                let presign_expiry_override = env::var("PRESIGNED_URL_EXPIRY_SECS")
                    .ok()
                    .and_then(|val| val.parse::<u64>().ok());

                Self::Development {
                    presign_expiry_override,
                }
            }
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Port the HTTP server listens on
    ///
    /// # Panics
    ///
    /// Panics if `PORT` is set but is not a valid port number
    #[must_use]
    pub fn port(&self) -> u16 {
        env::var("PORT").map_or(8091, |p| {
            p.parse()
                .unwrap_or_else(|_| panic!("Invalid PORT: {p}"))
        })
    }

    /// Shared secret used to verify HS256 access tokens
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set in production or staging
    #[must_use]
    pub fn jwt_secret(&self) -> String {
        match self {
            Self::Production | Self::Staging => {
                env::var("JWT_SECRET").expect("JWT_SECRET environment variable is not set")
            }
            Self::Development { .. } => {
                env::var("JWT_SECRET").unwrap_or_else(|_| "tubely-development-secret".to_string())
            }
        }
    }

    /// Whether bearer tokens are taken verbatim as user IDs (development only)
    #[must_use]
    pub fn disable_auth(&self) -> bool {
        matches!(self, Self::Development { .. })
            && env::var("DISABLE_AUTH").is_ok_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// Returns the S3 bucket name for the environment
    ///
    /// # Panics
    ///
    /// Panics if the `S3_BUCKET_NAME` environment variable is not set
    #[must_use]
    pub fn s3_bucket(&self) -> String {
        match self {
            Self::Production | Self::Staging => {
                env::var("S3_BUCKET_NAME").expect("S3_BUCKET_NAME environment variable is not set")
            }
            Self::Development { .. } => {
                env::var("S3_BUCKET_NAME").unwrap_or_else(|_| "tubely-media".to_string())
            }
        }
    }

    /// AWS region of the media bucket, used to build public object URLs
    #[must_use]
    pub fn s3_region(&self) -> String {
        env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string())
    }

    /// `DynamoDB` table holding video records
    ///
    /// # Panics
    ///
    /// Panics if the `VIDEOS_TABLE_NAME` environment variable is not set
    #[must_use]
    pub fn videos_table_name(&self) -> String {
        match self {
            Self::Production | Self::Staging => env::var("VIDEOS_TABLE_NAME")
                .expect("VIDEOS_TABLE_NAME environment variable is not set"),
            Self::Development { .. } => {
                env::var("VIDEOS_TABLE_NAME").unwrap_or_else(|_| "tubely-videos".to_string())
            }
        }
    }

    /// GSI on the videos table keyed by owner
    #[must_use]
    pub fn videos_owner_index_name(&self) -> String {
        env::var("VIDEOS_OWNER_INDEX_NAME").unwrap_or_else(|_| "user-id-index".to_string())
    }

    /// Where thumbnails are placed
    ///
    /// # Panics
    ///
    /// Panics if `THUMBNAIL_PLACEMENT` contains an invalid value
    #[must_use]
    pub fn thumbnail_placement(&self) -> PlacementStrategy {
        env::var("THUMBNAIL_PLACEMENT").map_or(PlacementStrategy::Inline, |value| {
            PlacementStrategy::from_str(value.trim())
                .unwrap_or_else(|_| panic!("Invalid THUMBNAIL_PLACEMENT: {value}"))
        })
    }

    /// How object-storage locations are written to video records
    ///
    /// # Panics
    ///
    /// Panics if `OBJECT_URL_FORM` contains an invalid value
    #[must_use]
    pub fn object_url_form(&self) -> ObjectUrlForm {
        env::var("OBJECT_URL_FORM").map_or(ObjectUrlForm::Presigned, |value| {
            ObjectUrlForm::from_str(value.trim())
                .unwrap_or_else(|_| panic!("Invalid OBJECT_URL_FORM: {value}"))
        })
    }

    /// Externally reachable base URL of this server
    #[must_use]
    pub fn platform_base_url(&self) -> String {
        env::var("PLATFORM_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| format!("http://localhost:{}", self.port()))
    }

    /// Whether to show API docs
    #[must_use]
    pub const fn show_api_docs(&self) -> bool {
        matches!(self, Self::Development { .. } | Self::Staging)
    }

    /// Path of the `ffprobe` executable
    #[must_use]
    pub fn ffprobe_path(&self) -> String {
        env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string())
    }

    /// Path of the `ffmpeg` executable
    #[must_use]
    pub fn ffmpeg_path(&self) -> String {
        env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string())
    }

    /// Upper bound on concurrently running media tool processes
    #[must_use]
    pub fn max_concurrent_media_jobs(&self) -> usize {
        env::var("MAX_CONCURRENT_MEDIA_JOBS")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .filter(|jobs| *jobs > 0)
            .unwrap_or(4)
    }

    /// Request timeout applied to every route
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        let secs = env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(10 * 60);
        Duration::from_secs(secs)
    }

    /// Returns the endpoint URL to use for AWS services
    #[must_use]
    pub const fn override_aws_endpoint_url(&self) -> Option<&str> {
        match self {
            Self::Production | Self::Staging => None,
            Self::Development { .. } => Some("http://localhost:4566"),
        }
    }

    /// AWS configuration with retry and timeout settings
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let retry_config = RetryConfig::standard()
            .with_max_attempts(3)
            .with_initial_backoff(Duration::from_millis(50));

        // Video uploads stream up to 1 GiB to S3, so the operation timeout is generous
        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(5 * 60))
            .build();

        let mut config_builder = aws_config::load_defaults(BehaviorVersion::latest())
            .await
            .to_builder()
            .retry_config(retry_config)
            .timeout_config(timeout_config);

        if let Some(endpoint_url) = self.override_aws_endpoint_url() {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        config_builder.build()
    }

    /// AWS S3 service configuration
    pub async fn s3_client_config(&self) -> aws_sdk_s3::Config {
        let aws_config = self.aws_config().await;
        let s3_config: aws_sdk_s3::Config = (&aws_config).into();
        let mut builder = s3_config.to_builder();

        // Override "force path style" to true for compatibility with LocalStack
        // https://github.com/awslabs/aws-sdk-rust/discussions/874
        if matches!(self, Self::Development { .. }) {
            builder.set_force_path_style(Some(true));
        }

        builder.build()
    }

    /// Presigned URL expiry time in seconds
    #[must_use]
    pub fn presigned_url_expiry_secs(&self) -> u64 {
        match self {
            Self::Production | Self::Staging => DEFAULT_PRESIGNED_URL_EXPIRY_SECS,
            Self::Development {
                presign_expiry_override,
            } => presign_expiry_override.unwrap_or(DEFAULT_PRESIGNED_URL_EXPIRY_SECS),
        }
    }

    /// Fallback log level when `RUST_LOG` is not set
    #[must_use]
    pub fn tracing_level(&self) -> Level {
        env::var("TRACING_LEVEL")
            .ok()
            .and_then(|val| val.parse::<Level>().ok())
            .unwrap_or(match self {
                Self::Production | Self::Staging => Level::INFO,
                Self::Development { .. } => Level::DEBUG,
            })
    }
}
