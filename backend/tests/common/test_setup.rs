use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, response::Response, Router};
use backend::{
    jwt::{JwtManager, TOKEN_EXPIRATION_SECS},
    media::MediaPipeline,
    placement::{
        ObjectUrlForm, PlacementConfig, PlacementStrategy, StoragePlacement, ThumbnailRegistry,
    },
    server::{self, Services},
    testing::{FakeInspector, FakeTranscoder, MemoryObjectStorage, MemoryVideoStore},
    types::Environment,
    upload::UploadService,
};
use backend_storage::video::Video;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use super::{multipart_body, multipart_content_type, FormPart};

pub const TEST_JWT_SECRET: &str = "tubely-test-secret";
pub const TEST_BUCKET: &str = "tubely-test-media";

/// Setup test environment variables with all the required configuration
pub fn setup_test_env() {
    // Initialize tracing for tests
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .ok();
}

/// Knobs for a test deployment
pub struct TestOptions {
    pub thumbnail_strategy: PlacementStrategy,
    pub url_form: ObjectUrlForm,
    pub inspector: FakeInspector,
    pub transcoder: FakeTranscoder,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            thumbnail_strategy: PlacementStrategy::Inline,
            url_form: ObjectUrlForm::Presigned,
            inspector: FakeInspector::reporting("16:9"),
            transcoder: FakeTranscoder::new(),
        }
    }
}

/// Router wired to in-memory fakes
pub struct TestSetup {
    pub router: Router,
    pub jwt_manager: Arc<JwtManager>,
    pub store: Arc<MemoryVideoStore>,
    pub objects: Arc<MemoryObjectStorage>,
    pub registry: Arc<ThumbnailRegistry>,
    pub inspector: Arc<FakeInspector>,
    pub transcoder: Arc<FakeTranscoder>,
    pub temp_dir: TempDir,
}

impl TestSetup {
    pub fn new(options: TestOptions) -> Self {
        setup_test_env();

        let environment = Environment::Development {
            presign_expiry_override: None,
        };

        let store = Arc::new(MemoryVideoStore::new());
        let objects = Arc::new(MemoryObjectStorage::new());
        let registry = Arc::new(ThumbnailRegistry::new());
        let inspector = Arc::new(options.inspector);
        let transcoder = Arc::new(options.transcoder);
        let temp_dir = tempfile::tempdir().unwrap();

        let placement = Arc::new(StoragePlacement::new(
            PlacementConfig {
                thumbnail_strategy: options.thumbnail_strategy,
                url_form: options.url_form,
                bucket: TEST_BUCKET.to_string(),
                region: "us-east-1".to_string(),
                platform_base_url: "http://localhost:8091".to_string(),
                presign_ttl: Duration::from_secs(300),
            },
            objects.clone(),
            registry.clone(),
        ));

        let media = Arc::new(MediaPipeline::new(inspector.clone(), transcoder.clone(), 2));
        let uploads = Arc::new(
            UploadService::new(store.clone(), placement.clone(), media)
                .with_temp_dir(temp_dir.path()),
        );
        let jwt_manager = Arc::new(JwtManager::new(TEST_JWT_SECRET));

        let router = server::router(
            environment,
            Services {
                jwt_manager: jwt_manager.clone(),
                store: store.clone(),
                placement,
                registry: registry.clone(),
                uploads,
            },
        );

        Self {
            router,
            jwt_manager,
            store,
            objects,
            registry,
            inspector,
            transcoder,
            temp_dir,
        }
    }

    pub fn default() -> Self {
        Self::new(TestOptions::default())
    }

    /// Issues a valid access token for `user_id`
    pub fn token_for(&self, user_id: Uuid) -> String {
        self.jwt_manager
            .issue_token(user_id, TOKEN_EXPIRATION_SECS)
            .unwrap()
    }

    /// Seeds a video owned by a fresh user, returning the video and a token for its owner
    pub fn seed_owned_video(&self) -> (Video, String) {
        let owner = Uuid::new_v4();
        let video = self.store.seed(owner);
        (video, self.token_for(owner))
    }

    /// Files currently in the upload temp directory
    pub fn temp_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn send_multipart(
        &self,
        route: &str,
        token: Option<&str>,
        parts: &[FormPart<'_>],
    ) -> Response {
        let mut request = Request::builder()
            .uri(route)
            .method("POST")
            .header("Content-Type", multipart_content_type());
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        self.send(request.body(Body::from(multipart_body(parts))).unwrap())
            .await
    }

    pub async fn send_get_request(&self, route: &str, token: Option<&str>) -> Response {
        let mut request = Request::builder().uri(route).method("GET");
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    pub async fn send_post_request(
        &self,
        route: &str,
        token: Option<&str>,
        payload: serde_json::Value,
    ) -> Response {
        let mut request = Request::builder()
            .uri(route)
            .method("POST")
            .header("Content-Type", "application/json");
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        self.send(request.body(Body::from(payload.to_string())).unwrap())
            .await
    }
}
