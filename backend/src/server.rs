use std::sync::Arc;

use aide::openapi::OpenApi;
use axum::Extension;
use backend_storage::video::VideoStore;
use datadog_tracing::axum::{shutdown_signal, OtelAxumLayer, OtelInResponseLayer};
use tokio::net::TcpListener;

use crate::routes;
use crate::{
    jwt::JwtManager,
    placement::{StoragePlacement, ThumbnailRegistry},
    types::Environment,
    upload::UploadService,
};

/// Shared services injected into every request
#[derive(Clone)]
pub struct Services {
    /// Token verification
    pub jwt_manager: Arc<JwtManager>,
    /// Video metadata store
    pub store: Arc<dyn VideoStore>,
    /// Placement and location resolution
    pub placement: Arc<StoragePlacement>,
    /// In-memory thumbnails
    pub registry: Arc<ThumbnailRegistry>,
    /// Upload flows
    pub uploads: Arc<UploadService>,
}

/// Builds the application router without OpenAPI finalization or outer layers
pub fn router(environment: Environment, services: Services) -> axum::Router {
    attach(routes::handler().into(), environment, services)
}

fn attach(router: axum::Router, environment: Environment, services: Services) -> axum::Router {
    router
        .layer(Extension(environment))
        .layer(Extension(services.jwt_manager))
        .layer(Extension(services.store))
        .layer(Extension(services.placement))
        .layer(Extension(services.registry))
        .layer(Extension(services.uploads))
}

/// Starts the server with the given environment and dependencies
///
/// # Errors
///
/// Returns an error if the server fails to start or bind to the port
pub async fn start(environment: Environment, services: Services) -> anyhow::Result<()> {
    let mut openapi = OpenApi::default();

    let router = routes::handler()
        .finish_api(&mut openapi)
        .layer(Extension(openapi));

    let request_timeout = environment.request_timeout();
    let port = environment.port();

    let router = attach(router, environment, services)
        // Include trace context as header into the response
        .layer(OtelInResponseLayer)
        // Start OpenTelemetry trace on incoming request
        .layer(OtelAxumLayer::default())
        .layer(tower_http::timeout::TimeoutLayer::new(request_timeout));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🔄 Tubely backend started on http://{addr}");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(anyhow::Error::from)
}
