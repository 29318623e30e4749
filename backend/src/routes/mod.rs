mod assets;
mod docs;
mod health;
pub mod thumbnails;
pub mod videos;

use aide::axum::{
    routing::{get, post},
    ApiRouter,
};
use axum::{extract::DefaultBodyLimit, middleware};

use crate::middleware::auth::auth_middleware;

/// Form size limit for thumbnail uploads (10 MiB)
pub const MAX_THUMBNAIL_BODY_BYTES: usize = 10 << 20;

/// Request size limit for video uploads (1 GiB)
pub const MAX_VIDEO_BODY_BYTES: usize = 1 << 30;

/// Creates the router with all handler routes
pub fn handler() -> ApiRouter {
    let public_routes = ApiRouter::new()
        .merge(docs::handler())
        .api_route("/health", get(health::handler))
        .api_route("/api/videos/{videoID}", get(videos::get_video))
        // Raw image bytes, not part of the JSON API
        .route(
            "/api/thumbnails/{videoID}",
            axum::routing::get(thumbnails::get_thumbnail),
        )
        .route("/assets/{*key}", axum::routing::get(assets::get_asset));

    let protected_routes = ApiRouter::new()
        .api_route(
            "/api/videos",
            post(videos::create_video).get(videos::list_videos),
        )
        .merge(
            ApiRouter::new()
                .api_route(
                    "/api/thumbnails/{videoID}",
                    post(thumbnails::upload_thumbnail),
                )
                .layer(DefaultBodyLimit::max(MAX_THUMBNAIL_BODY_BYTES)),
        )
        .merge(
            ApiRouter::new()
                .api_route("/api/videos/{videoID}", post(videos::upload_video))
                .layer(DefaultBodyLimit::max(MAX_VIDEO_BODY_BYTES)),
        )
        .layer(middleware::from_fn(auth_middleware));

    public_routes.merge(protected_routes)
}
