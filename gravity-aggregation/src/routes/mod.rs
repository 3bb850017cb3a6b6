pub mod blocks;
pub mod complaints;
pub mod health;
pub mod likes;
pub mod profiles;
pub mod reviews;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use gravity_shared::errors::{AppError, AppResult, ErrorCode};
use gravity_shared::middleware::metrics_middleware;

use crate::store::ProfileRepository;
use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::render_metrics))
        .route("/profiles", get(profiles::list_profiles))
        .route("/profiles/:id", get(profiles::get_profile))
        .route("/likes", post(likes::send_like))
        .route("/likes/:liked_id", delete(likes::cancel_like))
        .route("/blocks", post(blocks::create_block))
        .route("/blocks/:blocked_id", delete(blocks::lift_block))
        .route("/complaints", post(complaints::create_complaint))
        .route("/reviews", get(reviews::list_reviews).post(reviews::add_review))
        .route(
            "/reviews/:id",
            get(reviews::get_review)
                .put(reviews::edit_review)
                .delete(reviews::delete_review),
        )
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

/// Runs synchronous store work off the async runtime under the per-request timeout.
pub(crate) async fn run_blocking<T, F>(state: &AppState, op: &'static str, f: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn ProfileRepository) -> AppResult<T> + Send + 'static,
{
    let repo = Arc::clone(&state.repo);
    let task = tokio::task::spawn_blocking(move || f(repo.as_ref()));

    match tokio::time::timeout(state.config.request_timeout(), task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(AppError::internal(format!("{op} task failed: {e}"))),
        Err(_) => {
            tracing::error!(op, "request timed out");
            Err(AppError::new(ErrorCode::Timeout, format!("{op} timed out")))
        }
    }
}

// ─── Tests ───
