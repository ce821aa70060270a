mod jsonp;
mod region;
mod snps;
mod versions;

pub use jsonp::respond;
pub use region::{get_region, post_region};
pub use snps::{get_snps, post_snps};
pub use versions::{get_meta, get_versions};

use crate::catalog::Catalog;
use crate::{Error, Result};
use axum::{Router, routing::get};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
}

/// Routes for the query API.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/versions", get(get_versions))
        .route("/api/meta", get(get_meta))
        .route("/api/snps", get(get_snps).post(post_snps))
        .route("/api/region", get(get_region).post(post_region))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::InvalidInput(format!("no {} specified", name)))
}

/// Run a store query off the async runtime. SQLite handles are blocking.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("query task failed: {}", e)))?
}
