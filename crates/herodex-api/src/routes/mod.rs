//! HTTP route handlers.

pub mod lists;
pub mod superheroes;

use std::sync::Arc;

use axum::Router;
use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;
use crate::server::AppState;

/// `/api` routes.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(superheroes::routes())
        .merge(lists::routes())
}

/// JSON body extractor whose rejection uses the standard error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejection uses the standard error body.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Query-string extractor whose rejection uses the standard error body.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
