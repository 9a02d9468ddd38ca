//! Curated list API routes.
//!
//! ## Routes
//!
//! - `GET    /api/lists` - List all list names
//! - `POST   /api/lists` - Create an empty list
//! - `GET    /api/lists/{name}` - Member ids of a list
//! - `DELETE /api/lists/{name}` - Delete a list
//! - `GET    /api/lists/{name}/superheroes` - Member records of a list
//! - `POST   /api/lists/{name}/superheroes` - Add a member
//! - `DELETE /api/lists/{name}/superheroes/{id}` - Remove a member

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use herodex_catalog::CuratedList;

use crate::context::RequestContext;
use crate::error::{ApiError, ApiErrorBody};
use crate::routes::superheroes::{SuperheroResponse, to_responses};
use crate::routes::{ApiJson, ApiPath};
use crate::server::AppState;

/// Request to create a list.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateListRequest {
    /// List name: at least 3 letters, digits or spaces after trimming.
    pub list_name: String,
}

/// Request to add a member to a list.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    /// Superhero id to add.
    pub superhero_id: i64,
}

/// Curated list response.
#[derive(Debug, Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize))]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    /// List name.
    pub name: String,
    /// Member ids in insertion order.
    pub member_ids: Vec<u32>,
}

impl From<CuratedList> for ListResponse {
    fn from(list: CuratedList) -> Self {
        Self {
            name: list.name,
            member_ids: list.member_ids,
        }
    }
}

/// Delete list response.
#[derive(Debug, Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize))]
pub struct DeleteListResponse {
    /// Name of the deleted list.
    pub name: String,
    /// Always `true`.
    pub deleted: bool,
}

/// Creates list routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/lists", get(list_lists).post(create_list))
        .route("/api/lists/:name", get(get_list).delete(delete_list))
        .route(
            "/api/lists/:name/superheroes",
            get(get_list_superheroes).post(add_list_member),
        )
        .route(
            "/api/lists/:name/superheroes/:id",
            delete(remove_list_member),
        )
}

/// List all curated list names.
///
/// GET /api/lists
#[utoipa::path(
    get,
    path = "/api/lists",
    tag = "lists",
    responses(
        (status = 200, description = "List names, sorted", body = [String]),
        (status = 500, description = "Storage error", body = ApiErrorBody),
    )
)]
pub(crate) async fn list_lists(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, ApiError> {
    let names = state.lists.list_names().await.map_err(|e| ctx.error(e))?;
    Ok(Json(names))
}

/// Create an empty list.
///
/// POST /api/lists
#[utoipa::path(
    post,
    path = "/api/lists",
    tag = "lists",
    request_body = CreateListRequest,
    responses(
        (status = 201, description = "List created", body = ListResponse),
        (status = 400, description = "Invalid list name", body = ApiErrorBody),
        (status = 409, description = "List already exists", body = ApiErrorBody),
        (status = 500, description = "Storage error", body = ApiErrorBody),
    )
)]
pub(crate) async fn create_list(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateListRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(list = %req.list_name, "Creating list");

    let list = state
        .lists
        .create(&req.list_name)
        .await
        .map_err(|e| ctx.error(e))?;
    Ok((StatusCode::CREATED, Json(ListResponse::from(list))))
}

/// Get the member ids of a list.
///
/// GET /api/lists/{name}
#[utoipa::path(
    get,
    path = "/api/lists/{name}",
    tag = "lists",
    params(
        ("name" = String, Path, description = "List name")
    ),
    responses(
        (status = 200, description = "Member ids in insertion order", body = [u32]),
        (status = 400, description = "Invalid list name", body = ApiErrorBody),
        (status = 404, description = "List not found", body = ApiErrorBody),
    )
)]
pub(crate) async fn get_list(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    ApiPath(name): ApiPath<String>,
) -> Result<Json<Vec<u32>>, ApiError> {
    let members = state.lists.members(&name).await.map_err(|e| ctx.error(e))?;
    Ok(Json(members))
}

/// Delete a list.
///
/// DELETE /api/lists/{name}
#[utoipa::path(
    delete,
    path = "/api/lists/{name}",
    tag = "lists",
    params(
        ("name" = String, Path, description = "List name")
    ),
    responses(
        (status = 200, description = "List deleted", body = DeleteListResponse),
        (status = 400, description = "Invalid list name", body = ApiErrorBody),
        (status = 404, description = "List not found", body = ApiErrorBody),
    )
)]
pub(crate) async fn delete_list(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    ApiPath(name): ApiPath<String>,
) -> Result<Json<DeleteListResponse>, ApiError> {
    tracing::info!(list = %name, "Deleting list");

    state.lists.delete(&name).await.map_err(|e| ctx.error(e))?;
    Ok(Json(DeleteListResponse {
        name: name.trim().to_string(),
        deleted: true,
    }))
}

/// Get the full records of a list's members.
///
/// GET /api/lists/{name}/superheroes
#[utoipa::path(
    get,
    path = "/api/lists/{name}/superheroes",
    tag = "lists",
    params(
        ("name" = String, Path, description = "List name")
    ),
    responses(
        (status = 200, description = "Member records in list order", body = [SuperheroResponse]),
        (status = 400, description = "Invalid list name", body = ApiErrorBody),
        (status = 404, description = "List not found", body = ApiErrorBody),
        (status = 503, description = "Catalog data unavailable", body = ApiErrorBody),
    )
)]
pub(crate) async fn get_list_superheroes(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    ApiPath(name): ApiPath<String>,
) -> Result<Json<Vec<SuperheroResponse>>, ApiError> {
    let snapshot = state.catalog.load().await.map_err(|e| ctx.error(e))?;
    let records = state
        .lists
        .member_details(&name, &snapshot)
        .await
        .map_err(|e| ctx.error(e))?;
    Ok(Json(to_responses(records)))
}

/// Add a superhero to a list.
///
/// POST /api/lists/{name}/superheroes
#[utoipa::path(
    post,
    path = "/api/lists/{name}/superheroes",
    tag = "lists",
    params(
        ("name" = String, Path, description = "List name")
    ),
    request_body = AddMemberRequest,
    responses(
        (status = 200, description = "Member added", body = ListResponse),
        (status = 400, description = "Invalid list name or superhero id", body = ApiErrorBody),
        (status = 404, description = "List not found", body = ApiErrorBody),
        (status = 409, description = "Already a member", body = ApiErrorBody),
        (status = 503, description = "Catalog data unavailable", body = ApiErrorBody),
    )
)]
pub(crate) async fn add_list_member(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    ApiPath(name): ApiPath<String>,
    ApiJson(req): ApiJson<AddMemberRequest>,
) -> Result<Json<ListResponse>, ApiError> {
    tracing::info!(list = %name, superhero_id = req.superhero_id, "Adding list member");

    let snapshot = state.catalog.load().await.map_err(|e| ctx.error(e))?;
    let list = state
        .lists
        .add_member(&name, req.superhero_id, snapshot.bounds())
        .await
        .map_err(|e| ctx.error(e))?;
    Ok(Json(list.into()))
}

/// Remove a superhero from a list.
///
/// DELETE /api/lists/{name}/superheroes/{id}
#[utoipa::path(
    delete,
    path = "/api/lists/{name}/superheroes/{id}",
    tag = "lists",
    params(
        ("name" = String, Path, description = "List name"),
        ("id" = u32, Path, description = "Superhero id")
    ),
    responses(
        (status = 200, description = "Member removed", body = ListResponse),
        (status = 400, description = "Invalid list name or superhero id", body = ApiErrorBody),
        (status = 404, description = "List not found", body = ApiErrorBody),
        (status = 409, description = "Not a member", body = ApiErrorBody),
        (status = 503, description = "Catalog data unavailable", body = ApiErrorBody),
    )
)]
pub(crate) async fn remove_list_member(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    ApiPath((name, id)): ApiPath<(String, String)>,
) -> Result<Json<ListResponse>, ApiError> {
    tracing::info!(list = %name, superhero_id = %id, "Removing list member");

    let snapshot = state.catalog.load().await.map_err(|e| ctx.error(e))?;
    let list = state
        .lists
        .remove_member_text(&name, &id, snapshot.bounds())
        .await
        .map_err(|e| ctx.error(e))?;
    Ok(Json(list.into()))
}
