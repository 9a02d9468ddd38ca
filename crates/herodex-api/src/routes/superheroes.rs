//! Superhero catalog routes.
//!
//! ## Routes
//!
//! - `GET /api/superheroes` - Filter, sort and limit the catalog
//! - `GET /api/superheroes/{id}` - Get one superhero by id

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use herodex_catalog::{EntityRecord, RawQuery, find_by_id, parse_entity_id, query, validate_query};

use crate::context::RequestContext;
use crate::error::{ApiError, ApiErrorBody};
use crate::routes::{ApiPath, ApiQuery};
use crate::server::AppState;

/// Catalog query parameters.
///
/// All parameters are optional and combine with AND. Text filters are
/// case-insensitive substring matches; characters outside `[A-Za-z0-9.-]`
/// are ignored.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SuperheroQuery {
    /// Exact superhero id.
    pub id: Option<String>,
    /// Name substring.
    pub name: Option<String>,
    /// Race substring.
    pub race: Option<String>,
    /// Publisher substring.
    pub publisher: Option<String>,
    /// Power substring; matches if any power contains it.
    pub power: Option<String>,
    /// Sort key: `name`, `race`, `publisher` or `power`.
    pub sort: Option<String>,
    /// Maximum number of results.
    pub limit: Option<String>,
}

impl From<SuperheroQuery> for RawQuery {
    fn from(value: SuperheroQuery) -> Self {
        Self {
            id: value.id,
            name: value.name,
            race: value.race,
            publisher: value.publisher,
            power: value.power,
            sort: value.sort,
            limit: value.limit,
        }
    }
}

/// Superhero response.
#[derive(Debug, Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize))]
pub struct SuperheroResponse {
    /// Superhero id.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Race.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub race: Option<String>,
    /// Publisher.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    /// Gender.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// Eye color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eye_color: Option<String>,
    /// Hair color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hair_color: Option<String>,
    /// Skin color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skin_color: Option<String>,
    /// Alignment (good, bad, neutral).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<String>,
    /// Height in centimetres.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Weight in kilograms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Powers, in dataset column order.
    pub powers: Vec<String>,
}

impl From<EntityRecord> for SuperheroResponse {
    fn from(record: EntityRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            race: record.race,
            publisher: record.publisher,
            gender: record.gender,
            eye_color: record.eye_color,
            hair_color: record.hair_color,
            skin_color: record.skin_color,
            alignment: record.alignment,
            height: record.height,
            weight: record.weight,
            powers: record.attributes,
        }
    }
}

pub(crate) fn to_responses(records: Vec<EntityRecord>) -> Vec<SuperheroResponse> {
    records.into_iter().map(SuperheroResponse::from).collect()
}

/// Creates superhero routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/superheroes", get(list_superheroes))
        .route("/api/superheroes/:id", get(get_superhero))
}

/// Query the catalog.
///
/// GET /api/superheroes
#[utoipa::path(
    get,
    path = "/api/superheroes",
    tag = "superheroes",
    params(SuperheroQuery),
    responses(
        (status = 200, description = "Matching superheroes", body = [SuperheroResponse]),
        (status = 400, description = "Invalid query parameters", body = ApiErrorBody),
        (status = 503, description = "Catalog data unavailable", body = ApiErrorBody),
    )
)]
pub(crate) async fn list_superheroes(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<SuperheroQuery>,
) -> Result<Json<Vec<SuperheroResponse>>, ApiError> {
    let snapshot = state.catalog.load().await.map_err(|e| ctx.error(e))?;
    let params =
        validate_query(&params.into(), snapshot.bounds()).map_err(|e| ctx.error(e))?;

    let records = query(&snapshot, &params);
    Ok(Json(to_responses(records)))
}

/// Get a superhero by id.
///
/// GET /api/superheroes/{id}
#[utoipa::path(
    get,
    path = "/api/superheroes/{id}",
    tag = "superheroes",
    params(
        ("id" = u32, Path, description = "Superhero id")
    ),
    responses(
        (status = 200, description = "Superhero found", body = SuperheroResponse),
        (status = 400, description = "Invalid id", body = ApiErrorBody),
        (status = 404, description = "No superhero with this id", body = ApiErrorBody),
        (status = 503, description = "Catalog data unavailable", body = ApiErrorBody),
    )
)]
pub(crate) async fn get_superhero(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<SuperheroResponse>, ApiError> {
    let snapshot = state.catalog.load().await.map_err(|e| ctx.error(e))?;
    let id = parse_entity_id("id", &id, snapshot.bounds()).map_err(|e| ctx.error(e))?;

    let record = find_by_id(&snapshot, id)
        .ok_or_else(|| ctx.error(ApiError::not_found(format!("superhero not found: {id}"))))?;
    Ok(Json(record.into()))
}
