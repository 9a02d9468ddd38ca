//! `OpenAPI` (3.1) specification generation for `herodex-api`.
//!
//! The document is served at `/openapi.json` and printed by the
//! `gen_openapi` binary.

use utoipa::OpenApi;

/// `OpenAPI` documentation for the herodex REST API (`/api/*`).
#[derive(OpenApi)]
#[openapi(
    info(
        title = "herodex API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Superhero catalog queries and curated lists"
    ),
    paths(
        crate::routes::superheroes::list_superheroes,
        crate::routes::superheroes::get_superhero,
        crate::routes::lists::list_lists,
        crate::routes::lists::create_list,
        crate::routes::lists::get_list,
        crate::routes::lists::delete_list,
        crate::routes::lists::get_list_superheroes,
        crate::routes::lists::add_list_member,
        crate::routes::lists::remove_list_member,
    ),
    components(
        schemas(
            crate::error::ApiErrorBody,
            crate::error::FieldIssueBody,
            crate::routes::superheroes::SuperheroResponse,
            crate::routes::lists::CreateListRequest,
            crate::routes::lists::AddMemberRequest,
            crate::routes::lists::ListResponse,
            crate::routes::lists::DeleteListResponse,
        )
    ),
    tags(
        (name = "superheroes", description = "Catalog queries"),
        (name = "lists", description = "Curated superhero lists"),
    )
)]
pub struct ApiDoc;

/// Returns the generated `OpenAPI` spec.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Returns the generated `OpenAPI` spec serialized as pretty JSON.
///
/// # Errors
///
/// Returns an error if JSON serialization fails (should not happen).
pub fn openapi_json() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&openapi())
}
