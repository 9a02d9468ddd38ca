//! OpenAPI contract tests.
//!
//! Ensures the generated document describes every public route and schema,
//! and that `/openapi.json` serves the same document.

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use herodex_api::server::ServerBuilder;

fn generated() -> Result<Value> {
    let json = herodex_api::openapi::openapi_json().context("generate OpenAPI JSON")?;
    serde_json::from_str(&json).context("parse generated OpenAPI JSON")
}

#[test]
fn contract_openapi_lists_every_route() -> Result<()> {
    let doc = generated()?;
    let paths = doc["paths"].as_object().context("paths object")?;

    let expected = [
        ("/api/superheroes", "get"),
        ("/api/superheroes/{id}", "get"),
        ("/api/lists", "get"),
        ("/api/lists", "post"),
        ("/api/lists/{name}", "get"),
        ("/api/lists/{name}", "delete"),
        ("/api/lists/{name}/superheroes", "get"),
        ("/api/lists/{name}/superheroes", "post"),
        ("/api/lists/{name}/superheroes/{id}", "delete"),
    ];
    for (path, method) in expected {
        let item = paths
            .get(path)
            .with_context(|| format!("missing path {path}"))?;
        anyhow::ensure!(
            item.get(method).is_some(),
            "missing {method} operation on {path}"
        );
    }
    Ok(())
}

#[test]
fn contract_openapi_is_3_1_with_package_version() -> Result<()> {
    let doc = generated()?;
    assert_eq!(doc["openapi"], "3.1.0");
    assert_eq!(doc["info"]["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(doc["info"]["title"], "herodex API");
    Ok(())
}

#[test]
fn contract_openapi_documents_query_parameters_and_schemas() -> Result<()> {
    let doc = generated()?;

    let params = doc["paths"]["/api/superheroes"]["get"]["parameters"]
        .as_array()
        .context("query parameters")?;
    let mut names: Vec<&str> = params.iter().filter_map(|p| p["name"].as_str()).collect();
    names.sort_unstable();
    assert_eq!(
        names,
        vec!["id", "limit", "name", "power", "publisher", "race", "sort"]
    );

    let schemas = doc["components"]["schemas"]
        .as_object()
        .context("component schemas")?;
    for schema in [
        "ApiErrorBody",
        "FieldIssueBody",
        "SuperheroResponse",
        "CreateListRequest",
        "AddMemberRequest",
        "ListResponse",
        "DeleteListResponse",
    ] {
        anyhow::ensure!(schemas.contains_key(schema), "missing schema {schema}");
    }

    let list_props = schemas["ListResponse"]["properties"]
        .as_object()
        .context("ListResponse properties")?;
    assert!(list_props.contains_key("memberIds"));
    Ok(())
}

#[tokio::test]
async fn contract_openapi_is_served() -> Result<()> {
    let router = ServerBuilder::new().debug(true).build().test_router();
    let request = Request::builder()
        .uri("/openapi.json")
        .body(Body::empty())
        .context("build request")?;

    let response = router.oneshot(request).await.map_err(|err| match err {})?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .context("read response body")?;
    let served: Value = serde_json::from_slice(&body).context("parse served document")?;
    assert_eq!(served, generated()?);
    Ok(())
}
