//! API integration tests.
//!
//! Tests the complete request flow: HTTP → routes → catalog / list store → storage.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use herodex_api::config::{Config, CorsConfig};
use herodex_api::server::{Server, ServerBuilder};
use herodex_catalog::{DatasetSource, JsonFileSource};
use herodex_core::FileBackend;
use herodex_test_utils::{CountingSource, TracingMemoryBackend, sample_source};

fn sample() -> Arc<dyn DatasetSource> {
    Arc::new(sample_source())
}

fn test_router() -> axum::Router {
    ServerBuilder::new()
        .debug(true)
        .catalog_source(sample())
        .build()
        .test_router()
}

fn test_router_with_cors(allowed_origins: Vec<String>) -> axum::Router {
    let config = Config {
        debug: true,
        cors: CorsConfig {
            allowed_origins,
            max_age_seconds: 3600,
        },
        ..Config::default()
    };

    Server::builder()
        .config(config)
        .catalog_source(sample())
        .build()
        .test_router()
}

fn error_fields(body: &Value) -> Vec<String> {
    body["details"]
        .as_array()
        .map(|details| {
            details
                .iter()
                .filter_map(|d| d["field"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn names(body: &Value) -> Vec<String> {
    body.as_array()
        .map(|records| {
            records
                .iter()
                .filter_map(|r| r["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

mod helpers {
    use super::*;

    pub fn make_request(method: Method, uri: &str, body: Option<Value>) -> Result<Request<Body>> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");

        let body = match body {
            Some(v) => Body::from(serde_json::to_vec(&v).context("serialize request body")?),
            None => Body::empty(),
        };

        builder.body(body).context("build request")
    }

    pub async fn send(
        router: axum::Router,
        request: Request<Body>,
    ) -> Result<(StatusCode, Value)> {
        let response = router.oneshot(request).await.map_err(|err| match err {})?;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .context("read response body")?;
        let json = serde_json::from_slice(&body).with_context(|| {
            format!(
                "parse JSON response (status={status}): {}",
                String::from_utf8_lossy(&body)
            )
        })?;
        Ok((status, json))
    }

    pub async fn get_json(router: axum::Router, uri: &str) -> Result<(StatusCode, Value)> {
        send(router, make_request(Method::GET, uri, None)?).await
    }

    pub async fn post_json(
        router: axum::Router,
        uri: &str,
        body: Value,
    ) -> Result<(StatusCode, Value)> {
        send(router, make_request(Method::POST, uri, Some(body))?).await
    }

    pub async fn delete(router: axum::Router, uri: &str) -> Result<(StatusCode, Value)> {
        send(router, make_request(Method::DELETE, uri, None)?).await
    }
}

// ============================================================================
// Superhero Query Tests
// ============================================================================

mod superheroes {
    use super::*;

    #[tokio::test]
    async fn test_power_filter_returns_wolverine_with_powers() -> Result<()> {
        let (status, body) =
            helpers::get_json(test_router(), "/api/superheroes?name=wolv&power=agility").await?;

        assert_eq!(status, StatusCode::OK);
        let records = body.as_array().context("array body")?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["id"], 1);
        assert_eq!(records[0]["name"], "Wolverine");
        assert_eq!(records[0]["powers"], json!(["Agility"]));
        Ok(())
    }

    #[tokio::test]
    async fn test_stealth_filter_excludes_wolverine() -> Result<()> {
        let (status, body) =
            helpers::get_json(test_router(), "/api/superheroes?power=Stealth").await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(names(&body), vec!["batman"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_sort_by_name_is_case_insensitive_and_stable() -> Result<()> {
        let (status, body) = helpers::get_json(test_router(), "/api/superheroes?sort=name").await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            names(&body),
            vec![
                "A-Bomb",
                "Abe Sapien",
                "Abraxas",
                "Batgirl",
                "Batgirl",
                "batman",
                "Storm",
                "Wolverine"
            ]
        );
        let batgirl_ids: Vec<&Value> = body
            .as_array()
            .context("array body")?
            .iter()
            .filter(|r| r["name"] == "Batgirl")
            .map(|r| &r["id"])
            .collect();
        assert_eq!(batgirl_ids, vec![&json!(5), &json!(7)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_limit_is_applied_after_sort() -> Result<()> {
        let (status, body) = helpers::get_json(
            test_router(),
            "/api/superheroes?publisher=marvel&sort=name&limit=2",
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(names(&body), vec!["A-Bomb", "Abraxas"]);

        let (status, body) = helpers::get_json(test_router(), "/api/superheroes?limit=0").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (_, body) = helpers::get_json(test_router(), "/api/superheroes?publisher=marvel").await?;
        assert_eq!(names(&body).len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_filter_values_are_sanitized() -> Result<()> {
        let (status, body) =
            helpers::get_json(test_router(), "/api/superheroes?name=%3Cwol%21ver%3E").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(names(&body), vec!["Wolverine"]);

        // Nothing left after stripping means no constraint.
        let (_, body) = helpers::get_json(test_router(), "/api/superheroes?race=%25%25").await?;
        assert_eq!(names(&body).len(), 8);
        Ok(())
    }

    #[tokio::test]
    async fn test_placeholders_are_omitted_from_records() -> Result<()> {
        let (status, body) = helpers::get_json(test_router(), "/api/superheroes/3").await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Abraxas");
        assert!(body.get("race").is_none());
        assert!(body.get("height").is_none());
        assert_eq!(body["powers"], json!([]));
        Ok(())
    }

    #[tokio::test]
    async fn test_every_invalid_parameter_is_reported() -> Result<()> {
        let (status, body) = helpers::get_json(
            test_router(),
            "/api/superheroes?id=99&limit=many&sort=bogus",
        )
        .await?;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_FAILED");
        assert_eq!(error_fields(&body), vec!["id", "limit", "sort"]);
        let sort_message = body["details"][2]["message"]
            .as_str()
            .context("sort message")?;
        for key in ["name", "race", "publisher", "power"] {
            assert!(sort_message.contains(key), "{sort_message}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_get_superhero_validates_id() -> Result<()> {
        let (status, body) = helpers::get_json(test_router(), "/api/superheroes/abc").await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_fields(&body), vec!["id"]);

        let (status, body) = helpers::get_json(test_router(), "/api/superheroes/8").await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_fields(&body), vec!["id"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_unreadable_dataset_is_service_unavailable() -> Result<()> {
        let dir = tempfile::tempdir().context("tempdir")?;
        let router = ServerBuilder::new()
            .debug(true)
            .catalog_source(Arc::new(JsonFileSource::in_dir(
                dir.path(),
                "superhero_info.json",
                "superhero_powers.json",
            )))
            .build()
            .test_router();

        let (status, body) = helpers::get_json(router.clone(), "/api/superheroes").await?;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "DATA_UNAVAILABLE");

        // Lists that don't need the catalog keep working.
        let (status, _) =
            helpers::post_json(router, "/api/lists", json!({ "listName": "offline" })).await?;
        assert_eq!(status, StatusCode::CREATED);
        Ok(())
    }

    #[tokio::test]
    async fn test_slow_catalog_load_times_out() -> Result<()> {
        let source = CountingSource::new(sample_source()).with_delay(Duration::from_millis(1500));
        let router = ServerBuilder::new()
            .debug(true)
            .request_timeout_secs(1)
            .catalog_source(Arc::new(source))
            .build()
            .test_router();

        let (status, body) = helpers::get_json(router, "/api/superheroes").await?;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(body["code"], "REQUEST_TIMEOUT");
        Ok(())
    }
}

// ============================================================================
// Curated List Tests
// ============================================================================

mod lists {
    use super::*;

    #[tokio::test]
    async fn test_list_lifecycle() -> Result<()> {
        let router = test_router();

        let (status, body) =
            helpers::post_json(router.clone(), "/api/lists", json!({ "listName": "ab" })).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_fields(&body), vec!["listName"]);

        let (status, body) = helpers::post_json(
            router.clone(),
            "/api/lists",
            json!({ "listName": " Team One " }),
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({ "name": "Team One", "memberIds": [] }));

        let (status, body) = helpers::post_json(
            router.clone(),
            "/api/lists",
            json!({ "listName": "Team One" }),
        )
        .await?;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");

        let members_uri = "/api/lists/Team%20One/superheroes";
        for id in [6, 1] {
            let (status, _) =
                helpers::post_json(router.clone(), members_uri, json!({ "superheroId": id }))
                    .await?;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, _) =
            helpers::post_json(router.clone(), members_uri, json!({ "superheroId": 6 })).await?;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) =
            helpers::post_json(router.clone(), members_uri, json!({ "superheroId": 8 })).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_fields(&body), vec!["superheroId"]);

        let (status, body) = helpers::get_json(router.clone(), "/api/lists/Team%20One").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([6, 1]));

        let (status, body) = helpers::get_json(router.clone(), members_uri).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(names(&body), vec!["Storm", "Wolverine"]);

        let (status, _) =
            helpers::delete(router.clone(), "/api/lists/Team%20One/superheroes/0").await?;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) =
            helpers::delete(router.clone(), "/api/lists/Team%20One/superheroes/6").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["memberIds"], json!([1]));

        let (status, body) = helpers::get_json(router.clone(), "/api/lists").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["Team One"]));

        let (status, body) = helpers::delete(router.clone(), "/api/lists/Team%20One").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "name": "Team One", "deleted": true }));

        let (status, body) = helpers::get_json(router, "/api/lists/Team%20One").await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_list_is_not_found() -> Result<()> {
        let router = test_router();

        let (status, _) = helpers::delete(router.clone(), "/api/lists/nobody").await?;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = helpers::post_json(
            router,
            "/api/lists/nobody/superheroes",
            json!({ "superheroId": 1 }),
        )
        .await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() -> Result<()> {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/lists")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"listName\": "))
            .context("build request")?;
        let (status, body) = helpers::send(test_router(), request).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");

        let (status, _) = helpers::post_json(
            test_router(),
            "/api/lists",
            json!({ "name": "missing the listName field" }),
        )
        .await?;
        assert!(status.is_client_error());
        Ok(())
    }

    #[tokio::test]
    async fn test_removing_with_non_numeric_id_is_validation_error() -> Result<()> {
        let router = test_router();
        helpers::post_json(router.clone(), "/api/lists", json!({ "listName": "squad" })).await?;

        let (status, body) = helpers::delete(router, "/api/lists/squad/superheroes/abc").await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_fields(&body), vec!["superheroId"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_member_routes_report_name_and_id_together() -> Result<()> {
        let router = test_router();

        let (status, body) = helpers::delete(router.clone(), "/api/lists/x!/superheroes/abc").await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_fields(&body), vec!["listName", "superheroId"]);

        let (status, body) = helpers::post_json(
            router,
            "/api/lists/x!/superheroes",
            json!({ "superheroId": 99999 }),
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_fields(&body), vec!["listName", "superheroId"]);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicate_adds_have_one_winner() -> Result<()> {
        let backend = Arc::new(TracingMemoryBackend::with_latency(Duration::from_millis(5)));
        let router = ServerBuilder::new()
            .debug(true)
            .catalog_source(sample())
            .list_backend(backend)
            .build()
            .test_router();
        helpers::post_json(router.clone(), "/api/lists", json!({ "listName": "race" })).await?;

        let uri = "/api/lists/race/superheroes";
        let (a, b) = tokio::join!(
            helpers::post_json(router.clone(), uri, json!({ "superheroId": 4 })),
            helpers::post_json(router.clone(), uri, json!({ "superheroId": 4 })),
        );
        let mut statuses = vec![a?.0, b?.0];
        statuses.sort();
        assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);

        let (_, body) = helpers::get_json(router, "/api/lists/race").await?;
        assert_eq!(body, json!([4]));
        Ok(())
    }

    #[tokio::test]
    async fn test_server_uses_provided_list_backend() -> Result<()> {
        let backend = Arc::new(TracingMemoryBackend::new());
        let router = ServerBuilder::new()
            .debug(true)
            .catalog_source(sample())
            .list_backend(backend.clone())
            .build()
            .test_router();

        let (status, _) =
            helpers::post_json(router, "/api/lists", json!({ "listName": "stored" })).await?;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(backend.paths().len(), 1, "expected the write on the provided backend");
        Ok(())
    }

    #[tokio::test]
    async fn test_file_backed_lists_survive_restart() -> Result<()> {
        let dir = tempfile::tempdir().context("tempdir")?;

        let first = ServerBuilder::new()
            .catalog_source(sample())
            .list_backend(Arc::new(FileBackend::open(dir.path()).await?))
            .build()
            .test_router();
        helpers::post_json(first.clone(), "/api/lists", json!({ "listName": "keepers" })).await?;
        helpers::post_json(
            first,
            "/api/lists/keepers/superheroes",
            json!({ "superheroId": 2 }),
        )
        .await?;

        let second = ServerBuilder::new()
            .catalog_source(sample())
            .list_backend(Arc::new(FileBackend::open(dir.path()).await?))
            .build()
            .test_router();
        let (status, body) = helpers::get_json(second, "/api/lists/keepers/superheroes").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(names(&body), vec!["Abe Sapien"]);
        Ok(())
    }
}

// ============================================================================
// Request ID and CORS Tests
// ============================================================================

mod middleware {
    use super::*;

    #[tokio::test]
    async fn test_errors_carry_request_id() -> Result<()> {
        let request = Request::builder()
            .uri("/api/lists/nobody")
            .header("x-request-id", "req-42")
            .body(Body::empty())
            .context("build request")?;

        let response = test_router()
            .oneshot(request)
            .await
            .map_err(|err| match err {})?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let header = response
            .headers()
            .get("x-request-id")
            .context("request id header")?;
        assert_eq!(header.to_str()?, "req-42");

        let body = axum::body::to_bytes(response.into_body(), 4096)
            .await
            .context("read response body")?;
        let body: Value = serde_json::from_slice(&body).context("parse JSON body")?;
        assert_eq!(body["requestId"], "req-42");
        Ok(())
    }

    #[tokio::test]
    async fn test_cors_disabled_by_default() -> Result<()> {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/health")
            .header("Origin", "http://localhost:3000")
            .body(Body::empty())
            .context("build request")?;

        let response = test_router()
            .oneshot(request)
            .await
            .map_err(|err| match err {})?;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            !response
                .headers()
                .contains_key("access-control-allow-origin")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_cors_preflight_request() -> Result<()> {
        let router = test_router_with_cors(vec!["*".to_string()]);

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/lists")
            .header("Origin", "http://localhost:3000")
            .header("Access-Control-Request-Method", "POST")
            .header("Access-Control-Request-Headers", "content-type")
            .body(Body::empty())
            .context("build request")?;

        let response = router.oneshot(request).await.map_err(|err| match err {})?;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .headers()
                .contains_key("access-control-allow-origin")
        );
        assert!(
            response
                .headers()
                .contains_key("access-control-allow-methods")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_cors_allows_listed_origin_only() -> Result<()> {
        let router = test_router_with_cors(vec!["http://allowed.test".to_string()]);

        let request = Request::builder()
            .uri("/health")
            .header("Origin", "http://allowed.test")
            .body(Body::empty())
            .context("build request")?;
        let response = router
            .clone()
            .oneshot(request)
            .await
            .map_err(|err| match err {})?;
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .context("allow origin header")?,
            "http://allowed.test"
        );

        let request = Request::builder()
            .uri("/health")
            .header("Origin", "http://other.test")
            .body(Body::empty())
            .context("build request")?;
        let response = router.oneshot(request).await.map_err(|err| match err {})?;
        assert!(
            !response
                .headers()
                .contains_key("access-control-allow-origin")
        );
        Ok(())
    }
}
