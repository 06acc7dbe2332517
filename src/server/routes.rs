// file: src/server/routes.rs
// description: api route table with cors, tracing and body limit layers
// reference: https://docs.rs/axum/latest/axum/struct.Router.html

use crate::server::AppState;
use crate::server::handlers;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.allowed_origin);
    let body_limit = state.config.max_upload_bytes();

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/repo/sync", post(handlers::sync_repository))
        .route("/api/repo/{repo}/commit", post(handlers::commit))
        .route("/api/branches/{repo}", get(handlers::list_branches))
        .route("/api/status/{repo}", get(handlers::repository_status))
        .route("/api/branch/{repo}/switch", post(handlers::switch_branch))
        .route("/api/files/{repo}", get(handlers::list_files))
        .route(
            "/api/file/{repo}/{*path}",
            get(handlers::read_file)
                .put(handlers::write_file)
                .post(handlers::create_file)
                .delete(handlers::delete_file),
        )
        .route("/api/image/{repo}/{*path}", get(handlers::read_image))
        .route(
            "/api/folder/{repo}/{*path}",
            post(handlers::create_folder).delete(handlers::delete_folder),
        )
        .route("/api/upload/{repo}", post(handlers::upload_to_root))
        .route("/api/upload/{repo}/{*path}", post(handlers::upload_file))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// `*` allows any origin; anything else must be a single valid origin.
fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed_origin.trim() == "*" {
        return layer.allow_origin(Any);
    }

    match HeaderValue::from_str(allowed_origin.trim()) {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            warn!(
                "Ignoring invalid allowed_origin {:?}: {}; cross-origin requests will be refused",
                allowed_origin, e
            );
            layer
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::repository::IdentityResolver;
    use crate::repository::test_support::LocalRemote;
    use crate::workflow::SyncOrchestrator;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct TestApp {
        _temp: TempDir,
        remote: LocalRemote,
        app: Router,
    }

    fn test_app() -> TestApp {
        let temp = TempDir::new().unwrap();
        let remote = LocalRemote::create(temp.path());
        let config = Config::default_config();
        let orchestrator = SyncOrchestrator::new(
            temp.path().join("storage"),
            IdentityResolver::fixed("ada"),
            config.git.clone(),
        );
        let app = router(AppState::new(config, orchestrator));
        TestApp {
            _temp: temp,
            remote,
            app,
        }
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let (status, bytes) = send(app, request).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn synced_app() -> TestApp {
        let test = test_app();
        let (status, body) = send_json(
            &test.app,
            json_request(
                "POST",
                "/api/repo/sync",
                json!({"repoUrl": test.remote.url(), "token": "secret-token"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["repoPath"], json!("origin"));
        assert_eq!(body["identity"], json!("ada"));
        test
    }

    #[tokio::test]
    async fn test_sync_without_token_is_bad_request() {
        let test = test_app();
        let (status, body) = send_json(
            &test.app,
            json_request(
                "POST",
                "/api/repo/sync",
                json!({"repoUrl": "https://github.com/org/repo.git"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Access token is required"}));
    }

    #[tokio::test]
    async fn test_empty_sync_body_still_requires_token() {
        let test = test_app();
        let (status, body) =
            send_json(&test.app, json_request("POST", "/api/repo/sync", json!({}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Access token is required"}));
    }

    #[tokio::test]
    async fn test_rejected_bodies_are_json_errors() {
        let test = test_app();

        let truncated = Request::builder()
            .method("POST")
            .uri("/api/repo/notes/commit")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{"))
            .unwrap();
        let (status, body) = send_json(&test.app, truncated).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("Invalid argument: Malformed request body")
        );

        let untyped = Request::builder()
            .method("POST")
            .uri("/api/branch/notes/switch")
            .body(Body::from(r#"{"branch":"main"}"#))
            .unwrap();
        let (status, body) = send_json(&test.app, untyped).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = send_json(
            &test.app,
            json_request("PUT", "/api/file/notes/a.md", json!({"content": 42})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = send_json(
            &test.app,
            json_request("POST", "/api/upload/notes", json!({"file": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("Invalid argument: Malformed upload")
        );
    }

    #[tokio::test]
    async fn test_unsynced_repository_is_not_found() {
        let test = test_app();
        let (status, body) = send_json(&test.app, empty_request("GET", "/api/files/notes")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("notes"));
    }

    #[tokio::test]
    async fn test_edit_and_commit_flow() {
        let test = synced_app().await;
        let app = &test.app;

        let (status, files) = send_json(app, empty_request("GET", "/api/files/origin")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(files, json!([{"path": "README.md", "type": "file"}]));

        let (status, _) = send_json(
            app,
            json_request("PUT", "/api/file/origin/hello.md", json!({"content": "# Hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send_json(app, empty_request("GET", "/api/file/origin/hello.md")).await;
        assert_eq!(body, json!({"content": "# Hi"}));

        let (_, status_body) = send_json(app, empty_request("GET", "/api/status/origin")).await;
        assert_eq!(status_body, json!([{"file": "hello.md", "status": "added"}]));

        let (status, body) = send_json(
            app,
            json_request(
                "POST",
                "/api/repo/origin/commit",
                json!({"message": "test", "token": "secret-token", "repoUrl": test.remote.url()}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["branch"], json!("main"));

        let (_, status_body) = send_json(app, empty_request("GET", "/api/status/origin")).await;
        assert_eq!(status_body, json!([]));

        let (_, body) = send_json(
            app,
            json_request(
                "POST",
                "/api/repo/origin/commit",
                json!({"token": "secret-token", "repoUrl": test.remote.url()}),
            ),
        )
        .await;
        assert_eq!(
            body,
            json!({"success": true, "message": "No changes to commit"})
        );
    }

    #[tokio::test]
    async fn test_file_error_statuses() {
        let test = synced_app().await;
        let app = &test.app;

        let (status, _) =
            send_json(app, empty_request("GET", "/api/file/origin/../secret.md")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send_json(app, empty_request("GET", "/api/file/origin/.git/config")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send_json(app, empty_request("GET", "/api/file/origin/missing.md")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send_json(app, empty_request("POST", "/api/file/origin/README.md")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            send_json(app, empty_request("DELETE", "/api/file/origin/missing.md")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) =
            send_json(app, empty_request("DELETE", "/api/folder/origin/README.md")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send_json(app, empty_request("POST", "/api/folder/origin/docs")).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send_json(app, empty_request("POST", "/api/folder/origin/docs")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_file_with_and_without_body() {
        let test = synced_app().await;
        let app = &test.app;

        let (status, _) = send_json(app, empty_request("POST", "/api/file/origin/empty.md")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send_json(
            app,
            json_request("POST", "/api/file/origin/notes/first.md", json!({"content": "one"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) =
            send_json(app, empty_request("GET", "/api/file/origin/notes/first.md")).await;
        assert_eq!(body, json!({"content": "one"}));
        let (_, body) = send_json(app, empty_request("GET", "/api/file/origin/empty.md")).await;
        assert_eq!(body, json!({"content": ""}));
    }

    #[tokio::test]
    async fn test_upload_then_read_image() {
        let test = synced_app().await;
        let app = &test.app;

        let multipart = concat!(
            "--BOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"file\"; filename=\"pic.png\"\r\n",
            "Content-Type: image/png\r\n\r\n",
            "PNGDATA\r\n",
            "--BOUNDARY--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/upload/origin/assets")
            .header(
                header::CONTENT_TYPE,
                "multipart/form-data; boundary=BOUNDARY",
            )
            .body(Body::from(multipart))
            .unwrap();

        let (status, body) = send_json(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true, "filename": "pic.png"}));

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/api/image/origin/assets/pic.png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/png"
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"PNGDATA");

        let (status, _) =
            send_json(app, empty_request("GET", "/api/image/origin/assets/none.png")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_without_file_field() {
        let test = synced_app().await;

        let multipart = concat!(
            "--BOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"note\"\r\n\r\n",
            "hello\r\n",
            "--BOUNDARY--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/upload/origin")
            .header(
                header::CONTENT_TYPE,
                "multipart/form-data; boundary=BOUNDARY",
            )
            .body(Body::from(multipart))
            .unwrap();

        let (status, body) = send_json(&test.app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Invalid argument: No file uploaded"}));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let test = test_app();
        let (status, body) = send_json(&test.app, empty_request("GET", "/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("healthy"));
        assert_eq!(body["identity"], json!("ada"));
    }
}
