use crate::dns::DnsResolver;
use crate::runner::ToolRunner;
use crate::scan;
use axum::extract::{Extension, Json};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

// region:        --- Router & state

pub struct AppState {
    pub runner: Arc<dyn ToolRunner>,
    pub dns_resolver: DnsResolver,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/find-subdomains", post(find_subdomains))
        .route("/health", get(health))
        .layer(Extension(state))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

// endregion:     --- Router & state

// region:        --- Handlers

#[derive(Debug, Deserialize)]
struct FindSubdomainsRequest {
    #[serde(default)]
    domain: String,
}

async fn find_subdomains(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<FindSubdomainsRequest>,
) -> Response {
    if payload.domain.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Domain is required" })),
        )
            .into_response();
    }

    info!("{:12} - {:?}", "RECEIVED", payload.domain);
    match scan::enumerate(state.runner.as_ref(), &state.dns_resolver, &payload.domain).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => {
            error!("{:12} - {:?}", "ENUMERATION", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string(), "logs": "" })),
            )
                .into_response()
        }
    }
}

async fn health() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

/// Panics escaping a handler become an opaque 500, the detail stays in the
/// logs.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = err.downcast_ref::<String>() {
        message.as_str()
    } else if let Some(message) = err.downcast_ref::<&str>() {
        message
    } else {
        "unknown panic"
    };
    error!("{:12} - handler panicked: {}", "PANIC", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal Server Error" })),
    )
        .into_response()
}

// endregion:     --- Handlers

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns;
    use crate::runner::{ToolError, ToolOutput};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::util::ServiceExt;

    struct CannedRunner(core::result::Result<String, ToolError>);

    #[async_trait]
    impl ToolRunner for CannedRunner {
        async fn run(&self, _domain: &str) -> core::result::Result<ToolOutput, ToolError> {
            match &self.0 {
                Ok(logs) => Ok(ToolOutput { logs: logs.clone() }),
                Err(err) => Err(err.clone()),
            }
        }
    }

    fn test_app(runner_result: core::result::Result<String, ToolError>) -> Router {
        let state = Arc::new(AppState {
            runner: Arc::new(CannedRunner(runner_result)),
            dns_resolver: dns::new_resolver(),
        });
        app(state)
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/find-subdomains")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_works() {
        let app = test_app(Ok(String::new()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_domain_is_rejected() {
        let app = test_app(Ok(String::new()));

        let response = app.oneshot(post_json("{}")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Domain is required");
    }

    #[tokio::test]
    async fn empty_domain_is_rejected() {
        let app = test_app(Ok(String::new()));

        let response = app.oneshot(post_json(r#"{"domain": ""}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Domain is required");
    }

    #[tokio::test]
    async fn missing_dependencies_surface_as_server_error() {
        let app = test_app(Err(ToolError::MissingDependencies(vec![
            "Python is not found in system PATH.".to_string(),
            "Sublist3r is not installed or not found.".to_string(),
        ])));

        let response = app
            .oneshot(post_json(r#"{"domain": "example.com"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(
            body["error"],
            "Python is not found in system PATH.; Sublist3r is not installed or not found."
        );
        assert_eq!(body["logs"], "");
        assert!(body.get("subdomains").is_none());
    }

    #[tokio::test]
    async fn tool_output_is_parsed_resolved_and_echoed() {
        let logs = "example.com - 1.2.3.4\nEnumerating subdomains now\nsub.example.com\n";
        let app = test_app(Ok(logs.to_string()));

        let response = app
            .oneshot(post_json(r#"{"domain": "example.com"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["logs"], logs);

        let subdomains = body["subdomains"].as_array().unwrap();
        assert_eq!(subdomains.len(), 2);
        assert_eq!(subdomains[0]["subdomain"], "example.com - 1.2.3.4");
        assert_eq!(subdomains[0]["ip"], "Unknown");
        assert_eq!(subdomains[1]["subdomain"], "sub.example.com");
        assert!(!subdomains[1]["ip"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_candidates_stay_duplicated() {
        let logs = "a.example.invalid\na.example.invalid\n";
        let app = test_app(Ok(logs.to_string()));

        let response = app
            .oneshot(post_json(r#"{"domain": "example.invalid"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let subdomains = body["subdomains"].as_array().unwrap();
        assert_eq!(subdomains.len(), 2);
        assert_eq!(subdomains[0]["subdomain"], subdomains[1]["subdomain"]);
    }
}
