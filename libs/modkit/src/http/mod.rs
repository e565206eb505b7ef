//! Middleware stack shared by every HTTP-facing service.

pub mod request_id;

use std::time::Duration;

use axum::{middleware::from_fn, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

pub use request_id::XRequestId;

#[derive(Clone, Debug)]
pub struct HttpOptions {
    /// Handler deadline; when it elapses the handler future is dropped.
    pub timeout: Option<Duration>,
    pub body_limit_bytes: usize,
    pub cors_enabled: bool,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            body_limit_bytes: 1024 * 1024,
            cors_enabled: false,
        }
    }
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Adds `/health` and wraps `router` in the standard layers.
///
/// Outermost to innermost: SetRequestId -> PropagateRequestId -> Trace ->
/// request id extension -> Timeout -> CORS -> BodyLimit.
pub fn with_middleware(router: Router, opts: &HttpOptions) -> Router {
    let mut router = router
        .route("/health", get(health_check))
        .layer(RequestBodyLimitLayer::new(opts.body_limit_bytes));

    if opts.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }
    if let Some(timeout) = opts.timeout {
        router = router.layer(TimeoutLayer::new(timeout));
    }

    let x_request_id = request_id::header();
    router
        .layer(from_fn(request_id::push_req_id_to_extensions))
        .layer(request_id::trace_layer())
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, request_id::MakeReqId))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_route_is_mounted_and_request_id_is_set() {
        let app = with_middleware(Router::new(), &HttpOptions::default());

        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn incoming_request_id_is_propagated() {
        let app = with_middleware(Router::new(), &HttpOptions::default());

        let resp = app
            .oneshot(
                Request::get("/health")
                    .header("x-request-id", "req-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.headers()["x-request-id"], "req-123");
    }

    #[tokio::test]
    async fn slow_handlers_time_out() {
        let router = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let opts = HttpOptions {
            timeout: Some(Duration::from_millis(20)),
            ..Default::default()
        };

        let resp = with_middleware(router, &opts)
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::REQUEST_TIMEOUT);
    }
}
