//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the axum router for the portal and admin routes
//! - Wire up middleware (request id, tracing, limits, CORS, security headers)
//! - Serve plain HTTP or TLS until the shutdown signal fires

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::{get, post},
    Router,
};
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::config::TlsConfig;
use crate::http::handlers;
use crate::http::middleware::{
    cors_layer, request_timeout, security_headers, track_metrics, X_REQUEST_ID,
};
use crate::http::response::not_found;
use crate::http::tls::load_tls_config;
use crate::portal::Portal;

/// Grace period for in-flight TLS connections after shutdown is triggered.
const TLS_DRAIN_SECS: u64 = 10;

/// HTTP server for the portal.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(portal: Portal) -> Self {
        Self {
            router: build_router(portal),
        }
    }

    /// Serve plain HTTP on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: &TlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> io::Result<()> {
        let rustls = load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?;
        let handle = axum_server::Handle::new();

        let signal = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            signal.graceful_shutdown(Some(Duration::from_secs(TLS_DRAIN_SECS)));
        });

        tracing::info!(address = %addr, "HTTPS server starting");
        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Build the router with all middleware layers.
pub fn build_router(portal: Portal) -> Router {
    let config = portal.config().clone();

    let mut routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/register", post(handlers::register_user))
        .route("/api/faculty/register", post(handlers::register_faculty))
        .route("/api/faculty/{faculty_id}/grades", post(handlers::assign_grade))
        .route("/api/course", post(handlers::register_course))
        .route("/api/certificate", post(handlers::issue_certificate))
        .route("/api/fees", post(handlers::pay_fees))
        .route("/api/metadata/identity/{user_id}", get(handlers::identity_metadata))
        .route("/api/metadata/faculty/{faculty_id}", get(handlers::faculty_metadata))
        .route(
            "/api/metadata/certificate/{user_id}/{course_id}",
            get(handlers::certificate_metadata),
        )
        .route(
            "/api/metadata/fee/{user_id}/{semester_id}",
            get(handlers::fee_metadata),
        )
        .route("/api/metadata/booking/{booking_id}", get(handlers::booking_metadata))
        .route("/api/users/{user_id}", get(handlers::user_profile))
        .route("/api/users/{user_id}/courses", get(handlers::user_courses))
        .route("/api/users/{user_id}/certificates", get(handlers::user_certificates))
        .route("/api/users/{user_id}/fees", get(handlers::user_fees))
        .route("/api/users/{user_id}/transactions", get(handlers::user_transactions))
        .route("/api/courses", get(handlers::list_courses))
        .route("/api/courses/{course_id}", get(handlers::get_course))
        .route("/api/semesters", get(handlers::list_semesters))
        .route("/api/rooms", get(handlers::list_rooms))
        .route("/api/rooms/{room_id}/book", post(handlers::book_room))
        .route("/api/rooms/{room_id}/bookings", get(handlers::room_bookings))
        .route("/api/events", get(handlers::list_events))
        .route("/api/events/{event_id}/join", post(handlers::join_event))
        .fallback(not_found);

    if config.admin.enabled {
        routes = routes.merge(admin::router(portal.clone()));
    }

    let mut router = routes
        .layer(middleware::from_fn(track_metrics))
        .with_state(portal);

    if config.security.enable_headers {
        for (name, value) in security_headers() {
            router = router.layer(SetResponseHeaderLayer::if_not_present(name, value));
        }
    }

    router
        .layer(cors_layer(config.security.cors_permissive))
        .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
        .layer(middleware::from_fn_with_state(
            Duration::from_secs(config.timeouts.request_secs),
            request_timeout,
        ))
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(&X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::testing::portal_without_chain;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_unknown_route_returns_json_404() {
        let (portal, _) = portal_without_chain();
        let request = Request::get("/nope").body(Body::empty()).unwrap();
        let (status, headers, body) = send(build_router(portal), request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"success": false, "error": "Page not found."}));
        assert!(headers.contains_key("x-request-id"));
        assert_eq!(headers["x-content-type-options"], "nosniff");
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let (portal, _) = portal_without_chain();
        let request = Request::get("/health")
            .header("x-request-id", "abc-123")
            .body(Body::empty())
            .unwrap();
        let (status, headers, body) = send(build_router(portal), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["x-request-id"], "abc-123");
        assert_eq!(body["database"], "up");
    }

    #[tokio::test]
    async fn test_register_then_read_profile() {
        let (portal, _) = portal_without_chain();
        let router = build_router(portal);

        let (status, _, body) = send(
            router.clone(),
            post_json(
                "/api/register",
                json!({"roll_number": "EE-7", "name": "Hedy Lamarr", "email": "hedy@example.edu"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let user_id = body["user"]["user_id"].as_i64().unwrap();

        let request = Request::get(format!("/api/users/{}", user_id))
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "hedy@example.edu");
    }

    #[tokio::test]
    async fn test_malformed_body_uses_error_envelope() {
        let (portal, _) = portal_without_chain();
        let (status, _, body) = send(
            build_router(portal),
            post_json("/api/fees", json!({"user_id": "one"})),
        )
        .await;

        assert!(status.is_client_error());
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_admin_routes_absent_when_disabled() {
        let (portal, _) = portal_without_chain();
        let request = Request::get("/admin/status").body(Body::empty()).unwrap();
        let (status, _, _) = send(build_router(portal), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
