//! Admin API: reference data and status, behind a bearer key.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::portal::Portal;

pub fn router(portal: Portal) -> Router<Portal> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/courses", post(create_course))
        .route("/admin/semesters", post(create_semester))
        .route("/admin/rooms", post(create_room))
        .route("/admin/events", post(create_event))
        .route_layer(middleware::from_fn_with_state(portal, admin_auth_middleware))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::PortalConfig;
    use crate::db::MemoryStore;
    use crate::http::build_router;
    use crate::portal::Portal;

    const KEY: &str = "test-admin-key";

    fn admin_router() -> axum::Router {
        let mut config = PortalConfig::default();
        config.admin.enabled = true;
        config.admin.api_key = KEY.to_string();
        let portal = Portal::new(Arc::new(MemoryStore::new()), None, Arc::new(config));
        build_router(portal)
    }

    fn post(uri: &str, key: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::post(uri).header("content-type", "application/json");
        if let Some(key) = key {
            builder = builder.header("authorization", format!("Bearer {}", key));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_admin_requires_bearer_key() {
        let router = admin_router();
        let room = json!({"name": "Lab 1", "capacity": 20});

        let response = router
            .clone()
            .oneshot(post("/admin/rooms", None, room.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router
            .clone()
            .oneshot(post("/admin/rooms", Some("wrong"), room.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router
            .oneshot(post("/admin/rooms", Some(KEY), room))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["room"]["name"], "Lab 1");
    }

    #[tokio::test]
    async fn test_admin_validation_is_bad_request() {
        let response = admin_router()
            .oneshot(post(
                "/admin/events",
                Some(KEY),
                json!({
                    "title": "Backwards",
                    "starts_at": "2030-01-02T10:00:00Z",
                    "ends_at": "2030-01-02T09:00:00Z",
                    "capacity": 10
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_admin_status_reports_store() {
        let request = Request::get("/admin/status")
            .header("authorization", format!("Bearer {}", KEY))
            .body(Body::empty())
            .unwrap();
        let response = admin_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["ledger"], Value::Null);
        assert_eq!(body["health"]["blockchain"], "disabled");
    }
}
