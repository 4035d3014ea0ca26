//! HTTP router construction.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{handlers, middleware, state::AppState};

/// Build the application router.
///
/// # Route Groups
///
/// - Public: `/health`, `/ws`
/// - Administration (admin token): `/api/v1/devices*`, `/api/v1/shapes/{name}`
/// - Device (API key): `/api/v1/device/heartbeat`
pub fn build_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route(
            "/api/v1/devices",
            post(handlers::devices::create_device).get(handlers::devices::list_devices),
        )
        .route(
            "/api/v1/devices/{id}",
            get(handlers::devices::get_device)
                .patch(handlers::devices::update_device)
                .delete(handlers::devices::delete_device),
        )
        .route("/api/v1/shapes/{name}", get(handlers::shapes::get_shape))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::admin_auth,
        ));

    let device_routes = Router::new()
        .route(
            "/api/v1/device/heartbeat",
            post(handlers::heartbeat::heartbeat),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::device_auth,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ws", get(handlers::ws::ws_handler))
        .merge(admin_routes)
        .merge(device_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use axum::{
        body::Body,
        extract::ConnectInfo,
        http::{Method, Request, StatusCode, header},
    };
    use serde_json::{Value, json};
    use tokio::sync::broadcast;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::models::device::HrmDevice;
    use crate::models::shape::ShapeRegistry;
    use crate::realtime::handle::{BroadcastError, MockBroadcaster};
    use crate::realtime::{RealtimeHandle, WsHub};
    use crate::store::memory::MemoryDeviceStore;

    struct TestApp {
        router: Router,
        realtime: RealtimeHandle,
        frames: broadcast::Receiver<String>,
        org: Uuid,
    }

    async fn test_app(admin_token: Option<&str>) -> TestApp {
        let shapes = Arc::new(ShapeRegistry::new());
        let shape = shapes.define(HrmDevice::shape()).unwrap();
        let store = Arc::new(MemoryDeviceStore::new(shape));
        let org = Uuid::new_v4();
        store.register_organization(org).await;

        let hub = Arc::new(WsHub::new(16));
        let frames = hub.subscribe();
        let realtime = RealtimeHandle::new();
        realtime.init_handle(hub.clone()).unwrap();

        let state = AppState {
            store,
            shapes,
            realtime: realtime.clone(),
            hub,
            admin_token: admin_token.map(Arc::from),
        };

        TestApp {
            router: build_router(state),
            realtime,
            frames,
            org,
        }
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn heartbeat_request(api_key: &str, peer: &str) -> Request<Body> {
        let mut request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/device/heartbeat")
            .header(header::AUTHORIZATION, format!("Bearer {api_key}"))
            .body(Body::empty())
            .unwrap();
        let addr: SocketAddr = peer.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn next_frame(frames: &mut broadcast::Receiver<String>) -> Value {
        let text = frames.try_recv().expect("a realtime frame should be queued");
        serde_json::from_str(&text).unwrap()
    }

    async fn create(app: &TestApp, body: Value) -> (StatusCode, Value) {
        send(
            &app.router,
            json_request(Method::POST, "/api/v1/devices", body),
        )
        .await
    }

    #[tokio::test]
    async fn health_reports_store_and_realtime() {
        let app = test_app(None).await;

        let (status, body) = send(&app.router, empty_request(Method::GET, "/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["realtime_clients"], 1);
        assert_eq!(body["failed_broadcasts"], 0);
    }

    #[tokio::test]
    async fn create_applies_defaults_and_announces_without_key() {
        let mut app = test_app(None).await;

        let (status, body) = create(&app, json!({ "organization": app.org, "name": "reader" })).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["active"], true);
        assert_eq!(body["allowedIps"], json!([]));
        assert_eq!(body["apiKey"].as_str().unwrap().len(), 64);

        let frame = next_frame(&mut app.frames);
        assert_eq!(frame["event"], "device.created");
        assert_eq!(frame["payload"]["id"], body["id"]);
        assert!(frame["payload"].get("apiKey").is_none());
    }

    #[tokio::test]
    async fn duplicate_api_key_conflicts() {
        let app = test_app(None).await;
        let body = json!({ "organization": app.org, "name": "reader", "apiKey": "shared" });

        let (first, _) = create(&app, body.clone()).await;
        let (second, error) = create(&app, json!({ "organization": app.org, "name": "other", "apiKey": "shared" })).await;

        assert_eq!(first, StatusCode::CREATED);
        assert_eq!(second, StatusCode::CONFLICT);
        assert_eq!(error["error"]["code"], "conflict");
    }

    #[tokio::test]
    async fn unknown_organization_is_unprocessable() {
        let app = test_app(None).await;

        let (status, body) = create(&app, json!({ "organization": Uuid::new_v4(), "name": "reader" })).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "unknown_reference");
    }

    #[tokio::test]
    async fn empty_name_is_rejected() {
        let app = test_app(None).await;

        let (status, body) = create(&app, json!({ "organization": app.org, "name": "" })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_request");
    }

    #[tokio::test]
    async fn get_hides_api_key_and_404s_for_unknown_ids() {
        let app = test_app(None).await;
        let (_, created) = create(&app, json!({ "organization": app.org, "name": "reader" })).await;
        let id = created["id"].as_str().unwrap();

        let (status, body) = send(
            &app.router,
            empty_request(Method::GET, &format!("/api/v1/devices/{id}")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "reader");
        assert!(body.get("apiKey").is_none());

        let (status, body) = send(
            &app.router,
            empty_request(Method::GET, &format!("/api/v1/devices/{}", Uuid::new_v4())),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "device_not_found");
    }

    #[tokio::test]
    async fn list_returns_devices_of_the_organization() {
        let app = test_app(None).await;
        create(&app, json!({ "organization": app.org, "name": "a" })).await;
        create(&app, json!({ "organization": app.org, "name": "b" })).await;

        let (status, body) = send(
            &app.router,
            empty_request(Method::GET, &format!("/api/v1/devices?organization={}", app.org)),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_changes_fields_and_announces() {
        let mut app = test_app(None).await;
        let (_, created) = create(&app, json!({ "organization": app.org, "name": "reader" })).await;
        next_frame(&mut app.frames);
        let id = created["id"].as_str().unwrap();

        let (status, body) = send(
            &app.router,
            json_request(
                Method::PATCH,
                &format!("/api/v1/devices/{id}"),
                json!({ "active": false, "allowedIps": ["10.0.0.1"] }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active"], false);
        assert_eq!(body["allowedIps"], json!(["10.0.0.1"]));
        assert_eq!(body["name"], "reader");

        let frame = next_frame(&mut app.frames);
        assert_eq!(frame["event"], "device.updated");
        assert_eq!(frame["payload"]["active"], false);
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let app = test_app(None).await;
        let (_, created) = create(&app, json!({ "organization": app.org, "name": "reader" })).await;
        let id = created["id"].as_str().unwrap();

        let (status, _) = send(
            &app.router,
            json_request(Method::PATCH, &format!("/api/v1/devices/{id}"), json!({})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_then_missing() {
        let mut app = test_app(None).await;
        let (_, created) = create(&app, json!({ "organization": app.org, "name": "reader" })).await;
        next_frame(&mut app.frames);
        let uri = format!("/api/v1/devices/{}", created["id"].as_str().unwrap());

        let (status, _) = send(&app.router, empty_request(Method::DELETE, &uri)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(next_frame(&mut app.frames)["event"], "device.deleted");

        let (status, _) = send(&app.router, empty_request(Method::DELETE, &uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn shape_is_served_by_name() {
        let app = test_app(None).await;

        let (status, body) = send(
            &app.router,
            empty_request(Method::GET, "/api/v1/shapes/HrmDevice"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "HrmDevice");
        assert_eq!(body["fields"][2]["name"], "apiKey");
        assert_eq!(body["fields"][2]["unique"], true);

        let (status, _) = send(&app.router, empty_request(Method::GET, "/api/v1/shapes/Nope")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn admin_token_is_enforced_when_configured() {
        let app = test_app(Some("s3cret")).await;
        let body = json!({ "organization": app.org, "name": "reader" });

        let (status, error) = create(&app, body.clone()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error["error"]["code"], "unauthorized");

        let mut wrong = json_request(Method::POST, "/api/v1/devices", body.clone());
        wrong
            .headers_mut()
            .insert(header::AUTHORIZATION, "Bearer nope".parse().unwrap());
        assert_eq!(send(&app.router, wrong).await.0, StatusCode::UNAUTHORIZED);

        let mut right = json_request(Method::POST, "/api/v1/devices", body);
        right
            .headers_mut()
            .insert(header::AUTHORIZATION, "Bearer s3cret".parse().unwrap());
        assert_eq!(send(&app.router, right).await.0, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn heartbeat_authenticates_by_api_key() {
        let mut app = test_app(None).await;
        create(&app, json!({ "organization": app.org, "name": "reader", "apiKey": "device-key" })).await;
        next_frame(&mut app.frames);

        let (status, body) = send(&app.router, heartbeat_request("device-key", "192.0.2.1:5000")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "reader");
        assert_eq!(body["organization"], json!(app.org));
        assert_eq!(next_frame(&mut app.frames)["event"], "device.heartbeat");
    }

    #[tokio::test]
    async fn heartbeat_rejects_unknown_key() {
        let app = test_app(None).await;

        let (status, body) = send(&app.router, heartbeat_request("missing", "192.0.2.1:5000")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "invalid_api_key");
    }

    #[tokio::test]
    async fn heartbeat_rejects_inactive_device() {
        let app = test_app(None).await;
        create(
            &app,
            json!({ "organization": app.org, "name": "reader", "apiKey": "k", "active": false }),
        )
        .await;

        let (status, body) = send(&app.router, heartbeat_request("k", "192.0.2.1:5000")).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "device_inactive");
    }

    #[tokio::test]
    async fn heartbeat_enforces_allowed_ips() {
        let app = test_app(None).await;
        create(
            &app,
            json!({
                "organization": app.org,
                "name": "reader",
                "apiKey": "k",
                "allowedIps": ["10.0.0.7"]
            }),
        )
        .await;

        let (status, body) = send(&app.router, heartbeat_request("k", "10.0.0.8:5000")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "ip_not_allowed");

        let (status, _) = send(&app.router, heartbeat_request("k", "10.0.0.7:5000")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn failing_broadcaster_does_not_affect_requests() {
        let app = test_app(None).await;
        let mut failing = MockBroadcaster::new();
        failing
            .expect_emit()
            .returning(|_, _| Err(BroadcastError::Transport("down".to_string())));
        app.realtime.set_handle(Arc::new(failing));

        let (status, _) = create(&app, json!({ "organization": app.org, "name": "reader" })).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(app.realtime.failed_broadcasts(), 1);

        let (_, health) = send(&app.router, empty_request(Method::GET, "/health")).await;
        assert_eq!(health["failed_broadcasts"], 1);
    }
}
