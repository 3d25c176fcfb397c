use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::handlers::{self, properties, requirements, users};
use crate::middleware::{require_identity, TOTAL_COUNT_HEADER};
use crate::state::AppState;

/// Full router: service endpoints at the root, resources under `/api/v1`.
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let api = Router::new()
        .merge(property_routes())
        .merge(requirement_routes())
        .merge(user_routes())
        .layer(middleware::from_fn_with_state(state.clone(), require_identity));

    let mut router = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .nest("/api/v1", api)
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            content_security_policy(&config.security),
        ));

    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security));
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn property_routes() -> Router<AppState> {
    Router::new()
        .route("/properties", get(properties::list).post(properties::create))
        .route("/properties/five", get(properties::latest))
        .route(
            "/properties/:id",
            get(properties::get)
                .patch(properties::update)
                .delete(properties::delete),
        )
}

fn requirement_routes() -> Router<AppState> {
    Router::new()
        .route("/requirement", get(requirements::list).post(requirements::create))
        .route("/requirement/five", get(requirements::latest))
        .route(
            "/requirement/:id",
            get(requirements::get)
                .patch(requirements::update)
                .delete(requirements::delete),
        )
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(users::list).post(users::create))
        .route("/users/login", post(users::login))
        .route("/users/update", post(users::update))
        .route("/users/:id", get(users::get).delete(users::delete))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let expose = [HeaderName::from_static(TOTAL_COUNT_HEADER)];
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter(|o| o.as_str() != "*")
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() || security.cors_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers(expose)
}

fn content_security_policy(security: &SecurityConfig) -> HeaderValue {
    let mut policy = String::from("frame-ancestors 'self'");
    for ancestor in &security.frame_ancestors {
        policy.push(' ');
        policy.push_str(ancestor);
    }
    HeaderValue::from_str(&policy).unwrap_or_else(|_| {
        tracing::warn!("Invalid frame ancestors {:?}, using 'self' only", security.frame_ancestors);
        HeaderValue::from_static("frame-ancestors 'self'")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{HeaderMap, Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::database::{FailPoint, MemoryStore};
    use crate::testing::{property_input, seed_user, test_state, FakeMedia, StaticIdentity};

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, headers, body)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_req(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn open_state(store: &MemoryStore) -> AppState {
        test_state(store.clone(), FakeMedia::new(), StaticIdentity::new(), false)
    }

    #[tokio::test]
    async fn root_and_health() {
        let store = MemoryStore::new();
        let router = app(open_state(&store));

        let (status, headers, body) = send(router.clone(), get_req("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Hello From BrickBix!"}));
        assert_eq!(
            headers[header::CONTENT_SECURITY_POLICY],
            "frame-ancestors 'self' https://accounts.google.com"
        );

        let (status, _, body) = send(router, get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok", "database": "ok"}));
    }

    #[tokio::test]
    async fn unhealthy_store_is_reported_without_driver_detail() {
        let store = MemoryStore::new();
        store.fail_on(FailPoint::HealthCheck).await;
        let router = app(open_state(&store));

        let (status, _, body) = send(router.clone(), get_req("/health")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body,
            json!({"status": "degraded", "database": "unavailable", "database_error": "database unreachable"})
        );
        assert!(!body.to_string().contains("Connection refused"));

        let (status, _, _) = send(router, get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn list_exposes_total_count() {
        let store = MemoryStore::new();
        seed_user(&store, "owner@x.com").await.unwrap();
        let router = app(open_state(&store));
        for _ in 0..3 {
            let body = serde_json::to_value(property_input("owner@x.com")).unwrap();
            let (status, _, _) = send(router.clone(), json_req(Method::POST, "/api/v1/properties", body)).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, headers, body) = send(router, get_req("/api/v1/properties?_start=0&_end=2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[TOTAL_COUNT_HEADER], "3");
        assert_eq!(body.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn bad_query_and_body_are_rejected() {
        let store = MemoryStore::new();
        let router = app(open_state(&store));

        let (status, _, body) = send(router.clone(), get_req("/api/v1/properties?_sort=secret")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], true);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/properties")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _, body) = send(router.clone(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_JSON");

        let (status, _, body) = send(router, get_req("/api/v1/properties/not-an-id")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid property ID format");
    }

    #[tokio::test]
    async fn oversized_body_is_413() {
        let store = MemoryStore::new();
        let mut state = open_state(&store);
        let mut config = (*state.config).clone();
        config.api.max_request_size_bytes = 64;
        state.config = Arc::new(config);

        let body = json!({"name": "x".repeat(200), "email": "big@x.com"});
        let (status, _, _) = send(app(state), json_req(Method::POST, "/api/v1/users", body)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(store.user_count().await, 0);
    }

    #[tokio::test]
    async fn mutations_require_bearer_when_enforced() {
        let store = MemoryStore::new();
        seed_user(&store, "owner@x.com").await.unwrap();
        let identity = StaticIdentity::new()
            .with_user("tok-owner", "owner@x.com", "Owner")
            .with_user("tok-other", "other@x.com", "Other");
        let router = app(test_state(store.clone(), FakeMedia::new(), identity, true));
        let body = serde_json::to_value(property_input("owner@x.com")).unwrap();

        let (status, _, _) = send(router.clone(), json_req(Method::POST, "/api/v1/properties", body.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let mut request = json_req(Method::POST, "/api/v1/properties", body.clone());
        request.headers_mut().insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok-other"));
        let (status, _, _) = send(router.clone(), request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let mut request = json_req(Method::POST, "/api/v1/properties", body);
        request.headers_mut().insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok-owner"));
        let (status, _, _) = send(router.clone(), request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(store.property_count().await, 1);

        // reads and account bootstrap stay open
        let (status, _, _) = send(router.clone(), get_req("/api/v1/properties")).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _, _) = send(
            router,
            json_req(Method::POST, "/api/v1/users", json!({"name": "New", "email": "new@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn users_post_reports_created_or_existing() {
        let store = MemoryStore::new();
        let router = app(open_state(&store));
        let body = json!({"name": "Asha", "email": "asha@x.com"});

        let (status, _, created) = send(router.clone(), json_req(Method::POST, "/api/v1/users", body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _, existing) = send(router, json_req(Method::POST, "/api/v1/users", body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["_id"], existing["_id"]);
    }

    #[test]
    fn cors_origin_list_is_parsed() {
        let mut security = crate::config::AppConfig::production().security;
        security.cors_origins = vec!["https://brickbix.in".into(), "bad\norigin".into()];
        // invalid origins are skipped rather than failing start-up
        let _layer = cors_layer(&security);
        assert_eq!(
            content_security_policy(&security),
            "frame-ancestors 'self' https://accounts.google.com"
        );
    }
}
