use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use storefront_api::{
    config::AppConfig,
    db,
    events,
    handlers::AppServices,
    AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

/// Test harness: a migrated sqlite database in a temp directory plus the
/// full router, driven through `tower::ServiceExt::oneshot`.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _tmp: tempfile::TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Construct a test application, letting the caller adjust the config
    /// (e.g. payment keys) before services are built.
    pub async fn with_config<F: FnOnce(&mut AppConfig)>(adjust: F) -> Self {
        let tmp = tempfile::tempdir().expect("failed to create temp dir");
        let db_path = tmp.path().join("storefront_test.db");
        let database_url = format!("sqlite://{}?mode=rwc", db_path.display());

        let mut cfg = AppConfig::new(database_url, "127.0.0.1", 0, "test");
        // A single connection serializes sqlite access in tests.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        let db_pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to connect to test database");
        db::run_migrations(&db_pool)
            .await
            .expect("failed to migrate test database");
        let db_arc = Arc::new(db_pool);

        let (event_sender, event_rx) = events::channel(64);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db_arc.clone(), Arc::new(event_sender.clone()), &cfg);
        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = Router::new()
            .nest("/api", storefront_api::api_routes())
            .with_state(state.clone());

        Self {
            router,
            state,
            _tmp: tmp,
            _event_task: event_task,
        }
    }

    /// Sends one request through the router and returns (status, JSON body).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("failed to build request"))
            .await
            .expect("request failed");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to read body")
            .to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, None).await
    }

    /// Seeds a category through the API and returns its id.
    pub async fn seed_category(&self, name: &str) -> Uuid {
        let (status, body) = self
            .post("/api/categories", json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::OK, "seeding category failed: {body}");
        parse_id(&body)
    }

    /// Seeds a product through the API and returns its id.
    pub async fn seed_product(
        &self,
        name: &str,
        price: Decimal,
        category_id: Option<Uuid>,
        featured: bool,
    ) -> Uuid {
        let (status, body) = self
            .post(
                "/api/products",
                json!({
                    "name": name,
                    "price": price,
                    "categoryId": category_id,
                    "featured": featured,
                    "stock": 10,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "seeding product failed: {body}");
        parse_id(&body)
    }
}

/// Pulls the `id` field out of a JSON response body.
pub fn parse_id(body: &Value) -> Uuid {
    body["id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(|| panic!("response has no id: {body}"))
}
