use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use tradebook_api::{
    auth::AuthService,
    config::AppConfig,
    db,
    entities::{customer, organization, organization_settings, product, user},
    events::{self, EventSender},
    handlers::AppServices,
    notifications::{LogMailer, SharedMailer},
    services::{AlertService, DocumentService, SnoozeService, StockLedger},
    AppState,
};

/// Harness spinning up the full application over a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    token: String,
    _event_task: tokio::task::JoinHandle<()>,
    _db_dir: TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_mailer(Arc::new(LogMailer)).await
    }

    /// Same as [`TestApp::new`] but with a caller-supplied mailer, so tests
    /// can capture outbound email.
    pub async fn with_mailer(mailer: SharedMailer) -> Self {
        let db_dir = TempDir::new().expect("create temp dir for test database");
        let db_path = db_dir.path().join("tradebook_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.alert_stream_interval_secs = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);

        let stock = StockLedger::new(cfg.allow_negative_stock);
        let alerts = AlertService::new(db.clone(), mailer);
        let documents = DocumentService::new(db.clone(), stock, Some(event_sender.clone()));
        let snoozes = SnoozeService::new(db.clone());
        let auth = Arc::new(AuthService::new(cfg.jwt_secret.clone(), db.clone()));

        let event_task = tokio::spawn(events::process_events(
            event_rx,
            Arc::new(alerts.clone()),
        ));

        let services = AppServices {
            documents,
            alerts,
            snoozes,
        };

        let state = AppState {
            db,
            config: cfg,
            auth: auth.clone(),
            event_sender,
            services,
        };

        let (organization_id, user_id) = seed_identity(&state).await;
        let token = auth
            .issue_token(user_id, Some("test@example.com".to_string()))
            .expect("issue test token");

        let router = tradebook_api::build_router(state.clone());

        Self {
            router,
            state,
            organization_id,
            user_id,
            token,
            _event_task: event_task,
            _db_dir: db_dir,
        }
    }

    /// Access the bearer token for the seeded user.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("serialize request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for authenticated JSON requests.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    pub async fn seed_product(
        &self,
        name: &str,
        stock: i32,
        unit_price: Decimal,
        low_stock_threshold: Option<i32>,
    ) -> product::Model {
        let row = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(self.organization_id),
            name: Set(name.to_string()),
            unit: Set("pcs".to_string()),
            unit_price: Set(unit_price),
            purchase_price: Set(unit_price / Decimal::from(2)),
            target_price: Set(None),
            stock_quantity: Set(stock),
            active: Set(stock > 0),
            low_stock_threshold: Set(low_stock_threshold),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        row.insert(&*self.state.db).await.expect("seed product")
    }

    pub async fn seed_customer(&self, name: &str) -> customer::Model {
        let row = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(self.organization_id),
            name: Set(name.to_string()),
            phone: Set(None),
            created_at: Set(Utc::now()),
        };
        row.insert(&*self.state.db).await.expect("seed customer")
    }

    pub async fn reload_product(&self, id: Uuid) -> product::Model {
        use sea_orm::EntityTrait;
        product::Entity::find_by_id(id)
            .one(&*self.state.db)
            .await
            .expect("reload product")
            .expect("product exists")
    }
}

async fn seed_identity(state: &AppState) -> (Uuid, Uuid) {
    let organization_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();
    let now = Utc::now();

    let org = organization::ActiveModel {
        id: Set(organization_id),
        name: Set("Test Trading Co".to_string()),
        contact_email: Set(Some("owner@example.com".to_string())),
        created_at: Set(now),
    };
    org.insert(&*state.db).await.expect("seed organization");

    let account = user::ActiveModel {
        id: Set(user_id),
        organization_id: Set(organization_id),
        email: Set("test@example.com".to_string()),
        name: Set("Test User".to_string()),
        active: Set(true),
        created_at: Set(now),
    };
    account.insert(&*state.db).await.expect("seed user");

    let settings = organization_settings::Model::defaults(organization_id);
    let mut active: organization_settings::ActiveModel =
        sea_orm::IntoActiveModel::into_active_model(settings);
    active.organization_id = Set(organization_id);
    active.insert(&*state.db).await.expect("seed settings");

    (organization_id, user_id)
}

/// Reads a JSON response body, asserting the expected status first.
pub async fn json_body(response: axum::response::Response, expected: StatusCode) -> Value {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    assert_eq!(
        status,
        expected,
        "unexpected status; body: {}",
        String::from_utf8_lossy(&bytes)
    );
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse response body")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}
