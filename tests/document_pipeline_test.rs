mod common;

use axum::http::{Method, StatusCode};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::{json, Value};
use uuid::Uuid;

use common::{json_body, TestApp};
use tradebook_api::entities::ledger_entry;

fn line(product_id: Uuid, quantity: i32) -> Value {
    json!({ "product_id": product_id, "quantity": quantity })
}

#[tokio::test]
async fn create_sell_decrements_stock_and_flips_active() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Acme Builders").await;
    let product = app.seed_product("Cement", 10, dec!(100), Some(5)).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sells",
            Some(json!({
                "customer_id": customer.id,
                "items": [line(product.id, 6)],
            })),
        )
        .await;

    let body = json_body(response, StatusCode::CREATED).await;
    assert_eq!(body["kind"], "sell");
    assert_eq!(body["total"], "600");
    assert!(body["shortCode"].as_str().is_some());
    assert_eq!(body["items"].as_array().map(Vec::len), Some(1));

    let after = app.reload_product(product.id).await;
    assert_eq!(after.stock_quantity, 4);
    assert!(!after.active, "stock at or under threshold deactivates");
}

#[tokio::test]
async fn create_sell_with_payment_records_income_ledger_entry() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Acme Builders").await;
    let product = app.seed_product("Rebar", 50, dec!(20), None).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sells",
            Some(json!({
                "customer_id": customer.id,
                "paid_amount": "150",
                "items": [line(product.id, 10)],
            })),
        )
        .await;
    json_body(response, StatusCode::CREATED).await;

    let entries = ledger_entry::Entity::find()
        .filter(ledger_entry::Column::OrganizationId.eq(app.organization_id))
        .all(&*app.state.db)
        .await
        .expect("ledger query");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entry_type, "income");
    assert_eq!(entries[0].amount, dec!(150));
}

#[tokio::test]
async fn create_without_payment_writes_no_ledger_entry() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Acme Builders").await;
    let product = app.seed_product("Rebar", 50, dec!(20), None).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sells",
            Some(json!({
                "customer_id": customer.id,
                "items": [line(product.id, 2)],
            })),
        )
        .await;
    json_body(response, StatusCode::CREATED).await;

    let entries = ledger_entry::Entity::find()
        .filter(ledger_entry::Column::OrganizationId.eq(app.organization_id))
        .all(&*app.state.db)
        .await
        .expect("ledger query");
    assert!(entries.is_empty());
}

#[tokio::test]
async fn failed_create_leaves_stock_and_ledger_untouched() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Acme Builders").await;
    let product = app.seed_product("Cement", 10, dec!(100), None).await;

    // Second line references a product that does not exist.
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sells",
            Some(json!({
                "customer_id": customer.id,
                "paid_amount": "100",
                "items": [line(product.id, 3), line(Uuid::new_v4(), 1)],
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let after = app.reload_product(product.id).await;
    assert_eq!(after.stock_quantity, 10, "no partial decrement survives");

    let entries = ledger_entry::Entity::find()
        .filter(ledger_entry::Column::OrganizationId.eq(app.organization_id))
        .all(&*app.state.db)
        .await
        .expect("ledger query");
    assert!(entries.is_empty(), "ledger write rolled back with the rest");
}

#[tokio::test]
async fn buy_increments_stock_and_reactivates_depleted_product() {
    let app = TestApp::new().await;
    let product = app.seed_product("Bricks", 0, dec!(8), None).await;
    assert!(!product.active);

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/buys",
            Some(json!({
                "vendor_name": "Brickworks Ltd",
                "items": [line(product.id, 3)],
            })),
        )
        .await;
    let body = json_body(response, StatusCode::CREATED).await;
    assert_eq!(body["kind"], "buy");
    assert_eq!(body["status"], Value::Null, "buys have no status");

    let after = app.reload_product(product.id).await;
    assert_eq!(after.stock_quantity, 3);
    assert!(after.active);
}

#[tokio::test]
async fn sell_requires_customer_and_buy_requires_vendor() {
    let app = TestApp::new().await;
    let product = app.seed_product("Cement", 10, dec!(100), None).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sells",
            Some(json!({ "items": [line(product.id, 1)] })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/buys",
            Some(json!({ "items": [line(product.id, 1)] })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversell_is_allowed_by_default() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Acme Builders").await;
    let product = app.seed_product("Cement", 2, dec!(100), None).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sells",
            Some(json!({
                "customer_id": customer.id,
                "items": [line(product.id, 5)],
            })),
        )
        .await;
    json_body(response, StatusCode::CREATED).await;

    let after = app.reload_product(product.id).await;
    assert_eq!(after.stock_quantity, -3);
}

#[tokio::test]
async fn replace_items_with_same_set_is_a_stock_noop() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Acme Builders").await;
    let product = app.seed_product("Cement", 20, dec!(100), None).await;

    let created = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sells",
            Some(json!({
                "customer_id": customer.id,
                "items": [line(product.id, 4)],
            })),
        )
        .await;
    let body = json_body(created, StatusCode::CREATED).await;
    let id = body["id"].as_str().expect("document id").to_string();
    assert_eq!(app.reload_product(product.id).await.stock_quantity, 16);

    // Replace A with A, twice; stock must not drift.
    for _ in 0..2 {
        let response = app
            .request_authenticated(
                Method::PUT,
                &format!("/api/v1/sells/{}/items", id),
                Some(json!({ "items": [line(product.id, 4)] })),
            )
            .await;
        json_body(response, StatusCode::OK).await;
        assert_eq!(app.reload_product(product.id).await.stock_quantity, 16);
    }
}

#[tokio::test]
async fn replace_items_applies_exact_net_delta() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Acme Builders").await;
    let cement = app.seed_product("Cement", 20, dec!(100), None).await;
    let rebar = app.seed_product("Rebar", 30, dec!(20), None).await;

    let created = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sells",
            Some(json!({
                "customer_id": customer.id,
                "items": [line(cement.id, 4)],
            })),
        )
        .await;
    let body = json_body(created, StatusCode::CREATED).await;
    let id = body["id"].as_str().expect("document id").to_string();

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/sells/{}/items", id),
            Some(json!({ "items": [line(rebar.id, 10)] })),
        )
        .await;
    let body = json_body(response, StatusCode::OK).await;
    assert_eq!(body["total"], "200");

    // Cement quantity returned, rebar decremented.
    assert_eq!(app.reload_product(cement.id).await.stock_quantity, 20);
    assert_eq!(app.reload_product(rebar.id).await.stock_quantity, 20);
}

#[tokio::test]
async fn update_header_recomputes_transport_and_due() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Acme Builders").await;
    let product = app.seed_product("Cement", 50, dec!(100), None).await;

    let created = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sells",
            Some(json!({
                "customer_id": customer.id,
                "items": [line(product.id, 10)],
            })),
        )
        .await;
    let body = json_body(created, StatusCode::CREATED).await;
    let id = body["id"].as_str().expect("document id").to_string();
    assert_eq!(body["due"], "1000");

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/sells/{}", id),
            Some(json!({
                "discount": "50",
                "paid_amount": "600",
                "transport_per_trip": "50",
                "transport_trips": 2,
            })),
        )
        .await;
    let body = json_body(response, StatusCode::OK).await;
    assert_eq!(body["transportTotal"], "100");
    assert_eq!(body["grandTotal"], "1050");
    assert_eq!(body["due"], "450");
}

#[tokio::test]
async fn overpayment_clamps_due_at_zero() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Acme Builders").await;
    let product = app.seed_product("Cement", 50, dec!(100), None).await;

    let created = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sells",
            Some(json!({
                "customer_id": customer.id,
                "discount": "50",
                "paid_amount": "1200",
                "transport_per_trip": "100",
                "transport_trips": 1,
                "items": [line(product.id, 10)],
            })),
        )
        .await;
    let body = json_body(created, StatusCode::CREATED).await;
    assert_eq!(body["due"], "0");
}

#[tokio::test]
async fn status_update_on_buy_is_rejected() {
    let app = TestApp::new().await;
    let product = app.seed_product("Bricks", 10, dec!(8), None).await;

    let created = app
        .request_authenticated(
            Method::POST,
            "/api/v1/buys",
            Some(json!({
                "vendor_name": "Brickworks Ltd",
                "items": [line(product.id, 2)],
            })),
        )
        .await;
    let body = json_body(created, StatusCode::CREATED).await;
    let id = body["id"].as_str().expect("document id").to_string();

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/v1/buys/{}", id),
            Some(json!({ "status": "delivered" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_order_removes_rows_without_restoring_stock() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Acme Builders").await;
    let product = app.seed_product("Cement", 20, dec!(100), None).await;

    let created = app
        .request_authenticated(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "customer_id": customer.id,
                "items": [line(product.id, 5)],
            })),
        )
        .await;
    let body = json_body(created, StatusCode::CREATED).await;
    let id = body["id"].as_str().expect("document id").to_string();
    assert_eq!(body["status"], "pending");
    assert_eq!(app.reload_product(product.id).await.stock_quantity, 15);

    let response = app
        .request_authenticated(Method::DELETE, &format!("/api/v1/orders/{}", id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request_authenticated(Method::GET, &format!("/api/v1/orders/{}", id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Stock decrement is intentionally not reversed.
    assert_eq!(app.reload_product(product.id).await.stock_quantity, 15);
}

#[tokio::test]
async fn documents_are_scoped_to_their_kind_route() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Acme Builders").await;
    let product = app.seed_product("Cement", 20, dec!(100), None).await;

    let created = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sells",
            Some(json!({
                "customer_id": customer.id,
                "items": [line(product.id, 1)],
            })),
        )
        .await;
    let body = json_body(created, StatusCode::CREATED).await;
    let id = body["id"].as_str().expect("document id").to_string();

    // A sell is not reachable through the buys routes.
    let response = app
        .request_authenticated(Method::GET, &format!("/api/v1/buys/{}", id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_documents_paginates_newest_first() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Acme Builders").await;
    let product = app.seed_product("Cement", 100, dec!(100), None).await;

    for qty in 1..=3 {
        let response = app
            .request_authenticated(
                Method::POST,
                "/api/v1/sells",
                Some(json!({
                    "customer_id": customer.id,
                    "items": [line(product.id, qty)],
                })),
            )
            .await;
        json_body(response, StatusCode::CREATED).await;
    }

    let response = app
        .request_authenticated(Method::GET, "/api/v1/sells?page=1&per_page=2", None)
        .await;
    let body = json_body(response, StatusCode::OK).await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["documents"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn requests_without_token_are_unauthorized() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/api/v1/sells", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sell_price_floor_applies_on_create() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Acme Builders").await;
    let mut product = app.seed_product("Cement", 20, dec!(100), None).await;

    // Give the product a floor price above the requested price.
    use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};
    let mut active = product.clone().into_active_model();
    active.target_price = Set(Some(dec!(90)));
    product = active.update(&*app.state.db).await.expect("set target price");

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sells",
            Some(json!({
                "customer_id": customer.id,
                "items": [{ "product_id": product.id, "quantity": 2, "price": "80" }],
            })),
        )
        .await;
    let body = json_body(response, StatusCode::CREATED).await;
    assert_eq!(body["items"][0]["unitPrice"], "90");
    assert_eq!(body["total"], "180");
}

#[tokio::test]
async fn zero_quantity_line_is_rejected() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Acme Builders").await;
    let product = app.seed_product("Cement", 20, dec!(100), None).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/sells",
            Some(json!({
                "customer_id": customer.id,
                "items": [line(product.id, 0)],
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn insufficient_stock_rejected_when_oversell_disabled() {
    use assert_matches::assert_matches;
    use tradebook_api::entities::DocumentKind;
    use tradebook_api::errors::ServiceError;
    use tradebook_api::services::documents::{CreateDocumentRequest, LineItemInput};
    use tradebook_api::services::{DocumentService, StockLedger};

    let app = TestApp::new().await;
    let customer = app.seed_customer("Acme Builders").await;
    let product = app.seed_product("Cement", 2, dec!(100), None).await;

    let strict = DocumentService::new(app.state.db.clone(), StockLedger::new(false), None);
    let result = strict
        .create_document(
            app.organization_id,
            DocumentKind::Sell,
            CreateDocumentRequest {
                customer_id: Some(customer.id),
                vendor_name: None,
                vendor_phone: None,
                discount: Decimal::ZERO,
                paid_amount: Decimal::ZERO,
                transport_per_trip: Decimal::ZERO,
                transport_trips: 0,
                items: vec![LineItemInput {
                    product_id: product.id,
                    quantity: 5,
                    price: None,
                }],
            },
        )
        .await;

    assert_matches!(result, Err(ServiceError::InsufficientStock(_)));
    assert_eq!(app.reload_product(product.id).await.stock_quantity, 2);
}
