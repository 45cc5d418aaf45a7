//! REST surface for the three document families.
//!
//! Sells, buys, and orders expose near-identical routes backed by the same
//! kind-parameterized service calls. Organization scope comes exclusively
//! from the authenticated context, never from the request body.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use uuid::Uuid;

use super::common::{created_response, success_response, PaginationParams};
use crate::auth::OrgContext;
use crate::entities::DocumentKind;
use crate::errors::ServiceError;
use crate::services::documents::{
    CreateDocumentRequest, ReplaceItemsRequest, UpdateHeaderRequest,
};
use crate::AppState;

pub fn sell_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_sell).get(list_sells))
        .route("/:id", get(get_sell).put(update_sell))
        .route("/:id/items", put(replace_sell_items))
}

pub fn buy_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_buy).get(list_buys))
        .route("/:id", get(get_buy).put(update_buy))
        .route("/:id/items", put(replace_buy_items))
}

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/:id", get(get_order).put(update_order).delete(delete_order))
}

async fn create_sell(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    axum::Json(request): axum::Json<CreateDocumentRequest>,
) -> Result<Response, ServiceError> {
    create(&state, &ctx, DocumentKind::Sell, request).await
}

async fn create_buy(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    axum::Json(request): axum::Json<CreateDocumentRequest>,
) -> Result<Response, ServiceError> {
    create(&state, &ctx, DocumentKind::Buy, request).await
}

async fn create_order(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    axum::Json(request): axum::Json<CreateDocumentRequest>,
) -> Result<Response, ServiceError> {
    create(&state, &ctx, DocumentKind::Order, request).await
}

async fn create(
    state: &AppState,
    ctx: &OrgContext,
    kind: DocumentKind,
    request: CreateDocumentRequest,
) -> Result<Response, ServiceError> {
    let document = state
        .services
        .documents
        .create_document(ctx.organization_id, kind, request)
        .await?;
    Ok(created_response(document))
}

async fn list_sells(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Query(params): Query<PaginationParams>,
) -> Result<Response, ServiceError> {
    list(&state, &ctx, DocumentKind::Sell, params).await
}

async fn list_buys(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Query(params): Query<PaginationParams>,
) -> Result<Response, ServiceError> {
    list(&state, &ctx, DocumentKind::Buy, params).await
}

async fn list_orders(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Query(params): Query<PaginationParams>,
) -> Result<Response, ServiceError> {
    list(&state, &ctx, DocumentKind::Order, params).await
}

async fn list(
    state: &AppState,
    ctx: &OrgContext,
    kind: DocumentKind,
    params: PaginationParams,
) -> Result<Response, ServiceError> {
    let (page, per_page) = params.normalized();
    let documents = state
        .services
        .documents
        .list_documents(ctx.organization_id, kind, page, per_page)
        .await?;
    Ok(success_response(documents))
}

async fn get_sell(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    get_one(&state, &ctx, DocumentKind::Sell, id).await
}

async fn get_buy(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    get_one(&state, &ctx, DocumentKind::Buy, id).await
}

async fn get_order(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    get_one(&state, &ctx, DocumentKind::Order, id).await
}

async fn get_one(
    state: &AppState,
    ctx: &OrgContext,
    kind: DocumentKind,
    id: Uuid,
) -> Result<Response, ServiceError> {
    let document = state
        .services
        .documents
        .get_document(ctx.organization_id, id)
        .await?;
    if document.kind != kind {
        return Err(ServiceError::NotFound("Document not found".to_string()));
    }
    Ok(success_response(document))
}

async fn update_sell(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Path(id): Path<Uuid>,
    axum::Json(request): axum::Json<UpdateHeaderRequest>,
) -> Result<Response, ServiceError> {
    update_header(&state, &ctx, DocumentKind::Sell, id, request).await
}

async fn update_buy(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Path(id): Path<Uuid>,
    axum::Json(request): axum::Json<UpdateHeaderRequest>,
) -> Result<Response, ServiceError> {
    update_header(&state, &ctx, DocumentKind::Buy, id, request).await
}

async fn update_order(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Path(id): Path<Uuid>,
    axum::Json(request): axum::Json<UpdateHeaderRequest>,
) -> Result<Response, ServiceError> {
    update_header(&state, &ctx, DocumentKind::Order, id, request).await
}

async fn update_header(
    state: &AppState,
    ctx: &OrgContext,
    kind: DocumentKind,
    id: Uuid,
    request: UpdateHeaderRequest,
) -> Result<Response, ServiceError> {
    let document = state
        .services
        .documents
        .update_header(ctx.organization_id, kind, id, request)
        .await?;
    Ok(success_response(document))
}

async fn replace_sell_items(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Path(id): Path<Uuid>,
    axum::Json(request): axum::Json<ReplaceItemsRequest>,
) -> Result<Response, ServiceError> {
    replace_items(&state, &ctx, DocumentKind::Sell, id, request).await
}

async fn replace_buy_items(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Path(id): Path<Uuid>,
    axum::Json(request): axum::Json<ReplaceItemsRequest>,
) -> Result<Response, ServiceError> {
    replace_items(&state, &ctx, DocumentKind::Buy, id, request).await
}

async fn replace_items(
    state: &AppState,
    ctx: &OrgContext,
    kind: DocumentKind,
    id: Uuid,
    request: ReplaceItemsRequest,
) -> Result<Response, ServiceError> {
    let document = state
        .services
        .documents
        .replace_items(ctx.organization_id, kind, id, request)
        .await?;
    Ok(success_response(document))
}

async fn delete_order(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state
        .services
        .documents
        .delete_order(ctx.organization_id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
