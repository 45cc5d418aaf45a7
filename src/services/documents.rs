//! Document mutation pipeline: Sell, Buy, and Order creation and updates.
//!
//! All three families run through one kind-parameterized path. Every
//! multi-step mutation executes inside a single database transaction; stock
//! adjustments and ledger entries commit with the document or not at all.
//! Threshold-crossing notification happens strictly after commit and never
//! fails the mutation.

use chrono::Utc;
use metrics::{counter, histogram};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::customer::{self, Entity as CustomerEntity};
use crate::entities::document::{
    self, ActiveModel as DocumentActiveModel, Entity as DocumentEntity,
};
use crate::entities::line_item::{
    self, ActiveModel as LineItemActiveModel, Entity as LineItemEntity,
};
use crate::entities::organization_settings::{self, Entity as SettingsEntity};
use crate::entities::product::{self, Entity as ProductEntity};
use crate::entities::{DocumentKind, DocumentStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::stock::StockLedger;

/// One requested document line. Price is optional: sells fall back to the
/// product's unit price, buys to its purchase price.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LineItemInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub price: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDocumentRequest {
    /// Counterparty for sells and orders.
    pub customer_id: Option<Uuid>,
    /// Counterparty for buys.
    pub vendor_name: Option<String>,
    pub vendor_phone: Option<String>,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub paid_amount: Decimal,
    #[serde(default)]
    pub transport_per_trip: Decimal,
    #[serde(default)]
    pub transport_trips: i32,
    #[validate(length(min = 1, message = "At least one line item is required"))]
    #[validate]
    pub items: Vec<LineItemInput>,
}

/// Partial header patch. Absent fields keep their persisted values.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateHeaderRequest {
    pub status: Option<DocumentStatus>,
    pub discount: Option<Decimal>,
    pub paid_amount: Option<Decimal>,
    pub transport_per_trip: Option<Decimal>,
    pub transport_trips: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReplaceItemsRequest {
    #[validate(length(min = 1, message = "At least one line item is required"))]
    #[validate]
    pub items: Vec<LineItemInput>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub id: Uuid,
    pub kind: DocumentKind,
    pub status: Option<String>,
    pub customer_id: Option<Uuid>,
    pub vendor_name: Option<String>,
    pub vendor_phone: Option<String>,
    pub short_code: Option<String>,
    pub total: Decimal,
    pub discount: Decimal,
    pub paid_amount: Decimal,
    pub transport_per_trip: Decimal,
    pub transport_trips: i32,
    pub transport_total: Decimal,
    pub grand_total: Decimal,
    pub due: Decimal,
    pub created_at: chrono::DateTime<Utc>,
    pub delivered_at: Option<chrono::DateTime<Utc>>,
    pub items: Vec<LineItemResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Snapshot line computed from a resolved product and the caller's input.
struct SnapshotLine {
    product_id: Uuid,
    product_name: String,
    quantity: i32,
    unit_price: Decimal,
    line_total: Decimal,
}

/// Service owning document mutations for all three families.
#[derive(Clone)]
pub struct DocumentService {
    db: Arc<DbPool>,
    stock: StockLedger,
    event_sender: Option<EventSender>,
}

impl DocumentService {
    pub fn new(db: Arc<DbPool>, stock: StockLedger, event_sender: Option<EventSender>) -> Self {
        Self {
            db,
            stock,
            event_sender,
        }
    }

    /// Creates a document with its line items, applies stock deltas, and
    /// records a ledger entry when money moved. One transaction end to end.
    #[instrument(skip(self, request), fields(kind = %kind))]
    pub async fn create_document(
        &self,
        organization_id: Uuid,
        kind: DocumentKind,
        request: CreateDocumentRequest,
    ) -> Result<DocumentResponse, ServiceError> {
        request.validate().map_err(ServiceError::from)?;
        self.check_counterparty(&kind, &request)?;

        let db = &*self.db;
        let now = Utc::now();
        let started = std::time::Instant::now();
        let document_id = Uuid::new_v4();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for document creation");
            ServiceError::DatabaseError(e)
        })?;

        if let Some(customer_id) = request.customer_id {
            self.resolve_customer(&txn, organization_id, customer_id)
                .await?;
        }

        let default_threshold = org_low_stock_threshold(&txn, organization_id).await?;

        // Snapshot lines before any write so a bad product fails fast.
        let mut lines = Vec::with_capacity(request.items.len());
        for input in &request.items {
            let product = self
                .resolve_product(&txn, organization_id, input.product_id)
                .await?;
            lines.push(snapshot_line(&kind, &product, input));
        }

        let total: Decimal = lines.iter().map(|l| l.line_total).sum();
        let transport_total = request.transport_per_trip * Decimal::from(request.transport_trips);

        let header = DocumentActiveModel {
            id: Set(document_id),
            organization_id: Set(organization_id),
            kind: Set(kind.to_string()),
            status: Set(kind.has_status().then(|| DocumentStatus::Pending.to_string())),
            customer_id: Set(request.customer_id),
            vendor_name: Set(request.vendor_name.clone()),
            vendor_phone: Set(request.vendor_phone.clone()),
            short_code: Set(matches!(kind, DocumentKind::Sell).then(generate_short_code)),
            total: Set(total),
            discount: Set(request.discount),
            paid_amount: Set(request.paid_amount),
            transport_per_trip: Set(request.transport_per_trip),
            transport_trips: Set(request.transport_trips),
            transport_total: Set(transport_total),
            created_at: Set(now),
            delivered_at: Set(None),
        };
        let saved = header.insert(&txn).await?;

        let crossed = self
            .apply_lines(&txn, organization_id, &kind, document_id, &lines, default_threshold)
            .await?;

        if request.paid_amount > Decimal::ZERO {
            self.record_payment(&txn, organization_id, &kind, &saved, request.paid_amount)
                .await?;
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, document_id = %document_id, "Failed to commit document creation");
            ServiceError::DatabaseError(e)
        })?;

        counter!("tradebook_documents.created", 1);
        histogram!("tradebook_documents.create.duration", started.elapsed());
        info!(document_id = %document_id, kind = %kind, total = %total, "document created");

        self.emit(Event::DocumentCreated {
            organization_id,
            document_id,
        })
        .await;
        self.emit_crossings(organization_id, crossed).await;

        self.get_document(organization_id, document_id).await
    }

    /// Replaces a document's line items wholesale: reverse the stock effect
    /// of every existing line, delete them, insert the new set, and apply
    /// stock in the document's canonical direction. Reverse and re-apply run
    /// in one transaction so stock is never observably double-counted.
    #[instrument(skip(self, request))]
    pub async fn replace_items(
        &self,
        organization_id: Uuid,
        kind: DocumentKind,
        document_id: Uuid,
        request: ReplaceItemsRequest,
    ) -> Result<DocumentResponse, ServiceError> {
        request.validate().map_err(ServiceError::from)?;

        if !matches!(kind, DocumentKind::Sell | DocumentKind::Buy) {
            return Err(ServiceError::BadRequest(
                "Items replacement is supported for sells and buys only".to_string(),
            ));
        }

        let db = &*self.db;
        let txn = db.begin().await?;

        let doc = self
            .resolve_document(&txn, organization_id, kind, document_id)
            .await?;
        let default_threshold = org_low_stock_threshold(&txn, organization_id).await?;

        // Phase one: put every existing line's quantity back.
        let existing = LineItemEntity::find()
            .filter(line_item::Column::DocumentId.eq(document_id))
            .all(&txn)
            .await?;
        let reverse_sign = if kind.decrements_stock() { 1 } else { -1 };
        for item in &existing {
            let floor = if reverse_sign < 0 {
                let product = self
                    .resolve_product(&txn, organization_id, item.product_id)
                    .await?;
                product.effective_threshold(default_threshold)
            } else {
                0
            };
            self.stock
                .adjust_stock(
                    &txn,
                    organization_id,
                    item.product_id,
                    reverse_sign * item.quantity,
                    floor,
                )
                .await?;
        }

        LineItemEntity::delete_many()
            .filter(line_item::Column::DocumentId.eq(document_id))
            .exec(&txn)
            .await?;

        // Phase two: snapshot and apply the new set.
        let mut lines = Vec::with_capacity(request.items.len());
        for input in &request.items {
            let product = self
                .resolve_product(&txn, organization_id, input.product_id)
                .await?;
            lines.push(snapshot_line(&kind, &product, input));
        }

        let crossed = self
            .apply_lines(&txn, organization_id, &kind, document_id, &lines, default_threshold)
            .await?;

        let total: Decimal = lines.iter().map(|l| l.line_total).sum();
        let mut active: DocumentActiveModel = doc.into();
        active.total = Set(total);
        active.update(&txn).await?;

        txn.commit().await?;

        counter!("tradebook_documents.items_replaced", 1);
        info!(document_id = %document_id, total = %total, "document items replaced");

        self.emit(Event::DocumentUpdated {
            organization_id,
            document_id,
        })
        .await;
        self.emit_crossings(organization_id, crossed).await;

        self.get_document(organization_id, document_id).await
    }

    /// Partial header update. Transport total is recomputed from the
    /// resolved pair whenever either transport field changes. Status
    /// transitions are unconstrained within the enum.
    #[instrument(skip(self, request))]
    pub async fn update_header(
        &self,
        organization_id: Uuid,
        kind: DocumentKind,
        document_id: Uuid,
        request: UpdateHeaderRequest,
    ) -> Result<DocumentResponse, ServiceError> {
        if request.status.is_some() && !kind.has_status() {
            return Err(ServiceError::BadRequest(
                "Buy documents have no status".to_string(),
            ));
        }

        let db = &*self.db;
        let txn = db.begin().await?;

        let doc = self
            .resolve_document(&txn, organization_id, kind, document_id)
            .await?;

        let transport_changed =
            request.transport_per_trip.is_some() || request.transport_trips.is_some();
        let per_trip = request.transport_per_trip.unwrap_or(doc.transport_per_trip);
        let trips = request.transport_trips.unwrap_or(doc.transport_trips);

        let mut active: DocumentActiveModel = doc.into();
        if let Some(status) = request.status {
            active.status = Set(Some(status.to_string()));
            if status == DocumentStatus::Delivered {
                active.delivered_at = Set(Some(Utc::now()));
            }
        }
        if let Some(discount) = request.discount {
            active.discount = Set(discount);
        }
        if let Some(paid_amount) = request.paid_amount {
            // Ledger entries are not adjusted retroactively on payment
            // changes; only the creation payment is recorded.
            active.paid_amount = Set(paid_amount);
        }
        if transport_changed {
            active.transport_per_trip = Set(per_trip);
            active.transport_trips = Set(trips);
            active.transport_total = Set(per_trip * Decimal::from(trips));
        }

        active.update(&txn).await?;
        txn.commit().await?;

        counter!("tradebook_documents.header_updated", 1);

        self.emit(Event::DocumentUpdated {
            organization_id,
            document_id,
        })
        .await;

        self.get_document(organization_id, document_id).await
    }

    /// Deletes an order and its line items. Stock decrements are
    /// intentionally not reversed.
    #[instrument(skip(self))]
    pub async fn delete_order(
        &self,
        organization_id: Uuid,
        document_id: Uuid,
    ) -> Result<(), ServiceError> {
        let db = &*self.db;
        let txn = db.begin().await?;

        self.resolve_document(&txn, organization_id, DocumentKind::Order, document_id)
            .await?;

        // Children first to satisfy referential integrity.
        LineItemEntity::delete_many()
            .filter(line_item::Column::DocumentId.eq(document_id))
            .exec(&txn)
            .await?;
        DocumentEntity::delete_by_id(document_id).exec(&txn).await?;

        txn.commit().await?;

        counter!("tradebook_documents.deleted", 1);
        info!(document_id = %document_id, "order deleted");

        self.emit(Event::DocumentDeleted {
            organization_id,
            document_id,
        })
        .await;

        Ok(())
    }

    /// Fetches one document with its items, scoped to the organization.
    pub async fn get_document(
        &self,
        organization_id: Uuid,
        document_id: Uuid,
    ) -> Result<DocumentResponse, ServiceError> {
        let db = &*self.db;

        let doc = DocumentEntity::find_by_id(document_id)
            .filter(document::Column::OrganizationId.eq(organization_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Document not found".to_string()))?;

        let items = LineItemEntity::find()
            .filter(line_item::Column::DocumentId.eq(document_id))
            .all(db)
            .await?;

        to_response(doc, items)
    }

    /// Lists documents of one kind with pagination, newest first.
    pub async fn list_documents(
        &self,
        organization_id: Uuid,
        kind: DocumentKind,
        page: u64,
        per_page: u64,
    ) -> Result<DocumentListResponse, ServiceError> {
        let db = &*self.db;

        let paginator = DocumentEntity::find()
            .filter(document::Column::OrganizationId.eq(organization_id))
            .filter(document::Column::Kind.eq(kind.to_string()))
            .order_by_desc(document::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await?;
        let docs = paginator.fetch_page(page.saturating_sub(1)).await?;

        let mut documents = Vec::with_capacity(docs.len());
        for doc in docs {
            let items = LineItemEntity::find()
                .filter(line_item::Column::DocumentId.eq(doc.id))
                .all(db)
                .await?;
            documents.push(to_response(doc, items)?);
        }

        Ok(DocumentListResponse {
            documents,
            total,
            page,
            per_page,
        })
    }

    /// Inserts snapshot lines and applies their stock deltas, returning the
    /// products that crossed their low-stock threshold within this call.
    async fn apply_lines(
        &self,
        txn: &DatabaseTransaction,
        organization_id: Uuid,
        kind: &DocumentKind,
        document_id: Uuid,
        lines: &[SnapshotLine],
        default_threshold: i32,
    ) -> Result<Vec<Uuid>, ServiceError> {
        let sign = if kind.decrements_stock() { -1 } else { 1 };
        let mut crossed = Vec::new();

        for line in lines {
            let item = LineItemActiveModel {
                id: Set(Uuid::new_v4()),
                document_id: Set(document_id),
                product_id: Set(line.product_id),
                product_name: Set(line.product_name.clone()),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                line_total: Set(line.line_total),
            };
            item.insert(txn).await?;

            let before = self
                .resolve_product(txn, organization_id, line.product_id)
                .await?;
            let threshold = before.effective_threshold(default_threshold);
            let floor = if sign < 0 { threshold } else { 0 };
            let after = self
                .stock
                .adjust_stock(
                    txn,
                    organization_id,
                    line.product_id,
                    sign * line.quantity,
                    floor,
                )
                .await?;

            if kind.decrements_stock()
                && before.stock_quantity > threshold
                && after.stock_quantity <= threshold
            {
                crossed.push(after.id);
            }
        }

        Ok(crossed)
    }

    async fn record_payment(
        &self,
        txn: &DatabaseTransaction,
        organization_id: Uuid,
        kind: &DocumentKind,
        doc: &document::Model,
        amount: Decimal,
    ) -> Result<(), ServiceError> {
        let label = doc
            .short_code
            .as_deref()
            .map(|c| format!("{} {}", kind, c))
            .unwrap_or_else(|| format!("{} {}", kind, doc.id));

        match kind {
            DocumentKind::Sell | DocumentKind::Order => {
                self.stock
                    .record_income(txn, organization_id, &label, amount, "sales", doc.created_at)
                    .await?;
            }
            DocumentKind::Buy => {
                self.stock
                    .record_expense(
                        txn,
                        organization_id,
                        &label,
                        amount,
                        "purchases",
                        doc.created_at,
                    )
                    .await?;
            }
        }
        Ok(())
    }

    fn check_counterparty(
        &self,
        kind: &DocumentKind,
        request: &CreateDocumentRequest,
    ) -> Result<(), ServiceError> {
        match kind {
            DocumentKind::Sell | DocumentKind::Order => {
                if request.customer_id.is_none() {
                    return Err(ServiceError::ValidationError(
                        "customer_id is required for sells and orders".to_string(),
                    ));
                }
            }
            DocumentKind::Buy => {
                if request
                    .vendor_name
                    .as_deref()
                    .map_or(true, |v| v.trim().is_empty())
                {
                    return Err(ServiceError::ValidationError(
                        "vendor_name is required for buys".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    async fn resolve_product<C: ConnectionTrait>(
        &self,
        conn: &C,
        organization_id: Uuid,
        product_id: Uuid,
    ) -> Result<product::Model, ServiceError> {
        ProductEntity::find_by_id(product_id)
            .filter(product::Column::OrganizationId.eq(organization_id))
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))
    }

    async fn resolve_customer<C: ConnectionTrait>(
        &self,
        conn: &C,
        organization_id: Uuid,
        customer_id: Uuid,
    ) -> Result<customer::Model, ServiceError> {
        CustomerEntity::find_by_id(customer_id)
            .filter(customer::Column::OrganizationId.eq(organization_id))
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Customer not found".to_string()))
    }

    async fn resolve_document<C: ConnectionTrait>(
        &self,
        conn: &C,
        organization_id: Uuid,
        kind: DocumentKind,
        document_id: Uuid,
    ) -> Result<document::Model, ServiceError> {
        DocumentEntity::find_by_id(document_id)
            .filter(document::Column::OrganizationId.eq(organization_id))
            .filter(document::Column::Kind.eq(kind.to_string()))
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Document not found".to_string()))
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send document event");
            }
        }
    }

    async fn emit_crossings(&self, organization_id: Uuid, product_ids: Vec<Uuid>) {
        if product_ids.is_empty() {
            return;
        }
        self.emit(Event::StockThresholdCrossed {
            organization_id,
            product_ids,
        })
        .await;
    }
}

/// Reads the organization's low-stock threshold without creating the
/// settings row; absent settings fall back to defaults.
async fn org_low_stock_threshold<C: ConnectionTrait>(
    conn: &C,
    organization_id: Uuid,
) -> Result<i32, ServiceError> {
    let threshold = SettingsEntity::find_by_id(organization_id)
        .one(conn)
        .await?
        .map(|s| s.low_stock_threshold)
        .unwrap_or_else(|| organization_settings::Model::defaults(organization_id).low_stock_threshold);
    Ok(threshold)
}

/// Computes the price snapshot for one line. Sell-side prices are clamped
/// to the product's target (floor) price; buy-side prices are caller
/// supplied with the purchase price as fallback.
fn snapshot_line(kind: &DocumentKind, product: &product::Model, input: &LineItemInput) -> SnapshotLine {
    let unit_price = match kind {
        DocumentKind::Sell | DocumentKind::Order => {
            let requested = input.price.unwrap_or(product.unit_price);
            let floor = product.target_price.unwrap_or(requested);
            requested.max(floor)
        }
        DocumentKind::Buy => input.price.unwrap_or(product.purchase_price),
    };

    SnapshotLine {
        product_id: product.id,
        product_name: product.name.clone(),
        quantity: input.quantity,
        unit_price,
        line_total: unit_price * Decimal::from(input.quantity),
    }
}

/// Short display code for sells. Not globally unique; collisions are
/// tolerated by design.
fn generate_short_code() -> String {
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect();
    format!("S-{}", suffix)
}

fn to_response(
    doc: document::Model,
    items: Vec<line_item::Model>,
) -> Result<DocumentResponse, ServiceError> {
    let grand_total = doc.grand_total();
    let due = doc.due();
    let kind = doc.kind().ok_or_else(|| {
        ServiceError::InternalError(format!(
            "document {} has unrecognized kind '{}'",
            doc.id, doc.kind
        ))
    })?;

    Ok(DocumentResponse {
        id: doc.id,
        kind,
        status: doc.status,
        customer_id: doc.customer_id,
        vendor_name: doc.vendor_name,
        vendor_phone: doc.vendor_phone,
        short_code: doc.short_code,
        total: doc.total,
        discount: doc.discount,
        paid_amount: doc.paid_amount,
        transport_per_trip: doc.transport_per_trip,
        transport_trips: doc.transport_trips,
        transport_total: doc.transport_total,
        grand_total,
        due,
        created_at: doc.created_at,
        delivered_at: doc.delivered_at,
        items: items
            .into_iter()
            .map(|i| LineItemResponse {
                id: i.id,
                product_id: i.product_id,
                product_name: i.product_name,
                quantity: i.quantity,
                unit_price: i.unit_price,
                line_total: i.line_total,
            })
            .collect(),
    })
}
