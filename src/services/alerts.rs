//! Threshold alert aggregation.
//!
//! `get_alerts` computes the four alert categories for one organization in a
//! single pass, applying the organization's settings and any active snoozes.
//! Nothing is cached between calls; every invocation re-reads settings and
//! snoozes, so staleness is bounded by the caller's poll interval.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::alert_snooze::{self, Entity as SnoozeEntity};
use crate::entities::customer::{self, Entity as CustomerEntity};
use crate::entities::document::{self, Entity as DocumentEntity};
use crate::entities::organization::Entity as OrganizationEntity;
use crate::entities::organization_settings::{self, Entity as SettingsEntity};
use crate::entities::product::{self, Entity as ProductEntity};
use crate::entities::{AlertCategory, DocumentKind, DocumentStatus};
use crate::errors::ServiceError;
use crate::notifications::{render_low_stock_email, SharedMailer};

pub const MIN_LIMIT: u64 = 1;
pub const MAX_LIMIT: u64 = 50;
pub const DEFAULT_LIMIT: u64 = 5;

/// Clamps a requested item limit to the supported range.
pub fn clamp_limit(limit: Option<u64>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(MIN_LIMIT, MAX_LIMIT) as usize
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockItem {
    pub product_id: Uuid,
    pub name: String,
    pub stock: i32,
    pub threshold: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockBucket {
    pub count: usize,
    pub items: Vec<LowStockItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOrderItem {
    pub document_id: Uuid,
    pub short_code: Option<String>,
    pub age_hours: i64,
    pub due: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOrderBucket {
    pub count: usize,
    /// Subset of `count` older than the configured aging window.
    pub aging_count: usize,
    pub items: Vec<PendingOrderItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivableItem {
    pub document_id: Uuid,
    pub customer_name: Option<String>,
    pub due: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivableBucket {
    pub count: usize,
    pub total_due: Decimal,
    pub items: Vec<ReceivableItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayableItem {
    pub document_id: Uuid,
    pub vendor_name: String,
    pub due: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayableBucket {
    pub count: usize,
    pub total_due: Decimal,
    pub items: Vec<PayableItem>,
}

/// One full alert computation. Structural equality is what the push stream
/// diffs on, so every field participates in `PartialEq`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertsSnapshot {
    pub low_stock: LowStockBucket,
    pub pending_orders: PendingOrderBucket,
    pub receivables: ReceivableBucket,
    pub payables: PayableBucket,
}

impl AlertsSnapshot {
    /// Combined item count across all four categories.
    pub fn total_count(&self) -> usize {
        self.low_stock.count
            + self.pending_orders.count
            + self.receivables.count
            + self.payables.count
    }
}

/// Active snooze ids for one organization, split by category.
#[derive(Debug, Default)]
struct SnoozeSets {
    by_category: HashMap<AlertCategory, HashSet<Uuid>>,
}

impl SnoozeSets {
    fn is_snoozed(&self, category: AlertCategory, ref_id: Uuid) -> bool {
        self.by_category
            .get(&category)
            .map_or(false, |set| set.contains(&ref_id))
    }
}

#[derive(Clone)]
pub struct AlertService {
    db: Arc<DbPool>,
    mailer: SharedMailer,
}

impl AlertService {
    pub fn new(db: Arc<DbPool>, mailer: SharedMailer) -> Self {
        Self { db, mailer }
    }

    /// Computes the four-category alert snapshot for one organization.
    /// Categories disabled in settings return an empty shape without
    /// touching storage.
    #[instrument(skip(self))]
    pub async fn get_alerts(
        &self,
        organization_id: Uuid,
        limit: usize,
    ) -> Result<AlertsSnapshot, ServiceError> {
        let settings = self.ensure_settings(organization_id).await?;
        let snoozes = self.active_snoozes(organization_id).await?;

        let low_stock = if settings.notify_low_stock {
            self.low_stock(organization_id, &settings, &snoozes, limit)
                .await?
        } else {
            LowStockBucket::default()
        };

        let pending_orders = if settings.notify_pending_orders {
            self.pending_orders(organization_id, &settings, &snoozes, limit)
                .await?
        } else {
            PendingOrderBucket::default()
        };

        let receivables = if settings.notify_receivables {
            self.receivables(organization_id, &snoozes, limit).await?
        } else {
            ReceivableBucket::default()
        };

        let payables = if settings.notify_payables {
            self.payables(organization_id, &snoozes, limit).await?
        } else {
            PayableBucket::default()
        };

        Ok(AlertsSnapshot {
            low_stock,
            pending_orders,
            receivables,
            payables,
        })
    }

    /// Best-effort low-stock notification for products that crossed their
    /// threshold. Re-checks each candidate against current stock, settings,
    /// and snoozes before sending. Never returns an error; failures are
    /// logged and swallowed.
    #[instrument(skip(self, product_ids), fields(candidates = product_ids.len()))]
    pub async fn notify_low_stock_if_needed(&self, organization_id: Uuid, product_ids: &[Uuid]) {
        if product_ids.is_empty() {
            return;
        }

        let outcome = self
            .try_notify_low_stock(organization_id, product_ids)
            .await;
        if let Err(e) = outcome {
            warn!(%organization_id, error = %e, "low-stock notification failed");
        }
    }

    async fn try_notify_low_stock(
        &self,
        organization_id: Uuid,
        product_ids: &[Uuid],
    ) -> Result<(), ServiceError> {
        let db = &*self.db;

        let settings = self.read_settings(organization_id).await?;
        if !settings.email_alerts || !settings.notify_low_stock {
            return Ok(());
        }

        let org = OrganizationEntity::find_by_id(organization_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Organization not found".to_string()))?;
        let Some(to) = org.contact_email else {
            return Ok(());
        };

        let snoozes = self.active_snoozes(organization_id).await?;

        // Re-fetch only the candidates; a concurrent restock may already
        // have lifted some of them back above the threshold.
        let products = ProductEntity::find()
            .filter(product::Column::OrganizationId.eq(organization_id))
            .filter(product::Column::Id.is_in(product_ids.to_vec()))
            .all(db)
            .await?;

        let items: Vec<LowStockItem> = products
            .into_iter()
            .filter_map(|p| {
                let threshold = p.effective_threshold(settings.low_stock_threshold);
                if p.stock_quantity <= threshold
                    && !snoozes.is_snoozed(AlertCategory::LowStock, p.id)
                {
                    Some(LowStockItem {
                        product_id: p.id,
                        name: p.name,
                        stock: p.stock_quantity,
                        threshold,
                    })
                } else {
                    None
                }
            })
            .collect();

        if items.is_empty() {
            return Ok(());
        }

        let html = render_low_stock_email(&items);
        let sent = self
            .mailer
            .send_generic(&to, "Low stock alert", &html)
            .await
            .map_err(|e| ServiceError::MailError(e.to_string()))?;

        info!(%organization_id, items = items.len(), sent, "low-stock notification dispatched");
        Ok(())
    }

    /// Reads the settings row, inserting defaults on first access. A lost
    /// insert race falls back to re-reading the winner's row.
    pub async fn ensure_settings(
        &self,
        organization_id: Uuid,
    ) -> Result<organization_settings::Model, ServiceError> {
        let db = &*self.db;

        if let Some(settings) = SettingsEntity::find_by_id(organization_id).one(db).await? {
            return Ok(settings);
        }

        let defaults = organization_settings::Model::defaults(organization_id);
        match defaults.clone().into_active_model().insert(db).await {
            Ok(created) => Ok(created),
            Err(_) => Ok(SettingsEntity::find_by_id(organization_id)
                .one(db)
                .await?
                .unwrap_or(defaults)),
        }
    }

    /// Read-only settings lookup that never writes; absent rows resolve to
    /// defaults.
    async fn read_settings(
        &self,
        organization_id: Uuid,
    ) -> Result<organization_settings::Model, ServiceError> {
        let settings = SettingsEntity::find_by_id(organization_id)
            .one(&*self.db)
            .await?
            .unwrap_or_else(|| organization_settings::Model::defaults(organization_id));
        Ok(settings)
    }

    async fn active_snoozes(&self, organization_id: Uuid) -> Result<SnoozeSets, ServiceError> {
        let now = Utc::now();
        let rows = SnoozeEntity::find()
            .filter(alert_snooze::Column::OrganizationId.eq(organization_id))
            .all(&*self.db)
            .await?;

        let mut sets = SnoozeSets::default();
        for row in rows {
            if !row.is_active(now) {
                continue;
            }
            if let Ok(category) = row.category.parse::<AlertCategory>() {
                sets.by_category
                    .entry(category)
                    .or_default()
                    .insert(row.ref_id);
            }
        }
        Ok(sets)
    }

    async fn low_stock(
        &self,
        organization_id: Uuid,
        settings: &organization_settings::Model,
        snoozes: &SnoozeSets,
        limit: usize,
    ) -> Result<LowStockBucket, ServiceError> {
        let products = ProductEntity::find()
            .filter(product::Column::OrganizationId.eq(organization_id))
            .all(&*self.db)
            .await?;

        let mut items: Vec<LowStockItem> = products
            .into_iter()
            .filter_map(|p| {
                let threshold = p.effective_threshold(settings.low_stock_threshold);
                if p.stock_quantity <= threshold
                    && !snoozes.is_snoozed(AlertCategory::LowStock, p.id)
                {
                    Some(LowStockItem {
                        product_id: p.id,
                        name: p.name,
                        stock: p.stock_quantity,
                        threshold,
                    })
                } else {
                    None
                }
            })
            .collect();

        items.sort_by_key(|i| i.stock);
        let count = items.len();
        items.truncate(limit);

        Ok(LowStockBucket { count, items })
    }

    async fn pending_orders(
        &self,
        organization_id: Uuid,
        settings: &organization_settings::Model,
        snoozes: &SnoozeSets,
        limit: usize,
    ) -> Result<PendingOrderBucket, ServiceError> {
        let now = Utc::now();
        let docs = DocumentEntity::find()
            .filter(document::Column::OrganizationId.eq(organization_id))
            .filter(document::Column::Kind.is_in(vec![
                DocumentKind::Sell.to_string(),
                DocumentKind::Order.to_string(),
            ]))
            .filter(document::Column::Status.eq(DocumentStatus::Pending.to_string()))
            .all(&*self.db)
            .await?;

        let mut pending: Vec<(document::Model, i64)> = docs
            .into_iter()
            .filter(|d| !snoozes.is_snoozed(AlertCategory::PendingOrder, d.id))
            .map(|d| {
                let age_hours = (now - d.created_at).num_hours();
                (d, age_hours)
            })
            .collect();

        let count = pending.len();
        let aging_count = pending
            .iter()
            .filter(|(_, age)| *age >= settings.pending_order_aging_hours)
            .count();

        // Oldest first.
        pending.sort_by_key(|(d, _)| d.created_at);
        let items = pending
            .into_iter()
            .take(limit)
            .map(|(d, age_hours)| PendingOrderItem {
                document_id: d.id,
                short_code: d.short_code.clone(),
                age_hours,
                due: d.due(),
            })
            .collect();

        Ok(PendingOrderBucket {
            count,
            aging_count,
            items,
        })
    }

    async fn receivables(
        &self,
        organization_id: Uuid,
        snoozes: &SnoozeSets,
        limit: usize,
    ) -> Result<ReceivableBucket, ServiceError> {
        let docs = DocumentEntity::find()
            .filter(document::Column::OrganizationId.eq(organization_id))
            .filter(document::Column::Kind.eq(DocumentKind::Sell.to_string()))
            .all(&*self.db)
            .await?;

        let mut outstanding: Vec<document::Model> = docs
            .into_iter()
            .filter(|d| {
                d.due() > Decimal::ZERO && !snoozes.is_snoozed(AlertCategory::Receivable, d.id)
            })
            .collect();

        let count = outstanding.len();
        let total_due: Decimal = outstanding.iter().map(|d| d.due()).sum();

        outstanding.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        outstanding.truncate(limit);

        let customer_names = self.customer_names(&outstanding).await?;
        let items = outstanding
            .into_iter()
            .map(|d| ReceivableItem {
                document_id: d.id,
                customer_name: d.customer_id.and_then(|id| customer_names.get(&id).cloned()),
                due: d.due(),
            })
            .collect();

        Ok(ReceivableBucket {
            count,
            total_due,
            items,
        })
    }

    async fn payables(
        &self,
        organization_id: Uuid,
        snoozes: &SnoozeSets,
        limit: usize,
    ) -> Result<PayableBucket, ServiceError> {
        let docs = DocumentEntity::find()
            .filter(document::Column::OrganizationId.eq(organization_id))
            .filter(document::Column::Kind.eq(DocumentKind::Buy.to_string()))
            .all(&*self.db)
            .await?;

        let mut outstanding: Vec<document::Model> = docs
            .into_iter()
            .filter(|d| d.due() > Decimal::ZERO && !snoozes.is_snoozed(AlertCategory::Payable, d.id))
            .collect();

        let count = outstanding.len();
        let total_due: Decimal = outstanding.iter().map(|d| d.due()).sum();

        outstanding.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        outstanding.truncate(limit);

        let items = outstanding
            .into_iter()
            .map(|d| {
                let due = d.due();
                PayableItem {
                    document_id: d.id,
                    vendor_name: d.vendor_name.unwrap_or_else(|| "vendor".to_string()),
                    due,
                }
            })
            .collect();

        Ok(PayableBucket {
            count,
            total_due,
            items,
        })
    }

    async fn customer_names(
        &self,
        docs: &[document::Model],
    ) -> Result<HashMap<Uuid, String>, ServiceError> {
        let ids: Vec<Uuid> = docs.iter().filter_map(|d| d.customer_id).collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let customers = CustomerEntity::find()
            .filter(customer::Column::Id.is_in(ids))
            .all(&*self.db)
            .await?;

        Ok(customers.into_iter().map(|c| (c.id, c.name)).collect())
    }
}
