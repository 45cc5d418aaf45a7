//! Alert snooze store: per-alert mute rows with optional expiry.

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::alert_snooze::{
    self, ActiveModel as SnoozeActiveModel, Entity as SnoozeEntity,
};
use crate::entities::document::{self, Entity as DocumentEntity};
use crate::entities::product::{self, Entity as ProductEntity};
use crate::entities::AlertCategory;
use crate::errors::ServiceError;

const DEFAULT_SNOOZE_DAYS: i64 = 7;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnoozeRequest {
    #[serde(rename = "type")]
    pub category: AlertCategory,
    pub ref_id: Uuid,
    pub days: Option<i64>,
    #[serde(default)]
    pub forever: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsnoozeRequest {
    #[serde(rename = "type")]
    pub category: AlertCategory,
    pub ref_id: Uuid,
}

/// Active snooze enriched for display. `label` falls back to a generic
/// placeholder when the referenced entity no longer exists.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnoozeView {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub category: AlertCategory,
    pub ref_id: Uuid,
    pub until: Option<chrono::DateTime<Utc>>,
    pub permanent: bool,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<rust_decimal::Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_hours: Option<i64>,
}

#[derive(Clone)]
pub struct SnoozeService {
    db: Arc<DbPool>,
}

impl SnoozeService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Creates or refreshes the snooze row for one (category, ref) tuple.
    /// Default duration is seven days when neither `days` nor `forever` is
    /// given; an existing row, expired or not, is updated in place.
    #[instrument(skip(self))]
    pub async fn snooze(
        &self,
        organization_id: Uuid,
        request: SnoozeRequest,
    ) -> Result<alert_snooze::Model, ServiceError> {
        let db = &*self.db;
        let now = Utc::now();

        let until = if request.forever {
            None
        } else {
            Some(now + Duration::days(request.days.unwrap_or(DEFAULT_SNOOZE_DAYS)))
        };

        let existing = SnoozeEntity::find()
            .filter(alert_snooze::Column::OrganizationId.eq(organization_id))
            .filter(alert_snooze::Column::Category.eq(request.category.to_string()))
            .filter(alert_snooze::Column::RefId.eq(request.ref_id))
            .one(db)
            .await?;

        let saved = match existing {
            Some(row) => {
                let mut active: SnoozeActiveModel = row.into();
                active.until = Set(until);
                active.permanent = Set(request.forever);
                active.updated_at = Set(Some(now));
                active.update(db).await?
            }
            None => {
                let row = SnoozeActiveModel {
                    id: Set(Uuid::new_v4()),
                    organization_id: Set(organization_id),
                    category: Set(request.category.to_string()),
                    ref_id: Set(request.ref_id),
                    until: Set(until),
                    permanent: Set(request.forever),
                    created_at: Set(now),
                    updated_at: Set(None),
                };
                row.insert(db).await?
            }
        };

        info!(
            category = %saved.category,
            ref_id = %saved.ref_id,
            permanent = saved.permanent,
            "alert snoozed"
        );
        Ok(saved)
    }

    /// Deletes every snooze row matching the tuple. Absence is not an
    /// error; returns the number of rows removed.
    #[instrument(skip(self))]
    pub async fn unsnooze(
        &self,
        organization_id: Uuid,
        request: UnsnoozeRequest,
    ) -> Result<u64, ServiceError> {
        let result = SnoozeEntity::delete_many()
            .filter(alert_snooze::Column::OrganizationId.eq(organization_id))
            .filter(alert_snooze::Column::Category.eq(request.category.to_string()))
            .filter(alert_snooze::Column::RefId.eq(request.ref_id))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected)
    }

    /// Lists currently-active snoozes enriched with display labels and
    /// category-specific fields, resolved via best-effort batch lookups.
    pub async fn list_snoozes(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<SnoozeView>, ServiceError> {
        let db = &*self.db;
        let now = Utc::now();

        let rows: Vec<alert_snooze::Model> = SnoozeEntity::find()
            .filter(alert_snooze::Column::OrganizationId.eq(organization_id))
            .all(db)
            .await?
            .into_iter()
            .filter(|r| r.is_active(now))
            .collect();

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut product_ids = Vec::new();
        let mut document_ids = Vec::new();
        for row in &rows {
            match row.category.parse::<AlertCategory>() {
                Ok(AlertCategory::LowStock) => product_ids.push(row.ref_id),
                Ok(_) => document_ids.push(row.ref_id),
                Err(_) => {}
            }
        }

        let products: HashMap<Uuid, product::Model> = if product_ids.is_empty() {
            HashMap::new()
        } else {
            ProductEntity::find()
                .filter(product::Column::OrganizationId.eq(organization_id))
                .filter(product::Column::Id.is_in(product_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect()
        };

        let documents: HashMap<Uuid, document::Model> = if document_ids.is_empty() {
            HashMap::new()
        } else {
            DocumentEntity::find()
                .filter(document::Column::OrganizationId.eq(organization_id))
                .filter(document::Column::Id.is_in(document_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|d| (d.id, d))
                .collect()
        };

        let views = rows
            .into_iter()
            .filter_map(|row| {
                let category = row.category.parse::<AlertCategory>().ok()?;
                Some(enrich(row, category, &products, &documents, now))
            })
            .collect();

        Ok(views)
    }
}

fn enrich(
    row: alert_snooze::Model,
    category: AlertCategory,
    products: &HashMap<Uuid, product::Model>,
    documents: &HashMap<Uuid, document::Model>,
    now: chrono::DateTime<Utc>,
) -> SnoozeView {
    let mut view = SnoozeView {
        id: row.id,
        category,
        ref_id: row.ref_id,
        until: row.until,
        permanent: row.permanent,
        label: "unknown".to_string(),
        stock: None,
        due: None,
        age_hours: None,
    };

    match category {
        AlertCategory::LowStock => {
            if let Some(product) = products.get(&row.ref_id) {
                view.label = product.name.clone();
                view.stock = Some(product.stock_quantity);
            }
        }
        AlertCategory::PendingOrder => {
            if let Some(doc) = documents.get(&row.ref_id) {
                view.label = doc
                    .short_code
                    .clone()
                    .unwrap_or_else(|| doc.id.to_string());
                view.due = Some(doc.due());
                view.age_hours = Some((now - doc.created_at).num_hours());
            }
        }
        AlertCategory::Receivable => {
            if let Some(doc) = documents.get(&row.ref_id) {
                view.label = doc
                    .short_code
                    .clone()
                    .unwrap_or_else(|| doc.id.to_string());
                view.due = Some(doc.due());
            }
        }
        AlertCategory::Payable => {
            if let Some(doc) = documents.get(&row.ref_id) {
                view.label = doc
                    .vendor_name
                    .clone()
                    .unwrap_or_else(|| doc.id.to_string());
                view.due = Some(doc.due());
            }
        }
    }

    view
}
