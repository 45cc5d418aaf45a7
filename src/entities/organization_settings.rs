use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-organization alerting configuration. One row per organization,
/// created lazily with defaults when first read.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "organization_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub organization_id: Uuid,
    pub notify_low_stock: bool,
    pub notify_pending_orders: bool,
    pub notify_receivables: bool,
    pub notify_payables: bool,
    /// Stock level at or below which a product is considered low,
    /// unless the product carries its own override.
    pub low_stock_threshold: i32,
    /// Hours after which a pending sell counts as aging.
    pub pending_order_aging_hours: i64,
    pub receivable_reminder_days: i64,
    pub payable_reminder_days: i64,
    /// Master toggle for outbound alert emails.
    pub email_alerts: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Default settings row for a freshly seen organization.
    pub fn defaults(organization_id: Uuid) -> Self {
        Self {
            organization_id,
            notify_low_stock: true,
            notify_pending_orders: true,
            notify_receivables: true,
            notify_payables: true,
            low_stock_threshold: 5,
            pending_order_aging_hours: 24,
            receivable_reminder_days: 7,
            payable_reminder_days: 7,
            email_alerts: false,
            updated_at: Utc::now(),
        }
    }
}
