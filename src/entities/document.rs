use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// The three document families share one table, parameterized by kind.
/// Kind fixes the stock direction (sell/order decrement, buy increment)
/// and the counterparty shape (customer vs free-text vendor).
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DocumentKind {
    Sell,
    Buy,
    Order,
}

impl DocumentKind {
    /// Whether a mutation of this kind removes stock.
    pub fn decrements_stock(&self) -> bool {
        matches!(self, DocumentKind::Sell | DocumentKind::Order)
    }

    /// Sell and Order carry a status lifecycle; Buy does not.
    pub fn has_status(&self) -> bool {
        matches!(self, DocumentKind::Sell | DocumentKind::Order)
    }
}

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Delivered,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    /// "sell" | "buy" | "order"
    pub kind: String,
    /// Lifecycle status; NULL for buys.
    pub status: Option<String>,
    /// Counterparty for sells and orders.
    pub customer_id: Option<Uuid>,
    /// Free-text counterparty for buys.
    pub vendor_name: Option<String>,
    pub vendor_phone: Option<String>,
    /// Short display code, sells only. Not globally unique.
    pub short_code: Option<String>,
    pub total: Decimal,
    pub discount: Decimal,
    pub paid_amount: Decimal,
    pub transport_per_trip: Decimal,
    pub transport_trips: i32,
    pub transport_total: Decimal,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::organization::Entity",
        from = "Column::OrganizationId",
        to = "super::organization::Column::Id"
    )]
    Organization,
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    #[sea_orm(has_many = "super::line_item::Entity")]
    LineItems,
}

impl Related<super::organization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::line_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LineItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn kind(&self) -> Option<DocumentKind> {
        self.kind.parse().ok()
    }

    /// total + transport − discount
    pub fn grand_total(&self) -> Decimal {
        self.total + self.transport_total - self.discount
    }

    /// Unpaid remainder of the grand total, clamped at zero.
    pub fn due(&self) -> Decimal {
        let due = self.grand_total() - self.paid_amount;
        if due.is_sign_negative() {
            Decimal::ZERO
        } else {
            due
        }
    }
}
