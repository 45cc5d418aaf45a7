use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    /// Unit of measure, e.g. "pcs", "kg".
    pub unit: String,
    pub unit_price: Decimal,
    pub purchase_price: Decimal,
    /// Floor price for sells; sell-side line prices never go below this.
    pub target_price: Option<Decimal>,
    pub stock_quantity: i32,
    /// Derived availability flag, maintained by the stock ledger in the
    /// same statement as the quantity write: a sell landing at or under the
    /// low-stock threshold clears it, a buy restocking above zero sets it.
    pub active: bool,
    /// Per-product override of the organization's low-stock threshold.
    pub low_stock_threshold: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::organization::Entity",
        from = "Column::OrganizationId",
        to = "super::organization::Column::Id"
    )]
    Organization,
    #[sea_orm(has_many = "super::line_item::Entity")]
    LineItems,
}

impl Related<super::organization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl Related<super::line_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LineItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Effective low-stock threshold: product override or org setting.
    pub fn effective_threshold(&self, org_default: i32) -> i32 {
        self.low_stock_threshold.unwrap_or(org_default)
    }
}
