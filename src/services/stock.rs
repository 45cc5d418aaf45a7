//! Stock ledger primitives: the only code path that mutates product stock,
//! plus the append-only financial ledger.
//!
//! Both operations run on a caller-supplied connection so they join the
//! document mutation's transaction; a partial application (stock changed,
//! ledger missing, or vice versa) cannot survive a rollback.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    sea_query::Expr,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::entities::ledger_entry::{self, ActiveModel as LedgerActiveModel};
use crate::entities::product::{self, Entity as ProductEntity};
use crate::entities::EntryType;
use crate::errors::ServiceError;

/// Stock and ledger mutation primitives.
#[derive(Debug, Clone, Copy)]
pub struct StockLedger {
    allow_negative_stock: bool,
}

impl StockLedger {
    pub fn new(allow_negative_stock: bool) -> Self {
        Self {
            allow_negative_stock,
        }
    }

    /// Applies a signed quantity change to a product scoped to its
    /// organization and returns the post-mutation row.
    ///
    /// The quantity change and the derived `active` flag are written in one
    /// UPDATE using column expressions, so `active` can never drift from the
    /// stock value it mirrors. `activity_floor` is the level at or below
    /// which the product goes inactive: callers pass the product's low-stock
    /// threshold on decrements and zero on increments, so a sell landing at
    /// or under the threshold hides the product while a buy restocking above
    /// zero revives it.
    #[instrument(skip(self, conn))]
    pub async fn adjust_stock<C: ConnectionTrait>(
        &self,
        conn: &C,
        organization_id: Uuid,
        product_id: Uuid,
        delta: i32,
        activity_floor: i32,
    ) -> Result<product::Model, ServiceError> {
        if !self.allow_negative_stock && delta < 0 {
            let current = ProductEntity::find_by_id(product_id)
                .filter(product::Column::OrganizationId.eq(organization_id))
                .one(conn)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

            if current.stock_quantity + delta < 0 {
                return Err(ServiceError::InsufficientStock(format!(
                    "product {} has {} in stock, requested {}",
                    current.name,
                    current.stock_quantity,
                    delta.unsigned_abs()
                )));
            }
        }

        let result = ProductEntity::update_many()
            .col_expr(
                product::Column::StockQuantity,
                Expr::col(product::Column::StockQuantity).add(delta),
            )
            .col_expr(
                product::Column::Active,
                Expr::expr(Expr::col(product::Column::StockQuantity).add(delta))
                    .gt(activity_floor),
            )
            .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(product::Column::Id.eq(product_id))
            .filter(product::Column::OrganizationId.eq(organization_id))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound("Product not found".to_string()));
        }

        let updated = ProductEntity::find_by_id(product_id)
            .filter(product::Column::OrganizationId.eq(organization_id))
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        debug!(
            product_id = %product_id,
            delta = delta,
            stock = updated.stock_quantity,
            active = updated.active,
            "stock adjusted"
        );

        Ok(updated)
    }

    /// Appends one income row to the financial ledger.
    pub async fn record_income<C: ConnectionTrait>(
        &self,
        conn: &C,
        organization_id: Uuid,
        description: &str,
        amount: Decimal,
        category: &str,
        date: DateTime<Utc>,
    ) -> Result<ledger_entry::Model, ServiceError> {
        self.record(conn, organization_id, description, EntryType::Income, amount, category, date)
            .await
    }

    /// Appends one expense row to the financial ledger.
    pub async fn record_expense<C: ConnectionTrait>(
        &self,
        conn: &C,
        organization_id: Uuid,
        description: &str,
        amount: Decimal,
        category: &str,
        date: DateTime<Utc>,
    ) -> Result<ledger_entry::Model, ServiceError> {
        self.record(conn, organization_id, description, EntryType::Expense, amount, category, date)
            .await
    }

    async fn record<C: ConnectionTrait>(
        &self,
        conn: &C,
        organization_id: Uuid,
        description: &str,
        entry_type: EntryType,
        amount: Decimal,
        category: &str,
        date: DateTime<Utc>,
    ) -> Result<ledger_entry::Model, ServiceError> {
        let entry = LedgerActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(organization_id),
            description: Set(description.to_string()),
            entry_type: Set(entry_type.to_string()),
            amount: Set(amount),
            category: Set(category.to_string()),
            entry_date: Set(date),
            created_at: Set(Utc::now()),
        };

        let model = entry.insert(conn).await?;
        debug!(entry_id = %model.id, entry_type = %model.entry_type, amount = %model.amount, "ledger entry recorded");
        Ok(model)
    }
}
