use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Alert categories computed by the aggregator. Serialized in camelCase on
/// the API surface, snake_case in storage.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "snake_case")]
pub enum AlertCategory {
    LowStock,
    PendingOrder,
    Receivable,
    Payable,
}

/// Mute state for one alert instance. Rows expire naturally once `until`
/// passes; they are filtered at query time, never garbage-collected.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alert_snoozes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    /// Storage form of [`AlertCategory`].
    pub category: String,
    /// The muted entity: product id, document id, or vendor-keyed document id.
    pub ref_id: Uuid,
    pub until: Option<DateTime<Utc>>,
    pub permanent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// A snooze suppresses alerts while permanent or not yet expired.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.permanent || self.until.map_or(false, |u| u >= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn row(until: Option<DateTime<Utc>>, permanent: bool) -> Model {
        Model {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            category: AlertCategory::LowStock.to_string(),
            ref_id: Uuid::new_v4(),
            until,
            permanent,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn permanent_snooze_never_expires() {
        let now = Utc::now();
        assert!(row(None, true).is_active(now));
        assert!(row(Some(now - Duration::days(30)), true).is_active(now));
    }

    #[test]
    fn timed_snooze_expires_once_until_passes() {
        let now = Utc::now();
        assert!(row(Some(now + Duration::days(7)), false).is_active(now));
        assert!(!row(Some(now - Duration::seconds(1)), false).is_active(now));
        assert!(!row(None, false).is_active(now));
    }

    #[test]
    fn category_storage_and_api_forms() {
        assert_eq!(AlertCategory::LowStock.to_string(), "low_stock");
        assert_eq!(
            serde_json::to_string(&AlertCategory::PendingOrder).unwrap(),
            "\"pendingOrder\""
        );
        assert_eq!(
            "receivable".parse::<AlertCategory>().unwrap(),
            AlertCategory::Receivable
        );
    }
}
