//! Outbound alert email boundary.
//!
//! SMTP mechanics live outside this system; the [`Mailer`] trait is the
//! whole contract. The default implementation logs the rendered message,
//! which is also what tests assert against.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::services::alerts::{AlertsSnapshot, LowStockItem};

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("mail transport error: {0}")]
    Transport(String),
}

/// Outbound mail contract: one HTML message per call, boolean delivery
/// acknowledgement from the transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_generic(
        &self,
        to: &str,
        subject: &str,
        html: &str,
    ) -> Result<bool, NotificationError>;
}

pub type SharedMailer = Arc<dyn Mailer>;

/// Mailer that records messages to the log instead of a wire transport.
/// Stands in wherever a real SMTP-backed implementation is not wired up.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_generic(
        &self,
        to: &str,
        subject: &str,
        html: &str,
    ) -> Result<bool, NotificationError> {
        info!(to = %to, subject = %subject, bytes = html.len(), "outbound email (log transport)");
        Ok(true)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Renders the immediate low-stock crossing notification.
pub fn render_low_stock_email(items: &[LowStockItem]) -> String {
    let mut html = String::from("<h3>Low stock alert</h3><ul>");
    for item in items {
        html.push_str(&format!(
            "<li>{} — {} left (threshold {})</li>",
            escape(&item.name),
            item.stock,
            item.threshold
        ));
    }
    html.push_str("</ul>");
    html
}

/// Renders the daily digest: one block per category, at most five items
/// each. The pending-orders block only lists orders aging a day or more.
pub fn render_digest_email(organization_name: &str, snapshot: &AlertsSnapshot) -> String {
    const DIGEST_AGING_HOURS: i64 = 24;
    const MAX_ITEMS: usize = 5;

    let mut html = format!(
        "<h2>Daily alert summary for {}</h2>",
        escape(organization_name)
    );

    if snapshot.low_stock.count > 0 {
        html.push_str(&format!(
            "<h3>Low stock ({})</h3><ul>",
            snapshot.low_stock.count
        ));
        for item in snapshot.low_stock.items.iter().take(MAX_ITEMS) {
            html.push_str(&format!(
                "<li>{} — {} left</li>",
                escape(&item.name),
                item.stock
            ));
        }
        html.push_str("</ul>");
    }

    let aging: Vec<_> = snapshot
        .pending_orders
        .items
        .iter()
        .filter(|o| o.age_hours >= DIGEST_AGING_HOURS)
        .take(MAX_ITEMS)
        .collect();
    if !aging.is_empty() {
        html.push_str(&format!(
            "<h3>Aging pending orders ({})</h3><ul>",
            snapshot.pending_orders.aging_count
        ));
        for order in aging {
            let label = order.short_code.as_deref().unwrap_or("order");
            html.push_str(&format!(
                "<li>{} — pending for {}h</li>",
                escape(label),
                order.age_hours
            ));
        }
        html.push_str("</ul>");
    }

    if snapshot.receivables.count > 0 {
        html.push_str(&format!(
            "<h3>Receivables ({}, total due {})</h3><ul>",
            snapshot.receivables.count, snapshot.receivables.total_due
        ));
        for item in snapshot.receivables.items.iter().take(MAX_ITEMS) {
            let who = item.customer_name.as_deref().unwrap_or("customer");
            html.push_str(&format!("<li>{} — due {}</li>", escape(who), item.due));
        }
        html.push_str("</ul>");
    }

    if snapshot.payables.count > 0 {
        html.push_str(&format!(
            "<h3>Payables ({}, total due {})</h3><ul>",
            snapshot.payables.count, snapshot.payables.total_due
        ));
        for item in snapshot.payables.items.iter().take(MAX_ITEMS) {
            html.push_str(&format!(
                "<li>{} — due {}</li>",
                escape(&item.vendor_name),
                item.due
            ));
        }
        html.push_str("</ul>");
    }

    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn low_stock_email_lists_every_item() {
        let items = vec![
            LowStockItem {
                product_id: Uuid::new_v4(),
                name: "Cement <50kg>".into(),
                stock: 2,
                threshold: 5,
            },
            LowStockItem {
                product_id: Uuid::new_v4(),
                name: "Rebar".into(),
                stock: 0,
                threshold: 10,
            },
        ];

        let html = render_low_stock_email(&items);
        assert!(html.contains("Cement &lt;50kg&gt;"));
        assert!(html.contains("Rebar"));
        assert!(html.contains("threshold 5"));
    }

    #[tokio::test]
    async fn log_mailer_always_acknowledges() {
        let mailer = LogMailer;
        let ok = mailer
            .send_generic("ops@example.com", "subject", "<p>body</p>")
            .await
            .unwrap();
        assert!(ok);
    }
}
