//! Scheduled daily digest: one summary email per organization that opted in.

use sea_orm::EntityTrait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::db::DbPool;
use crate::entities::organization::{self, Entity as OrganizationEntity};
use crate::entities::organization_settings::{self, Entity as SettingsEntity};
use crate::errors::ServiceError;
use crate::notifications::{render_digest_email, SharedMailer};
use crate::services::alerts::{AlertService, DEFAULT_LIMIT};

#[derive(Clone)]
pub struct DigestJob {
    db: Arc<DbPool>,
    alerts: AlertService,
    mailer: SharedMailer,
    interval: Duration,
}

impl DigestJob {
    pub fn new(
        db: Arc<DbPool>,
        alerts: AlertService,
        mailer: SharedMailer,
        interval: Duration,
    ) -> Self {
        Self {
            db,
            alerts,
            mailer,
            interval,
        }
    }

    /// Spawns the recurring digest loop. The first tick fires after one
    /// full interval, not at startup.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_once().await {
                    error!(error = %e, "digest run failed");
                }
            }
        })
    }

    /// One full digest pass over every organization, sequentially. A
    /// failure for one organization is logged and never aborts the rest.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<usize, ServiceError> {
        let organizations = OrganizationEntity::find().all(&*self.db).await?;
        let mut sent = 0usize;

        for org in organizations {
            match self.digest_for(&org).await {
                Ok(true) => sent += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(organization_id = %org.id, error = %e, "digest skipped after error");
                }
            }
        }

        info!(sent, "digest pass complete");
        Ok(sent)
    }

    /// Sends the digest for one organization. Returns false when skipped:
    /// emails disabled, no contact address, or nothing to report.
    async fn digest_for(&self, org: &organization::Model) -> Result<bool, ServiceError> {
        let settings = SettingsEntity::find_by_id(org.id)
            .one(&*self.db)
            .await?
            .unwrap_or_else(|| organization_settings::Model::defaults(org.id));
        if !settings.email_alerts {
            return Ok(false);
        }

        let Some(to) = org.contact_email.as_deref() else {
            return Ok(false);
        };

        let snapshot = self.alerts.get_alerts(org.id, DEFAULT_LIMIT as usize).await?;
        if snapshot.total_count() == 0 {
            return Ok(false);
        }

        let html = render_digest_email(&org.name, &snapshot);
        let ok = self
            .mailer
            .send_generic(to, "Daily alert summary", &html)
            .await
            .map_err(|e| ServiceError::MailError(e.to_string()))?;

        info!(organization_id = %org.id, delivered = ok, "digest email sent");
        Ok(true)
    }
}
