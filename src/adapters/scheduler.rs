use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::application::services::reconciliation_job::{ReconcileReport, ReconciliationJob};

/// Runs reconciliation for every tenant on a fixed period.
pub struct ReconciliationScheduler {
    job: Arc<ReconciliationJob>,
    period: Duration,
}

impl ReconciliationScheduler {
    pub fn new(job: Arc<ReconciliationJob>, period: Duration) -> Self {
        Self { job, period }
    }

    /// Returns the handle so `main` can abort it on shutdown.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                self.run_once().await;
            }
        })
    }

    /// One pass over all tenants. A failing tenant does not stop the others.
    pub async fn run_once(&self) -> ReconcileReport {
        let mut total = ReconcileReport::default();

        let tenants = match self.job.tenants().await {
            Ok(tenants) => tenants,
            Err(e) => {
                error!(error = %e, "Could not list tenants for reconciliation");
                return total;
            }
        };

        for tenant_id in tenants {
            match self.job.reconcile(tenant_id, Utc::now()).await {
                Ok(report) => {
                    total.scanned += report.scanned;
                    total.purged += report.purged;
                    total.retried += report.retried;
                    total.skipped += report.skipped;
                    total.failed += report.failed;
                    total.orphans_removed += report.orphans_removed;
                    total.storage_keys.extend(report.storage_keys);
                }
                Err(e) => error!(%tenant_id, error = %e, "Reconciliation failed"),
            }
        }

        info!(
            purged = total.purged,
            retried = total.retried,
            orphans_removed = total.orphans_removed,
            "Scheduled reconciliation finished"
        );

        total
    }
}
