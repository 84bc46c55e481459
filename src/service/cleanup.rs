//! Cleanup Service
//!
//! Periodic maintenance sweeps: expired verification and refresh tokens are
//! deleted, and accounts that never completed verification are reclaimed
//! after a grace period. This is also the backstop for registrations whose
//! compensating rollback failed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::store::CredentialStore;
use crate::utils::error::AuthResult;

/// What a single sweep removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired_verification_tokens: u64,
    pub expired_refresh_tokens: u64,
    pub stale_unverified_users: u64,
}

/// Periodic expiry and orphan reclamation
pub struct CleanupService {
    store: Arc<dyn CredentialStore>,
    /// How long an unverified account may linger before deletion
    unverified_max_age_hours: i64,
}

impl CleanupService {
    pub fn new(store: Arc<dyn CredentialStore>, unverified_max_age_hours: i64) -> Self {
        Self {
            store,
            unverified_max_age_hours,
        }
    }

    /// Run one sweep and report what was removed
    pub async fn sweep(&self) -> AuthResult<SweepReport> {
        let expired_verification_tokens =
            self.store.delete_expired_verification_tokens().await?;
        let expired_refresh_tokens = self.store.delete_expired_refresh_tokens().await?;

        let cutoff = Utc::now() - chrono::Duration::hours(self.unverified_max_age_hours);
        let stale_unverified_users = self.store.delete_stale_unverified_users(cutoff).await?;

        Ok(SweepReport {
            expired_verification_tokens,
            expired_refresh_tokens,
            stale_unverified_users,
        })
    }

    /// Sweep on a fixed interval, forever. Sweep failures are logged and the
    /// loop carries on.
    pub async fn run(&self, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match self.sweep().await {
                Ok(report) => {
                    if report == SweepReport::default() {
                        log::debug!("cleanup sweep: nothing to remove");
                    } else {
                        log::info!(
                            "cleanup sweep: {} verification tokens, {} refresh tokens, \
                             {} unverified users removed",
                            report.expired_verification_tokens,
                            report.expired_refresh_tokens,
                            report.stale_unverified_users
                        );
                    }
                }
                Err(e) => log::error!("cleanup sweep failed: {}", e),
            }
        }
    }
}
