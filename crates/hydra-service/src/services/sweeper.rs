//! Background sweep of expired sessions
//!
//! Expired sessions are already unusable. Validation deactivates them lazily
//! when they are presented. The sweep deactivates the rest so the active-set
//! indexes stay small.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::context::ServiceContext;
use super::error::ServiceResult;
use super::session::SessionService;

/// Periodic expired-session sweeper
pub struct SessionSweeper {
    ctx: Arc<ServiceContext>,
    period: Duration,
}

impl SessionSweeper {
    pub fn new(ctx: Arc<ServiceContext>, period: Duration) -> Self {
        Self { ctx, period }
    }

    /// Sweeper using `SESSION_CLEANUP_INTERVAL` from the context's session config
    pub fn from_context(ctx: Arc<ServiceContext>) -> Self {
        let period = Duration::from_secs(ctx.session_config().cleanup_interval.max(1));
        Self::new(ctx, period)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Sweep once, returning how many sessions were deactivated
    pub async fn run_once(&self) -> ServiceResult<usize> {
        SessionService::new(&self.ctx).cleanup_expired_sessions().await
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(period_secs = self.period.as_secs(), "Session sweeper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.run_once().await {
                            Ok(0) => {}
                            Ok(swept) => tracing::debug!(swept, "Session sweep finished"),
                            Err(e) => tracing::warn!(error = %e, "Session sweep failed"),
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::info!("Session sweeper stopped");
        })
    }
}
