use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::channel::{NotificationChannel, OutboundMessage, SendOutcome};
use crate::database::connection::DatabaseManager;
use crate::database::models::Member;

/// Minimum delay between consecutive sends. Cooperative pacing against the
/// transport's throughput ceiling (~20/sec), not a burst allowance.
pub const SEND_PACING: Duration = Duration::from_millis(50);

/// Upper bound on a single send attempt. A timeout counts as a transient
/// failure, never a stall.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub success: usize,
    pub failed: usize,
}

/// Fans one message out to a recipient set. Sends are strictly serialized
/// and rate-limited; failures are classified per recipient and never abort
/// the rest of the fan-out.
pub struct BroadcastDispatcher {
    channel: Arc<dyn NotificationChannel>,
    db: Arc<DatabaseManager>,
    pacing: Duration,
}

impl BroadcastDispatcher {
    pub fn new(channel: Arc<dyn NotificationChannel>, db: Arc<DatabaseManager>) -> Self {
        Self {
            channel,
            db,
            pacing: SEND_PACING,
        }
    }

    /// Override the inter-send delay (tests use zero).
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub async fn dispatch(
        &self,
        message: &OutboundMessage,
        recipients: &[i64],
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        if recipients.is_empty() {
            info!("No recipients for broadcast, nothing to send");
            return report;
        }

        for (index, &recipient) in recipients.iter().enumerate() {
            if index > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            let outcome =
                match tokio::time::timeout(SEND_TIMEOUT, self.channel.send(recipient, message))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => SendOutcome::Failed("send timed out".to_string()),
                };

            match outcome {
                SendOutcome::Delivered => report.success += 1,
                SendOutcome::Blocked => {
                    report.failed += 1;
                    // Permanent rejection: stop contacting this member.
                    if let Err(e) = Member::mark_blocked(&self.db.pool, recipient).await {
                        error!("Failed to mark member {recipient} blocked: {e}");
                    }
                }
                SendOutcome::Failed(reason) => {
                    report.failed += 1;
                    error!("Failed to send to {recipient}: {reason}");
                }
            }
        }

        info!(
            "Broadcast finished: {} delivered, {} failed of {} recipients",
            report.success,
            report.failed,
            recipients.len()
        );
        report
    }
}
