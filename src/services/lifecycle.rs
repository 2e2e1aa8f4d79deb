use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::channel::{NotificationChannel, OutboundMessage, SendOutcome};
use crate::database::connection::DatabaseManager;
use crate::database::models::{Member, Subscription};
use crate::utils::datetime::format_datetime;
use crate::utils::validation::is_valid_email;

/// Sent when a subscription reaches the reminder threshold.
pub const REMINDER_TEXT: &str = "\u{23f0} <b>Subscription reminder</b>\n\n\
Hi! Your club membership renews in <b>3 days</b>.\n\n\
If auto-payment is on, everything happens automatically. \
If not, please renew in time so you don't lose access.";

/// Sent when a subscription is expired after the grace period. `{payment_link}`
/// is replaced with the configured renewal link.
pub const EXPIRY_NOTICE_TEXT: &str = "\u{26a0} <b>Subscription expired</b>\n\n\
Unfortunately your club membership has ended.\n\n\
To keep receiving materials and stay in the circle, please renew.\n\n\
\u{1f4b3} Renew here: {payment_link}\n\nWe'd love to see you back!";

/// Decides, from timestamps and status alone, who gets a reminder, who has
/// expired, and who may re-enter. Both sweeps are idempotent and contain
/// failures per subscription; notification is a best-effort side effect,
/// never a precondition for a state transition.
pub struct LifecycleEngine {
    db: Arc<DatabaseManager>,
    channel: Arc<dyn NotificationChannel>,
    payment_link: Option<String>,
    admin_chat_id: Option<i64>,
}

impl LifecycleEngine {
    pub fn new(
        db: Arc<DatabaseManager>,
        channel: Arc<dyn NotificationChannel>,
        payment_link: Option<String>,
        admin_chat_id: Option<i64>,
    ) -> Self {
        Self {
            db,
            channel,
            payment_link,
            admin_chat_id,
        }
    }

    /// Record a member on first interaction, validating the contact email.
    pub async fn register_member(
        &self,
        member_id: i64,
        email: Option<String>,
        name: Option<String>,
    ) -> Result<Member> {
        let email = match email {
            Some(email) if is_valid_email(&email) => Some(email.trim().to_string()),
            Some(email) => {
                warn!("Rejecting invalid contact email for member {member_id}: '{email}'");
                None
            }
            None => None,
        };
        Ok(Member::upsert(&self.db.pool, member_id, email, name).await?)
    }

    /// Confirmed payment: start a fresh paid period, superseding any active
    /// one. Also the admin-facing Renew operation.
    pub async fn start_or_renew(&self, member_id: i64) -> Result<Subscription> {
        Member::upsert(&self.db.pool, member_id, None, None).await?;
        let subscription =
            Subscription::start_or_renew(&self.db.pool, member_id, Utc::now()).await?;
        info!(
            "Subscription started for member {member_id} (renewal #{})",
            subscription.renewal_sequence
        );
        Ok(subscription)
    }

    pub async fn is_member_subscribed(&self, member_id: i64) -> Result<bool> {
        Ok(Subscription::active_for_member(&self.db.pool, member_id)
            .await?
            .is_some())
    }

    pub async fn list_active_subscribers(&self) -> Result<Vec<Subscription>> {
        Ok(Subscription::list_active(&self.db.pool).await?)
    }

    /// Admin override: push out the active subscription's expiry.
    pub async fn extend_expiry(&self, member_id: i64, days: i64) -> Result<Option<Subscription>> {
        let extended = Subscription::extend(&self.db.pool, member_id, days).await?;
        if extended.is_some() {
            info!("Extended subscription of member {member_id} by {days} days");
        }
        Ok(extended)
    }

    /// Admin override: expire the member's active subscription now and
    /// revoke access, skipping the notice.
    pub async fn force_expire(&self, member_id: i64) -> Result<bool> {
        let Some(sub) = Subscription::active_for_member(&self.db.pool, member_id).await? else {
            return Ok(false);
        };
        if let Err(e) = self.channel.revoke_access(member_id).await {
            error!("Access revocation failed for member {member_id}: {e}");
        }
        Subscription::mark_expired(&self.db.pool, &sub.id).await?;
        info!("Force-expired subscription of member {member_id}");
        Ok(true)
    }

    /// Send renewal reminders to every subscription past the reminder
    /// threshold. Marks the flag only after a successful (or permanently
    /// failed) send, so a transient failure retries on the next sweep.
    pub async fn run_reminder_sweep(&self, now: DateTime<Utc>) -> Result<usize> {
        info!("Running reminder sweep");
        let candidates = Subscription::reminder_candidates(&self.db.pool, now).await?;
        let mut sent = 0;

        for sub in candidates {
            let message = OutboundMessage::text(REMINDER_TEXT);
            match self.channel.send(sub.member_id, &message).await {
                SendOutcome::Delivered => {
                    Subscription::mark_reminder_sent(&self.db.pool, &sub.id).await?;
                    info!("Sent renewal reminder to member {}", sub.member_id);
                    sent += 1;
                }
                SendOutcome::Blocked => {
                    // Stop contacting; the reminder will never get through.
                    Member::mark_blocked(&self.db.pool, sub.member_id).await?;
                    Subscription::mark_reminder_sent(&self.db.pool, &sub.id).await?;
                    warn!("Member {} has blocked the bot, reminder dropped", sub.member_id);
                }
                SendOutcome::Failed(reason) => {
                    warn!(
                        "Reminder to member {} failed, will retry next sweep: {reason}",
                        sub.member_id
                    );
                }
            }
        }
        Ok(sent)
    }

    /// Expire every subscription past its grace period: best-effort notice,
    /// one revocation attempt, then the status transition. Neither send nor
    /// revocation failure blocks the transition once grace has elapsed.
    pub async fn run_expiry_sweep(&self, now: DateTime<Utc>) -> Result<usize> {
        info!("Running expiry sweep");
        let candidates = Subscription::expiry_candidates(&self.db.pool, now).await?;
        let mut expired = 0;

        for sub in candidates {
            let notice = OutboundMessage::text(self.expiry_notice());
            match self.channel.send(sub.member_id, &notice).await {
                SendOutcome::Delivered => {}
                SendOutcome::Blocked => {
                    if let Err(e) = Member::mark_blocked(&self.db.pool, sub.member_id).await {
                        error!("Failed to mark member {} blocked: {e}", sub.member_id);
                    }
                }
                SendOutcome::Failed(reason) => {
                    warn!("Expiry notice to member {} failed: {reason}", sub.member_id);
                }
            }

            // One attempt only. A failed revoke is a defect to reconcile
            // out-of-band, not a reason to keep the record active.
            if let Err(e) = self.channel.revoke_access(sub.member_id).await {
                error!(
                    "Access revocation failed for member {}, reconcile manually: {e}",
                    sub.member_id
                );
            }

            Subscription::mark_expired(&self.db.pool, &sub.id).await?;
            info!("Expired subscription of member {}", sub.member_id);
            expired += 1;

            self.notify_admin_of_expiry(sub.member_id).await;
        }
        Ok(expired)
    }

    fn expiry_notice(&self) -> String {
        let link = self.payment_link.as_deref().unwrap_or("contact support");
        EXPIRY_NOTICE_TEXT.replace("{payment_link}", link)
    }

    async fn notify_admin_of_expiry(&self, member_id: i64) {
        let Some(admin) = self.admin_chat_id else {
            return;
        };
        let text = format!(
            "\u{1f6ab} <b>Automatic removal</b>\n\nSubscription expired (grace period over):\n\
             member <code>{member_id}</code> was removed from the channel on {}.",
            format_datetime(&Utc::now())
        );
        if let SendOutcome::Failed(reason) =
            self.channel.send(admin, &OutboundMessage::text(text)).await
        {
            warn!("Admin notice failed: {reason}");
        }
    }
}
