use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::datetime::{format_timestamp, parse_timestamp};

/// Length of one paid period.
pub const PERIOD_DAYS: i64 = 30;
/// Days into a period after which the renewal reminder goes out. Business
/// SLA (warn before the due date), distinct from the period length itself.
pub const REMINDER_THRESHOLD_DAYS: i64 = 27;
/// Extra days past nominal expiry before access is revoked, tolerating
/// late-arriving payment confirmations.
pub const GRACE_DAYS: i64 = 3;

/// One paid membership period. Status only ever moves active -> expired;
/// re-subscribing inserts a new row rather than resurrecting this one.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub member_id: i64,
    pub started_at: String,
    pub expires_at: String,
    pub status: String,
    pub reminder_sent: bool,
    /// Count of paid periods for this member, including this one.
    pub renewal_sequence: i64,
}

const COLUMNS: &str =
    "id, member_id, started_at, expires_at, status, reminder_sent, renewal_sequence";

impl Subscription {
    /// Start a new paid period for a member, superseding any active one.
    /// Runs in a single transaction so there is no window in which two
    /// active rows exist; the partial unique index on (member_id) backs
    /// this up against concurrent callers.
    pub async fn start_or_renew(
        pool: &sqlx::SqlitePool,
        member_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "UPDATE subscriptions SET status = 'expired' \
             WHERE member_id = ? AND status = 'active'",
        )
        .bind(member_id)
        .execute(&mut tx)
        .await?;

        let prior: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE member_id = ?")
                .bind(member_id)
                .fetch_one(&mut tx)
                .await?;

        let id = Uuid::new_v4().to_string();
        let started_at = format_timestamp(&now);
        let expires_at = format_timestamp(&(now + Duration::days(PERIOD_DAYS)));
        let renewal_sequence = prior + 1;

        sqlx::query(
            r#"
            INSERT INTO subscriptions
                (id, member_id, started_at, expires_at, status, reminder_sent, renewal_sequence)
            VALUES (?, ?, ?, ?, 'active', 0, ?)
            "#,
        )
        .bind(&id)
        .bind(member_id)
        .bind(&started_at)
        .bind(&expires_at)
        .bind(renewal_sequence)
        .execute(&mut tx)
        .await?;

        tx.commit().await?;

        Ok(Subscription {
            id,
            member_id,
            started_at,
            expires_at,
            status: "active".to_string(),
            reminder_sent: false,
            renewal_sequence,
        })
    }

    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {COLUMNS} FROM subscriptions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn active_for_member(
        pool: &sqlx::SqlitePool,
        member_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {COLUMNS} FROM subscriptions WHERE member_id = ? AND status = 'active'"
        ))
        .bind(member_id)
        .fetch_optional(pool)
        .await
    }

    /// All active subscriptions, for admin reporting.
    pub async fn list_active(pool: &sqlx::SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {COLUMNS} FROM subscriptions WHERE status = 'active' ORDER BY started_at"
        ))
        .fetch_all(pool)
        .await
    }

    /// Active subscriptions due a renewal reminder: no reminder sent yet
    /// and at least REMINDER_THRESHOLD_DAYS into the period. The boundary
    /// instant itself is included.
    pub async fn reminder_candidates(
        pool: &sqlx::SqlitePool,
        now: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let cutoff = format_timestamp(&(now - Duration::days(REMINDER_THRESHOLD_DAYS)));
        sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {COLUMNS} FROM subscriptions \
             WHERE status = 'active' AND reminder_sent = 0 AND started_at <= ? \
             ORDER BY started_at"
        ))
        .bind(&cutoff)
        .fetch_all(pool)
        .await
    }

    /// Active subscriptions past expiry plus the grace period. A renewal
    /// supersedes the old row, so a superseded subscription never shows up
    /// here even when its expires_at has long passed.
    pub async fn expiry_candidates(
        pool: &sqlx::SqlitePool,
        now: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let cutoff = format_timestamp(&(now - Duration::days(GRACE_DAYS)));
        sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {COLUMNS} FROM subscriptions \
             WHERE status = 'active' AND expires_at <= ? \
             ORDER BY expires_at"
        ))
        .bind(&cutoff)
        .fetch_all(pool)
        .await
    }

    /// Idempotent: repeated calls leave reminder_sent = true and nothing else.
    pub async fn mark_reminder_sent(
        pool: &sqlx::SqlitePool,
        id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE subscriptions SET reminder_sent = 1 WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Transition active -> expired. Conditional on the current status so a
    /// record never regresses and repeated calls are no-ops.
    pub async fn mark_expired(pool: &sqlx::SqlitePool, id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE subscriptions SET status = 'expired' WHERE id = ? AND status = 'active'")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Push out the active subscription's expiry by `days`. Returns the
    /// updated record, or None when the member has no active subscription.
    pub async fn extend(
        pool: &sqlx::SqlitePool,
        member_id: i64,
        days: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let Some(sub) = Self::active_for_member(pool, member_id).await? else {
            return Ok(None);
        };
        let current = parse_timestamp(&sub.expires_at)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let new_expires = format_timestamp(&(current + Duration::days(days)));

        sqlx::query("UPDATE subscriptions SET expires_at = ? WHERE id = ? AND status = 'active'")
            .bind(&new_expires)
            .bind(&sub.id)
            .execute(pool)
            .await?;

        Self::find_by_id(pool, &sub.id).await
    }

    /// Member ids whose active subscription started before the cutoff,
    /// i.e. whose current period predates a marketing cutoff date.
    pub async fn active_member_ids_started_before(
        pool: &sqlx::SqlitePool,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT member_id FROM subscriptions \
             WHERE status = 'active' AND started_at < ?",
        )
        .bind(format_timestamp(&cutoff))
        .fetch_all(pool)
        .await
    }

    /// Member ids with any active subscription.
    pub async fn active_member_ids(pool: &sqlx::SqlitePool) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT member_id FROM subscriptions WHERE status = 'active'")
            .fetch_all(pool)
            .await
    }
}
