use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashSet;

use crate::utils::datetime::format_timestamp;

/// Idempotency marker for one (campaign, message) pair. Existence means the
/// message must never be dispatched again, across process restarts. Written
/// only after a dispatch attempt completes, so a crash mid-dispatch re-sends
/// on the next sweep (at-least-once).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub campaign_id: String,
    pub message_id: String,
    pub sent_at: String,
    pub target_count: i64,
    pub success_count: i64,
}

impl DeliveryRecord {
    pub async fn create(
        pool: &sqlx::SqlitePool,
        campaign_id: &str,
        message_id: &str,
        target_count: i64,
        success_count: i64,
    ) -> Result<Self, sqlx::Error> {
        let sent_at = format_timestamp(&Utc::now());

        sqlx::query(
            r#"
            INSERT INTO deliveries (campaign_id, message_id, sent_at, target_count, success_count)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (campaign_id, message_id) DO UPDATE SET
                sent_at = excluded.sent_at,
                target_count = excluded.target_count,
                success_count = excluded.success_count
            "#,
        )
        .bind(campaign_id)
        .bind(message_id)
        .bind(&sent_at)
        .bind(target_count)
        .bind(success_count)
        .execute(pool)
        .await?;

        Ok(DeliveryRecord {
            campaign_id: campaign_id.to_string(),
            message_id: message_id.to_string(),
            sent_at,
            target_count,
            success_count,
        })
    }

    pub async fn find(
        pool: &sqlx::SqlitePool,
        campaign_id: &str,
        message_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, DeliveryRecord>(
            "SELECT campaign_id, message_id, sent_at, target_count, success_count \
             FROM deliveries WHERE campaign_id = ? AND message_id = ?",
        )
        .bind(campaign_id)
        .bind(message_id)
        .fetch_optional(pool)
        .await
    }

    /// The sent set for one campaign.
    pub async fn sent_message_ids(
        pool: &sqlx::SqlitePool,
        campaign_id: &str,
    ) -> Result<HashSet<String>, sqlx::Error> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT message_id FROM deliveries WHERE campaign_id = ?")
                .bind(campaign_id)
                .fetch_all(pool)
                .await?;
        Ok(ids.into_iter().collect())
    }
}
