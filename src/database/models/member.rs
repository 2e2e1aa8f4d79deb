use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::datetime::format_timestamp;

/// Opt-in tag set by members who asked to be pinged when enrollment reopens.
pub const WANTS_REMINDER_TAG: &str = "wants-reminder";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub email: Option<String>,
    pub name: Option<String>,
    /// Space-separated opt-in tags, e.g. "wants-reminder".
    pub tags: String,
    /// Set only by delivery failures, never by user input.
    pub blocked: bool,
    pub created_at: String,
}

impl Member {
    /// Create a member on first contact, or refresh contact details on a
    /// later one. Existing email/name survive a `None` update.
    pub async fn upsert(
        pool: &sqlx::SqlitePool,
        id: i64,
        email: Option<String>,
        name: Option<String>,
    ) -> Result<Self, sqlx::Error> {
        let now = format_timestamp(&Utc::now());

        sqlx::query(
            r#"
            INSERT INTO members (id, email, name, tags, blocked, created_at)
            VALUES (?, ?, ?, '', 0, ?)
            ON CONFLICT (id) DO UPDATE SET
                email = COALESCE(excluded.email, members.email),
                name = COALESCE(excluded.name, members.name)
            "#,
        )
        .bind(id)
        .bind(&email)
        .bind(&name)
        .bind(&now)
        .execute(pool)
        .await?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Member>(
            "SELECT id, email, name, tags, blocked, created_at FROM members WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Email lookup for payment events that arrive without a member id.
    pub async fn find_by_email(
        pool: &sqlx::SqlitePool,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Member>(
            "SELECT id, email, name, tags, blocked, created_at FROM members \
             WHERE LOWER(email) = LOWER(?)",
        )
        .bind(email.trim())
        .fetch_optional(pool)
        .await
    }

    pub async fn list_unblocked(pool: &sqlx::SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Member>(
            "SELECT id, email, name, tags, blocked, created_at FROM members \
             WHERE blocked = 0 ORDER BY id",
        )
        .fetch_all(pool)
        .await
    }

    /// Flag a member the channel refuses to deliver to. One-way: nothing in
    /// the system clears the flag automatically.
    pub async fn mark_blocked(pool: &sqlx::SqlitePool, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE members SET blocked = 1 WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Add an opt-in tag if not already present.
    pub async fn add_tag(
        pool: &sqlx::SqlitePool,
        id: i64,
        tag: &str,
    ) -> Result<(), sqlx::Error> {
        let Some(member) = Self::find_by_id(pool, id).await? else {
            return Err(sqlx::Error::RowNotFound);
        };
        if member.has_tag(tag) {
            return Ok(());
        }
        let tags = if member.tags.is_empty() {
            tag.to_string()
        } else {
            format!("{} {}", member.tags, tag)
        };
        sqlx::query("UPDATE members SET tags = ? WHERE id = ?")
            .bind(&tags)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.split_whitespace().any(|t| t == tag)
    }
}
