use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::warn;

use crate::database::models::{Member, Subscription, WANTS_REMINDER_TAG};
use crate::utils::datetime::parse_timestamp;

/// A named rule computing the current recipient set for a campaign message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudienceSelector {
    /// Non-blocked members with no currently active subscription.
    NotSubscribed,
    /// As above, restricted to members who opted into a reminder.
    OptedInNotSubscribed,
    /// Members whose active subscription started before the cutoff, for
    /// nudging stragglers without hitting fresh renewals.
    ActiveNotRenewedSince(DateTime<Utc>),
}

impl AudienceSelector {
    /// Parse a selector name from a campaign descriptor. Unknown names fall
    /// back to the broadest defined audience, never to an empty set, so a
    /// typo in a descriptor cannot silently skip a campaign.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw {
            "not-subscribed" => Self::NotSubscribed,
            "opted-in-not-subscribed" => Self::OptedInNotSubscribed,
            _ => {
                if let Some(cutoff) = raw.strip_prefix("active-not-renewed-since=") {
                    match parse_timestamp(cutoff.trim()) {
                        Ok(cutoff) => return Self::ActiveNotRenewedSince(cutoff),
                        Err(e) => {
                            warn!("Bad cutoff in selector '{raw}': {e}, using not-subscribed")
                        }
                    }
                } else {
                    warn!("Unknown audience selector '{raw}', using not-subscribed");
                }
                Self::NotSubscribed
            }
        }
    }
}

/// Compute the recipient set for a selector from current store state. Pure
/// read, no side effects; blocked members are excluded by every selector.
pub async fn resolve(
    pool: &SqlitePool,
    selector: &AudienceSelector,
) -> Result<HashSet<i64>, sqlx::Error> {
    let members = Member::list_unblocked(pool).await?;
    let unblocked: HashSet<i64> = members.iter().map(|m| m.id).collect();

    match selector {
        AudienceSelector::NotSubscribed => {
            let active: HashSet<i64> =
                Subscription::active_member_ids(pool).await?.into_iter().collect();
            Ok(unblocked.difference(&active).copied().collect())
        }
        AudienceSelector::OptedInNotSubscribed => {
            let opted_in: HashSet<i64> = members
                .iter()
                .filter(|m| m.has_tag(WANTS_REMINDER_TAG))
                .map(|m| m.id)
                .collect();
            let active: HashSet<i64> =
                Subscription::active_member_ids(pool).await?.into_iter().collect();
            Ok(opted_in.difference(&active).copied().collect())
        }
        AudienceSelector::ActiveNotRenewedSince(cutoff) => {
            let stale: HashSet<i64> =
                Subscription::active_member_ids_started_before(pool, *cutoff)
                    .await?
                    .into_iter()
                    .collect();
            Ok(stale.intersection(&unblocked).copied().collect())
        }
    }
}
