use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use super::audience::{self, AudienceSelector};
use super::descriptor::{self, Campaign};
use super::dispatcher::BroadcastDispatcher;
use crate::database::connection::DatabaseManager;
use crate::database::models::DeliveryRecord;

/// Drives scheduled campaign delivery: per (campaign, message) the state
/// machine is pending -> dispatching -> sent, recorded as a delivery row.
/// The record is written after the dispatch attempt, so a crash in between
/// re-dispatches on the next sweep (at-least-once for promotional traffic).
pub struct CampaignEngine {
    db: Arc<DatabaseManager>,
    dispatcher: BroadcastDispatcher,
    campaigns_dir: PathBuf,
}

impl CampaignEngine {
    pub fn new(
        db: Arc<DatabaseManager>,
        dispatcher: BroadcastDispatcher,
        campaigns_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            db,
            dispatcher,
            campaigns_dir: campaigns_dir.into(),
        }
    }

    /// One poll over every campaign descriptor. Storage failures abort the
    /// sweep cleanly with state unchanged; anything narrower is contained
    /// per message so siblings still go out.
    pub async fn run_sweep(&self, now: DateTime<Utc>) -> Result<()> {
        if !self.campaigns_dir.exists() {
            return Ok(());
        }

        let campaigns = descriptor::load_campaigns(&self.campaigns_dir);
        for campaign in &campaigns {
            self.process_campaign(campaign, now).await?;
        }
        Ok(())
    }

    async fn process_campaign(&self, campaign: &Campaign, now: DateTime<Utc>) -> Result<()> {
        let sent = DeliveryRecord::sent_message_ids(&self.db.pool, &campaign.campaign_id).await?;
        let campaign_selector = AudienceSelector::parse(&campaign.audience);

        for message in &campaign.messages {
            if sent.contains(&message.id) || message.send_at > now {
                continue;
            }

            info!(
                "Dispatching message '{}' of campaign '{}'",
                message.id, campaign.campaign_id
            );

            let selector = message
                .audience
                .as_deref()
                .map(AudienceSelector::parse)
                .unwrap_or_else(|| campaign_selector.clone());

            // Resolved fresh for every message: a member who subscribed
            // since the previous message must drop out of this one.
            let recipients = match audience::resolve(&self.db.pool, &selector).await {
                Ok(recipients) => recipients,
                Err(e) => {
                    error!(
                        "Audience resolution failed for message '{}' of campaign '{}': {e}",
                        message.id, campaign.campaign_id
                    );
                    continue;
                }
            };

            let outbound = match message.to_outbound(&self.campaigns_dir) {
                Ok(outbound) => outbound,
                Err(e) => {
                    error!(
                        "Bad content for message '{}' of campaign '{}': {e}",
                        message.id, campaign.campaign_id
                    );
                    continue;
                }
            };

            let mut targets: Vec<i64> = recipients.into_iter().collect();
            targets.sort_unstable();

            let report = self.dispatcher.dispatch(&outbound, &targets).await;

            DeliveryRecord::create(
                &self.db.pool,
                &campaign.campaign_id,
                &message.id,
                targets.len() as i64,
                report.success as i64,
            )
            .await?;

            info!(
                "Recorded delivery of '{}/{}': {} of {} delivered",
                campaign.campaign_id,
                message.id,
                report.success,
                targets.len()
            );
        }
        Ok(())
    }
}
