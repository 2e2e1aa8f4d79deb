use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

use crate::channel::{MediaAttachment, MessageButton, OutboundMessage};

/// A declarative broadcast plan: an ordered list of timed messages aimed at
/// a computed audience. Descriptors live as JSON files in the campaigns
/// directory and are re-read on every sweep, so edits between sweeps take
/// effect without a restart.
#[derive(Debug, Clone, Deserialize)]
pub struct Campaign {
    pub campaign_id: String,
    /// Audience selector name; unknown names fall back to the broadest
    /// defined audience at resolve time.
    #[serde(default = "default_audience")]
    pub audience: String,
    #[serde(default)]
    pub messages: Vec<CampaignMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CampaignMessage {
    pub id: String,
    pub send_at: DateTime<Utc>,
    #[serde(default)]
    pub text: Option<String>,
    /// Message body in a separate file, relative to the campaigns directory.
    #[serde(default)]
    pub text_file: Option<String>,
    /// Per-message audience override.
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub button_text: Option<String>,
    #[serde(default)]
    pub button_url: Option<String>,
    #[serde(default)]
    pub video_file: Option<String>,
    #[serde(default)]
    pub audio_file: Option<String>,
}

fn default_audience() -> String {
    "not-subscribed".to_string()
}

impl CampaignMessage {
    /// Assemble the transport-agnostic message, reading the body from disk
    /// when the descriptor points at a file.
    pub fn to_outbound(&self, base_dir: &Path) -> Result<OutboundMessage> {
        let text = match (&self.text, &self.text_file) {
            (Some(text), _) => text.clone(),
            (None, Some(file)) => std::fs::read_to_string(base_dir.join(file))
                .map_err(|e| anyhow!("could not read message file {file}: {e}"))?,
            (None, None) => return Err(anyhow!("message '{}' has no text", self.id)),
        };

        let button = match (&self.button_text, &self.button_url) {
            (Some(label), Some(url)) => Some(MessageButton {
                label: label.clone(),
                url: url.clone(),
            }),
            (None, None) => None,
            _ => {
                warn!(
                    "Message '{}' has a partial button definition, dropping the button",
                    self.id
                );
                None
            }
        };

        let media = match (&self.video_file, &self.audio_file) {
            (Some(file), _) => Some(MediaAttachment::Video(base_dir.join(file))),
            (None, Some(file)) => Some(MediaAttachment::Audio(base_dir.join(file))),
            (None, None) => None,
        };

        Ok(OutboundMessage {
            text,
            button,
            media,
        })
    }
}

/// Load every campaign descriptor in `dir`. A file that fails to parse, or
/// a campaign with duplicate message ids, is a configuration failure: it is
/// logged and skipped so one broken descriptor never takes down the sweep.
pub fn load_campaigns(dir: &Path) -> Vec<Campaign> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot read campaigns directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map(|ext| ext == "json").unwrap_or(false))
        .collect();
    paths.sort();

    let mut campaigns = Vec::new();
    for path in paths {
        match load_campaign_file(&path) {
            Ok(campaign) => campaigns.push(campaign),
            Err(e) => error!("Skipping campaign descriptor {}: {}", path.display(), e),
        }
    }
    campaigns
}

fn load_campaign_file(path: &Path) -> Result<Campaign> {
    let raw = std::fs::read_to_string(path)?;
    let campaign: Campaign = serde_json::from_str(&raw)?;

    let mut seen = HashSet::new();
    for message in &campaign.messages {
        if !seen.insert(message.id.as_str()) {
            return Err(anyhow!(
                "campaign '{}' has duplicate message id '{}'",
                campaign.campaign_id,
                message.id
            ));
        }
    }
    Ok(campaign)
}
