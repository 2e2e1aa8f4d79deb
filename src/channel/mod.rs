use async_trait::async_trait;
use std::path::PathBuf;

/// Telegram implementation of the notification channel
pub mod telegram;

/// Per-recipient result of a send attempt. The split drives the error
/// policy: blocked recipients are marked and never retried, anything else
/// is left for the next sweep to pick up naturally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// The recipient has blocked the channel or is unreachable for good.
    Blocked,
    /// Transient failure (network, rate limit, timeout).
    Failed(String),
}

/// Optional media attached to an outbound message.
#[derive(Debug, Clone)]
pub enum MediaAttachment {
    Video(PathBuf),
    Audio(PathBuf),
}

/// An inline button under the message. The recipient id is appended to the
/// URL as a `tg_id` query parameter so payments made through the link can
/// be attributed back to the member.
#[derive(Debug, Clone)]
pub struct MessageButton {
    pub label: String,
    pub url: String,
}

/// One message as handed to the channel, transport-agnostic.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub text: String,
    pub button: Option<MessageButton>,
    pub media: Option<MediaAttachment>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            button: None,
            media: None,
        }
    }
}

/// Outbound messaging transport. Consumed by the lifecycle engine for
/// reminders and expiry notices and by the broadcast dispatcher for
/// campaign messages; injected at construction, never reached through
/// globals.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Deliver one message to one recipient.
    async fn send(&self, recipient: i64, message: &OutboundMessage) -> SendOutcome;

    /// Remove the recipient's access to the paid community. Used only by
    /// the expiry path; failure must not block the expiry transition.
    async fn revoke_access(&self, recipient: i64) -> anyhow::Result<()>;
}
