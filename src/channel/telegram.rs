use async_trait::async_trait;
use teloxide::payloads::{SendAudioSetters, SendMessageSetters, SendVideoSetters};
use teloxide::requests::Requester;
use teloxide::types::{
    ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode, UserId,
};
use teloxide::{ApiError, Bot, RequestError};
use tracing::warn;
use url::Url;

use super::{MediaAttachment, MessageButton, NotificationChannel, OutboundMessage, SendOutcome};

/// Telegram Bot API transport. Access revocation is a ban-then-unban on the
/// community channel: the member is kicked but may be re-invited after a
/// renewal.
pub struct TelegramChannel {
    bot: Bot,
    community_chat_id: Option<i64>,
}

impl TelegramChannel {
    pub fn new(bot: Bot, community_chat_id: Option<i64>) -> Self {
        Self {
            bot,
            community_chat_id,
        }
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    async fn send(&self, recipient: i64, message: &OutboundMessage) -> SendOutcome {
        let markup = message
            .button
            .as_ref()
            .and_then(|button| build_keyboard(button, recipient));
        let chat_id = ChatId(recipient);

        let result = match &message.media {
            Some(MediaAttachment::Video(path)) => {
                let mut request = self
                    .bot
                    .send_video(chat_id, InputFile::file(path.clone()))
                    .caption(message.text.clone())
                    .parse_mode(ParseMode::Html);
                if let Some(markup) = markup {
                    request = request.reply_markup(markup);
                }
                request.await
            }
            Some(MediaAttachment::Audio(path)) => {
                let mut request = self
                    .bot
                    .send_audio(chat_id, InputFile::file(path.clone()))
                    .caption(message.text.clone())
                    .parse_mode(ParseMode::Html);
                if let Some(markup) = markup {
                    request = request.reply_markup(markup);
                }
                request.await
            }
            None => {
                let mut request = self
                    .bot
                    .send_message(chat_id, message.text.clone())
                    .parse_mode(ParseMode::Html);
                if let Some(markup) = markup {
                    request = request.reply_markup(markup);
                }
                request.await
            }
        };

        match result {
            Ok(_) => SendOutcome::Delivered,
            Err(err) => classify_error(err),
        }
    }

    async fn revoke_access(&self, recipient: i64) -> anyhow::Result<()> {
        let Some(community) = self.community_chat_id else {
            warn!("No community chat configured, skipping access revocation for {recipient}");
            return Ok(());
        };
        let chat_id = ChatId(community);
        let user_id = UserId(recipient as u64);

        // Ban then immediately unban: removes the member without leaving a
        // permanent ban that would block re-joining after renewal.
        self.bot.ban_chat_member(chat_id, user_id).await?;
        self.bot.unban_chat_member(chat_id, user_id).await?;
        Ok(())
    }
}

fn classify_error(err: RequestError) -> SendOutcome {
    match err {
        RequestError::Api(ApiError::BotBlocked)
        | RequestError::Api(ApiError::UserDeactivated)
        | RequestError::Api(ApiError::ChatNotFound) => SendOutcome::Blocked,
        other => SendOutcome::Failed(other.to_string()),
    }
}

fn build_keyboard(button: &MessageButton, recipient: i64) -> Option<InlineKeyboardMarkup> {
    let url = tracked_url(&button.url, recipient)?;
    Some(InlineKeyboardMarkup::new([[InlineKeyboardButton::url(
        button.label.clone(),
        url,
    )]]))
}

/// Append the recipient id as a `tg_id` query parameter so a payment made
/// through the link can be attributed back to the member.
fn tracked_url(base: &str, recipient: i64) -> Option<Url> {
    let separator = if base.contains('?') { '&' } else { '?' };
    match format!("{base}{separator}tg_id={recipient}").parse::<Url>() {
        Ok(url) => Some(url),
        Err(e) => {
            warn!("Invalid button URL '{base}': {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_api_errors_map_to_permanent_failure() {
        assert_eq!(
            classify_error(RequestError::Api(ApiError::BotBlocked)),
            SendOutcome::Blocked
        );
        assert_eq!(
            classify_error(RequestError::Api(ApiError::UserDeactivated)),
            SendOutcome::Blocked
        );
    }

    #[test]
    fn other_api_errors_are_transient() {
        let outcome = classify_error(RequestError::Api(ApiError::MessageNotModified));
        assert!(matches!(outcome, SendOutcome::Failed(_)));
    }

    #[test]
    fn button_urls_carry_recipient_attribution() {
        let url = tracked_url("https://example.com/pay", 42);
        assert_eq!(url.as_ref().and_then(Url::query), Some("tg_id=42"));

        let url = tracked_url("https://example.com/pay?plan=club", 42);
        assert_eq!(url.as_ref().and_then(Url::query), Some("plan=club&tg_id=42"));
    }

    #[test]
    fn invalid_button_urls_drop_the_button() {
        let button = MessageButton {
            label: "Join".to_string(),
            url: "not a url".to_string(),
        };
        assert!(build_keyboard(&button, 42).is_none());
    }
}
