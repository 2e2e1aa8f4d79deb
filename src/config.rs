use anyhow::{anyhow, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub database_url: String,
    pub http_port: u16,
    /// Chat id of the paid community channel. Access revocation is skipped
    /// when unset (useful in staging).
    pub community_chat_id: Option<i64>,
    /// Chat that receives admin notices about automatic expiries.
    pub admin_chat_id: Option<i64>,
    /// Renewal link embedded in expiry notices.
    pub payment_link: Option<String>,
    /// Directory holding campaign descriptor JSON files.
    pub campaigns_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        if token.trim().is_empty() {
            return Err(anyhow!("TELEGRAM_BOT_TOKEN must be set"));
        }

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:./data/club.db".to_string());
        let database_url = if database_url.trim().is_empty() {
            "sqlite:./data/club.db".to_string()
        } else {
            database_url
        };

        let port_str = env::var("HTTP_PORT")
            .unwrap_or_else(|_| "3000".to_string());
        let http_port = port_str.trim()
            .parse()
            .map_err(|_| anyhow!("Invalid HTTP_PORT"))?;

        let community_chat_id = parse_optional_id("COMMUNITY_CHAT_ID")?;
        let admin_chat_id = parse_optional_id("ADMIN_CHAT_ID")?;

        let payment_link = env::var("PAYMENT_LINK")
            .ok()
            .filter(|link| !link.trim().is_empty());

        let campaigns_dir = env::var("CAMPAIGNS_DIR")
            .unwrap_or_else(|_| "./campaigns".to_string());

        Ok(Config {
            telegram_bot_token: token,
            database_url,
            http_port,
            community_chat_id,
            admin_chat_id,
            payment_link,
            campaigns_dir,
        })
    }
}

fn parse_optional_id(var: &str) -> Result<Option<i64>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("Invalid {var}")),
        _ => Ok(None),
    }
}
