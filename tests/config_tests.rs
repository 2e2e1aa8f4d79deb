use club_membership_bot::config::Config;
use std::env;
use std::sync::Mutex;

// Mutex to ensure config tests run sequentially to avoid environment variable conflicts
static CONFIG_TEST_MUTEX: Mutex<()> = Mutex::new(());

fn clear_env() {
    for var in [
        "TELEGRAM_BOT_TOKEN",
        "DATABASE_URL",
        "HTTP_PORT",
        "COMMUNITY_CHAT_ID",
        "ADMIN_CHAT_ID",
        "PAYMENT_LINK",
        "CAMPAIGNS_DIR",
    ] {
        env::remove_var(var);
    }
}

#[test]
fn test_config_from_env_with_all_vars() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    env::set_var("TELEGRAM_BOT_TOKEN", "test_token_123");
    env::set_var("DATABASE_URL", "sqlite:test.db");
    env::set_var("HTTP_PORT", "8080");
    env::set_var("COMMUNITY_CHAT_ID", "-1001234567890");
    env::set_var("ADMIN_CHAT_ID", "42");
    env::set_var("PAYMENT_LINK", "https://example.com/pay");
    env::set_var("CAMPAIGNS_DIR", "/var/data/campaigns");

    let config = Config::from_env().unwrap();

    assert_eq!(config.telegram_bot_token, "test_token_123");
    assert_eq!(config.database_url, "sqlite:test.db");
    assert_eq!(config.http_port, 8080);
    assert_eq!(config.community_chat_id, Some(-1001234567890));
    assert_eq!(config.admin_chat_id, Some(42));
    assert_eq!(config.payment_link.as_deref(), Some("https://example.com/pay"));
    assert_eq!(config.campaigns_dir, "/var/data/campaigns");

    clear_env();
}

#[test]
fn test_config_from_env_with_defaults() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    env::set_var("TELEGRAM_BOT_TOKEN", "required_token");

    let config = Config::from_env().unwrap();

    assert_eq!(config.telegram_bot_token, "required_token");
    assert_eq!(config.database_url, "sqlite:./data/club.db");
    assert_eq!(config.http_port, 3000);
    assert_eq!(config.community_chat_id, None);
    assert_eq!(config.admin_chat_id, None);
    assert_eq!(config.payment_link, None);
    assert_eq!(config.campaigns_dir, "./campaigns");

    clear_env();
}

#[test]
fn test_config_missing_required_token() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    let result = Config::from_env();
    assert!(result.is_err());

    let error_msg = result.unwrap_err().to_string();
    assert!(error_msg.contains("TELEGRAM_BOT_TOKEN must be set"));
}

#[test]
fn test_config_empty_token_rejected() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    env::set_var("TELEGRAM_BOT_TOKEN", "   ");

    let result = Config::from_env();
    assert!(result.is_err());

    clear_env();
}

#[test]
fn test_config_invalid_port() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    env::set_var("TELEGRAM_BOT_TOKEN", "token");
    env::set_var("HTTP_PORT", "not-a-port");

    let result = Config::from_env();
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Invalid HTTP_PORT"));

    clear_env();
}

#[test]
fn test_config_invalid_chat_id() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    env::set_var("TELEGRAM_BOT_TOKEN", "token");
    env::set_var("COMMUNITY_CHAT_ID", "not-a-number");

    let result = Config::from_env();
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Invalid COMMUNITY_CHAT_ID"));

    clear_env();
}
