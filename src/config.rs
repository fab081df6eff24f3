use anyhow::{Context, Result};

/// Runtime configuration, supplied entirely through the environment.
///
/// Missing required values abort startup before any update is processed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bot token from BotFather.
    pub bot_token: String,
    /// Shared secret Telegram echoes back in the webhook secret-token header.
    pub webhook_secret: String,
    /// Chat that receives relayed requests. Negative for groups.
    pub support_chat_id: i64,
    /// Optional support handle for the direct-contact line in failure replies.
    pub support_username: Option<String>,
    /// Listen address for the webhook server.
    pub bind_addr: String,
    /// Public base URL; when set, the webhook is registered with Telegram at
    /// startup.
    pub public_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build the config from a lookup function. Extracted so validation can
    /// be tested without mutating the process environment.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bot_token = var("BOT_TOKEN").context("BOT_TOKEN is not set")?;
        let webhook_secret = var("BOT_SECRET").context("BOT_SECRET is not set")?;

        let support_chat_id = var("SUPPORT_USER_ID")
            .context("SUPPORT_USER_ID is not set")?
            .trim()
            .parse::<i64>()
            .context("SUPPORT_USER_ID must be a numeric chat id")?;

        let support_username = var("SUPPORT_USERNAME")
            .map(|u| u.trim().trim_start_matches('@').to_string())
            .filter(|u| !u.is_empty());

        let bind_addr = var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let public_url = var("WEBHOOK_PUBLIC_URL")
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());

        Ok(Config {
            bot_token,
            webhook_secret,
            support_chat_id,
            support_username,
            bind_addr,
            public_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| map.get(key).cloned())
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("BOT_TOKEN", "123456:ABC-DEF"),
        ("BOT_SECRET", "s3cret"),
        ("SUPPORT_USER_ID", "987654321"),
    ];

    #[test]
    fn loads_with_only_required_vars() {
        let config = load(REQUIRED).unwrap();
        assert_eq!(config.bot_token, "123456:ABC-DEF");
        assert_eq!(config.webhook_secret, "s3cret");
        assert_eq!(config.support_chat_id, 987654321);
        assert_eq!(config.support_username, None);
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.public_url, None);
    }

    #[test]
    fn missing_bot_token_is_an_error() {
        let err = load(&[("BOT_SECRET", "x"), ("SUPPORT_USER_ID", "1")])
            .unwrap_err()
            .to_string();
        assert!(err.contains("BOT_TOKEN"));
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = load(&[("BOT_TOKEN", "x"), ("SUPPORT_USER_ID", "1")])
            .unwrap_err()
            .to_string();
        assert!(err.contains("BOT_SECRET"));
    }

    #[test]
    fn missing_support_id_is_an_error() {
        let err = load(&[("BOT_TOKEN", "x"), ("BOT_SECRET", "y")])
            .unwrap_err()
            .to_string();
        assert!(err.contains("SUPPORT_USER_ID"));
    }

    #[test]
    fn non_numeric_support_id_is_an_error() {
        let mut pairs = REQUIRED.to_vec();
        pairs[2] = ("SUPPORT_USER_ID", "@moderator");
        let err = load(&pairs).unwrap_err().to_string();
        assert!(err.contains("numeric"));
    }

    #[test]
    fn group_chat_ids_may_be_negative() {
        let mut pairs = REQUIRED.to_vec();
        pairs[2] = ("SUPPORT_USER_ID", "-100123456");
        let config = load(&pairs).unwrap();
        assert_eq!(config.support_chat_id, -100123456);
    }

    #[test]
    fn support_username_strips_leading_at() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SUPPORT_USERNAME", "@moderator"));
        let config = load(&pairs).unwrap();
        assert_eq!(config.support_username.as_deref(), Some("moderator"));
    }

    #[test]
    fn empty_support_username_is_ignored() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SUPPORT_USERNAME", "  "));
        let config = load(&pairs).unwrap();
        assert_eq!(config.support_username, None);
    }

    #[test]
    fn public_url_drops_trailing_slash() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("WEBHOOK_PUBLIC_URL", "https://bot.example.com/"));
        let config = load(&pairs).unwrap();
        assert_eq!(config.public_url.as_deref(), Some("https://bot.example.com"));
    }
}
