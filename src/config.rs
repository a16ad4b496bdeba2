use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub discord: DiscordConfig,
    pub webhooks: WebhookConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscordConfig {
    pub bot_token: String,
    /// Channel that receives the registration panel on startup.
    pub registration_channel_id: String,
    #[serde(default)]
    pub consult_channel_id: Option<String>,
    #[serde(default)]
    pub manage_channel_id: Option<String>,
    /// Channel for the daily leaderboard post. Absent = feature disabled.
    #[serde(default)]
    pub rank_channel_id: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookConfig {
    /// POST target for registration form submissions.
    pub registration_url: String,
    /// GET target for per-user points queries (`discordId` query param).
    pub points_url: String,
    /// POST target for admin point adjustments.
    pub adjust_url: String,
    #[serde(default)]
    pub rank_url: Option<String>,
    /// Sent verbatim as the Authorization header when non-empty.
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl WebhookConfig {
    /// Auth token with empty strings treated as absent.
    pub fn effective_auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref().filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub invite_url: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            invite_url: None,
        }
    }
}

fn default_port() -> u16 {
    9090
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Rank channel + webhook pair, present only when both are configured.
    pub fn rank_target(&self) -> Option<(&str, &str)> {
        match (
            self.discord.rank_channel_id.as_deref(),
            self.webhooks.rank_url.as_deref(),
        ) {
            (Some(channel), Some(url)) if !channel.is_empty() && !url.is_empty() => {
                Some((channel, url))
            }
            _ => None,
        }
    }
}
