use anyhow::{Context, Result};
use tracing::info;

use crate::gateway::{ChannelMessage, GatewayClient};
use crate::relay::{RelayResult, WebhookRelay};

/// Fetch the current leaderboard and post it to the rank channel.
pub async fn fetch_and_post(
    gateway: &dyn GatewayClient,
    relay: &WebhookRelay,
    rank_url: &str,
    channel_id: &str,
) -> Result<()> {
    info!("Fetching daily rank data from {}", rank_url);
    let result = relay
        .get(rank_url, &[])
        .await
        .context("Failed to fetch rank data")?;

    let content = format_rank(&result);
    gateway
        .send_to_channel(channel_id, ChannelMessage::text(content))
        .await
        .context("Failed to post daily rank")?;

    info!("Daily rank posted successfully");
    Ok(())
}

/// Render a leaderboard reply as channel text. Structured lists are cut to
/// the top 10, with medals for the podium; plain text goes out verbatim.
pub fn format_rank(result: &RelayResult) -> String {
    match result {
        RelayResult::Entries(entries) => {
            let mut content = String::from(
                "**🏆 Ranking Diário do Sistema de Pontos**\n\n\
                 Confira os membros que mais se destacaram hoje!\n\n",
            );
            for (index, entry) in entries.iter().take(10).enumerate() {
                let medal = match index {
                    0 => "🥇".to_string(),
                    1 => "🥈".to_string(),
                    2 => "🥉".to_string(),
                    n => format!("{}.", n + 1),
                };
                content.push_str(&format!(
                    "{} **{}** - Pontos: **{}**\n",
                    medal, entry.username, entry.points
                ));
            }
            content
        }
        RelayResult::Message(text) => text.clone(),
        RelayResult::Empty => "Nenhum dado de ranking disponível para hoje.".to_string(),
    }
}
