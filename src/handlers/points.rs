use std::collections::HashMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::gateway::{
    Actor, ButtonSpec, ButtonStyle, ChannelMessage, Embed, EmbedField, ModalSpec, Reply, Responder,
    TextInput,
};
use crate::relay::{RelayResult, WebhookRelay};

/// Announcement panel with the points consultation button.
pub fn consult_panel() -> ChannelMessage {
    ChannelMessage {
        content: String::new(),
        embed: Some(Embed {
            title: "🔍 Consulte seus Pontos na Dinastia!".to_string(),
            description: "Clique no botão abaixo para consultar seus pontos acumulados no sistema.\n\n\
                Veja quantos pontos você já acumulou e acompanhe seu progresso na comunidade Dinastia!\n\n\
                Quanto mais você participa, mais pontos você ganha!"
                .to_string(),
            color: 0x0099ff,
            footer: Some("👑DinastIA - Sistema de Pontos".to_string()),
            author: None,
            fields: vec![],
        }),
        buttons: vec![ButtonSpec {
            custom_id: "consult_points".to_string(),
            label: "Consultar Pontos".to_string(),
            style: ButtonStyle::Primary,
            emoji: Some("🔍".to_string()),
        }],
    }
}

/// Announcement panel with the points management button.
pub fn manage_panel() -> ChannelMessage {
    ChannelMessage {
        content: String::new(),
        embed: Some(Embed {
            title: "⚙️ Gerenciamento de Pontos".to_string(),
            description: "Clique no botão abaixo para gerenciar os pontos dos usuários.\n\n\
                Você poderá adicionar ou remover pontos e registrar a razão da alteração.\n\n\
                Apenas administradores podem utilizar esta função."
                .to_string(),
            color: 0x4caf50,
            footer: Some("👑DinastIA - Sistema de Pontos".to_string()),
            author: None,
            fields: vec![],
        }),
        buttons: vec![ButtonSpec {
            custom_id: "manage_points".to_string(),
            label: "Gerenciar Pontos".to_string(),
            style: ButtonStyle::Primary,
            emoji: Some("⚙️".to_string()),
        }],
    }
}

/// Per-user points summary as the backend reports it. The relay hands the
/// raw body through when the reply is not a `message` object or a list;
/// this is the second-stage decode of that body.
#[derive(Debug, Deserialize)]
struct PointsSummary {
    points: Option<i64>,
    rank: Option<i64>,
    username: Option<String>,
}

/// Fetch and show the acting user's points. Defers first: the backend
/// lookup can take longer than the platform's initial-reply window.
pub async fn consult(
    responder: &mut Responder<'_>,
    relay: &WebhookRelay,
    points_url: &str,
    actor: &Actor,
) -> Result<()> {
    responder.defer_ephemeral().await?;

    info!("Fetching points for user {}", actor.id);
    match relay.get(points_url, &[("discordId", actor.id.as_str())]).await {
        Ok(result) => {
            responder.send(consult_reply(&result)).await?;
        }
        Err(e) => {
            error!("Failed to fetch points for {}: {}", actor.id, e);
            responder
                .send(Reply::ephemeral(
                    "Não foi possível consultar seus pontos. Por favor, tente novamente mais tarde.",
                ))
                .await?;
        }
    }

    Ok(())
}

fn consult_reply(result: &RelayResult) -> Reply {
    let mut embed = Embed {
        title: "🏆 Seus Pontos na Dinastia".to_string(),
        color: 0x0099ff,
        footer: Some("👑 DinastIA - Sistema de Pontos".to_string()),
        ..Embed::default()
    };

    const NO_POINTS: &str =
        "Não encontramos pontos registrados para você. Participe mais da comunidade para ganhar pontos!";

    match result {
        RelayResult::Message(text) => match serde_json::from_str::<PointsSummary>(text) {
            Ok(PointsSummary {
                points: Some(points),
                rank,
                username,
            }) => {
                embed.description = format!("Você possui **{}** pontos acumulados!", points);
                if let Some(rank) = rank {
                    embed.fields.push(EmbedField {
                        name: "Sua Posição no Ranking".to_string(),
                        value: format!("#{}", rank),
                        inline: true,
                    });
                }
                embed.author = username;
            }
            // Decoded JSON without a points field: the user has no record.
            Ok(_) => embed.description = NO_POINTS.to_string(),
            // Not JSON at all: show the backend text verbatim.
            Err(_) => embed.description = text.clone(),
        },
        RelayResult::Entries(_) | RelayResult::Empty => {
            embed.description = NO_POINTS.to_string();
        }
    }

    Reply::ephemeral_embed(embed)
}

/// Show the points management form. No network call.
pub async fn open_manage_form(responder: &mut Responder<'_>) -> Result<()> {
    responder
        .show_modal(ModalSpec {
            custom_id: "managePointsModal".to_string(),
            title: "Gerenciamento de Pontos".to_string(),
            inputs: vec![
                TextInput::short("userId", "ID do Usuário", "123456789012345678"),
                // Modals cannot hold select menus, hence the free-text action.
                TextInput::short("action", "Ação (digite \"adicionar\" ou \"remover\")", "adicionar"),
                TextInput {
                    custom_id: "description".to_string(),
                    label: "Descrição".to_string(),
                    placeholder: Some("Motivo da alteração de pontos".to_string()),
                    paragraph: true,
                },
                TextInput::short("points", "Valor", "100"),
            ],
        })
        .await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentAction {
    Add,
    Remove,
}

impl AdjustmentAction {
    /// Parse the free-text action field. Accepts the Portuguese verbs (as
    /// substrings, tolerating surrounding words) and the exact wire names.
    fn parse(input: &str) -> Option<Self> {
        let normalized = input.trim().to_lowercase();
        if normalized.contains("adicionar") || normalized == "add" {
            Some(Self::Add)
        } else if normalized.contains("remover") || normalized == "remove" {
            Some(Self::Remove)
        } else {
            None
        }
    }

    fn wire_name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

/// A validated point adjustment, ready to forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointsAdjustment {
    pub target_user_id: String,
    pub description: String,
    pub amount: i64,
    pub action: AdjustmentAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentParseError {
    InvalidAction,
    InvalidAmount,
}

impl AdjustmentParseError {
    fn user_message(self) -> &'static str {
        match self {
            Self::InvalidAction => "Ação inválida. Por favor, use \"adicionar\" ou \"remover\".",
            Self::InvalidAmount => "O valor de pontos deve ser um número positivo.",
        }
    }
}

impl PointsAdjustment {
    /// Build from the modal fields. The amount must be a strictly positive
    /// integer; rejection happens here, before anything touches the network.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, AdjustmentParseError> {
        let field = |name: &str| fields.get(name).map(String::as_str).unwrap_or_default();

        let action = AdjustmentAction::parse(field("action"))
            .ok_or(AdjustmentParseError::InvalidAction)?;

        let amount = field("points")
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|value| *value > 0)
            .ok_or(AdjustmentParseError::InvalidAmount)?;

        Ok(Self {
            target_user_id: field("userId").to_string(),
            description: field("description").to_string(),
            amount,
            action,
        })
    }
}

#[derive(Debug, Serialize)]
struct AdjustmentPayload<'a> {
    #[serde(rename = "userId")]
    user_id: &'a str,
    description: &'a str,
    points: i64,
    action: &'static str,
    #[serde(rename = "adminUsername")]
    admin_username: &'a str,
    #[serde(rename = "adminId")]
    admin_id: &'a str,
}

/// Validate the management form and forward the adjustment to the backend.
pub async fn submit_adjustment(
    responder: &mut Responder<'_>,
    relay: &WebhookRelay,
    adjust_url: &str,
    actor: &Actor,
    fields: &HashMap<String, String>,
) -> Result<()> {
    let adjustment = match PointsAdjustment::from_fields(fields) {
        Ok(adjustment) => adjustment,
        Err(e) => {
            responder.send(Reply::ephemeral(e.user_message())).await?;
            return Ok(());
        }
    };

    responder.defer_ephemeral().await?;

    let payload = AdjustmentPayload {
        user_id: &adjustment.target_user_id,
        description: &adjustment.description,
        points: adjustment.amount,
        action: adjustment.action.wire_name(),
        admin_username: &actor.name,
        admin_id: &actor.id,
    };

    match relay.post(adjust_url, &payload).await {
        Ok(_) => {
            let (action_text, preposition) = match adjustment.action {
                AdjustmentAction::Add => ("adicionados", "para"),
                AdjustmentAction::Remove => ("removidos", "de"),
            };
            responder
                .send(Reply::ephemeral(format!(
                    "✅ Operação realizada com sucesso!\n\n**{}** pontos foram {} {} <@{}>.\n**Motivo:** {}",
                    adjustment.amount,
                    action_text,
                    preposition,
                    adjustment.target_user_id,
                    adjustment.description
                )))
                .await?;
        }
        Err(e) => {
            error!("Failed to send point adjustment: {}", e);
            responder
                .send(Reply::ephemeral(
                    "Erro ao enviar dados para o servidor. Por favor, tente novamente.",
                ))
                .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_add_and_remove_variants() {
        assert_eq!(AdjustmentAction::parse("adicionar"), Some(AdjustmentAction::Add));
        assert_eq!(AdjustmentAction::parse(" Adicionar pontos "), Some(AdjustmentAction::Add));
        assert_eq!(AdjustmentAction::parse("add"), Some(AdjustmentAction::Add));
        assert_eq!(AdjustmentAction::parse("remover"), Some(AdjustmentAction::Remove));
        assert_eq!(AdjustmentAction::parse("REMOVE"), Some(AdjustmentAction::Remove));
        assert_eq!(AdjustmentAction::parse("zerar"), None);
    }

    #[test]
    fn rejects_non_positive_amounts() {
        let base = [
            ("userId", "123"),
            ("action", "adicionar"),
            ("description", "motivo"),
        ];

        for bad in ["-5", "0", "abc", "", "5.5"] {
            let mut f = fields(&base);
            f.insert("points".to_string(), bad.to_string());
            assert_eq!(
                PointsAdjustment::from_fields(&f),
                Err(AdjustmentParseError::InvalidAmount),
                "amount {:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn action_is_checked_before_amount() {
        let f = fields(&[
            ("userId", "123"),
            ("action", "zerar"),
            ("description", "motivo"),
            ("points", "abc"),
        ]);
        assert_eq!(
            PointsAdjustment::from_fields(&f),
            Err(AdjustmentParseError::InvalidAction)
        );
    }

    #[test]
    fn builds_valid_adjustment() {
        let f = fields(&[
            ("userId", "123456789012345678"),
            ("action", "remover"),
            ("description", "spam"),
            ("points", " 100 "),
        ]);
        let adjustment = PointsAdjustment::from_fields(&f).unwrap();
        assert_eq!(adjustment.amount, 100);
        assert_eq!(adjustment.action, AdjustmentAction::Remove);
        assert_eq!(adjustment.target_user_id, "123456789012345678");
    }

    #[test]
    fn consult_reply_formats_points_summary() {
        let result = RelayResult::Message(
            r#"{"points": 42, "rank": 3, "username": "ana"}"#.to_string(),
        );
        let reply = consult_reply(&result);
        let embed = reply.embed.unwrap();
        assert_eq!(embed.description, "Você possui **42** pontos acumulados!");
        assert_eq!(embed.author.as_deref(), Some("ana"));
        assert_eq!(embed.fields.len(), 1);
        assert_eq!(embed.fields[0].value, "#3");
    }

    #[test]
    fn consult_reply_shows_plain_text_verbatim() {
        let reply = consult_reply(&RelayResult::Message("Sistema em manutenção".to_string()));
        assert_eq!(reply.embed.unwrap().description, "Sistema em manutenção");
    }

    #[test]
    fn consult_reply_without_points_suggests_participation() {
        for result in [
            RelayResult::Empty,
            RelayResult::Message(r#"{"rank": 9}"#.to_string()),
        ] {
            let reply = consult_reply(&result);
            assert!(reply
                .embed
                .unwrap()
                .description
                .starts_with("Não encontramos pontos registrados"));
        }
    }
}
