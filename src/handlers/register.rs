use std::collections::HashMap;

use anyhow::Result;
use serde::Serialize;
use tracing::{error, info};

use crate::gateway::{
    Actor, ButtonSpec, ButtonStyle, ChannelMessage, Embed, ModalSpec, Reply, Responder, TextInput,
};
use crate::relay::WebhookRelay;
use crate::validate;

/// Announcement panel with the registration button, posted on startup.
pub fn registration_panel() -> ChannelMessage {
    ChannelMessage {
        content: String::new(),
        embed: Some(Embed {
            title: "🚀 Cadastre-se no Sistema de Pontos da Dinastia!".to_string(),
            description: "Ao clicar no botão abaixo, você irá preencher um formulário de cadastro do sistema de pontos.\n\n\
                Esse sistema é uma forma de recompensar você por sua participação ativa na comunidade Dinastia.\n\n\
                Ao longo do tempo, você poderá acumular pontos e trocá-los por prêmios incríveis!\n\n\
                Aproveite essa oportunidade e faça parte do nosso sistema de pontos!"
                .to_string(),
            color: 0x00a550,
            footer: Some("👑DinastIA - Bem-vindo ao Sistema de Pontos!".to_string()),
            author: None,
            fields: vec![],
        }),
        buttons: vec![ButtonSpec {
            custom_id: "register".to_string(),
            label: "Fazer Cadastro".to_string(),
            style: ButtonStyle::Success,
            emoji: Some("⚡".to_string()),
        }],
    }
}

/// Show the registration form. No network call.
pub async fn open_form(responder: &mut Responder<'_>) -> Result<()> {
    responder
        .show_modal(ModalSpec {
            custom_id: "registerModal".to_string(),
            title: "Cadastro Sistema de Pontos".to_string(),
            inputs: vec![
                TextInput::short("email", "E-mail", "comercial@dinastia.uk"),
                TextInput::short("whatsapp", "WhatsApp (com DDD)", "557899009909"),
            ],
        })
        .await?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct RegistrationPayload<'a> {
    email: &'a str,
    whatsapp: &'a str,
    #[serde(rename = "userName")]
    user_name: &'a str,
    #[serde(rename = "discordId")]
    discord_id: &'a str,
}

/// Validate the submitted form and forward it to the registration webhook.
/// Invalid input is rejected with an ephemeral message before any network
/// call is made.
pub async fn submit(
    responder: &mut Responder<'_>,
    relay: &WebhookRelay,
    webhook_url: &str,
    actor: &Actor,
    fields: &HashMap<String, String>,
) -> Result<()> {
    let email = fields.get("email").map(String::as_str).unwrap_or_default();
    let whatsapp = fields.get("whatsapp").map(String::as_str).unwrap_or_default();

    if !validate::is_valid_email(email) {
        responder
            .send(Reply::ephemeral(
                "Por favor, forneça um endereço de email válido (exemplo: nome@dominio.com).",
            ))
            .await?;
        return Ok(());
    }

    if !validate::is_valid_phone(whatsapp) {
        responder
            .send(Reply::ephemeral(
                "Por favor, forneça um número de WhatsApp válido com pelo menos 10 dígitos.",
            ))
            .await?;
        return Ok(());
    }

    let formatted = validate::format_phone(whatsapp);
    info!("Sending registration data for user {}", actor.id);

    let payload = RegistrationPayload {
        email,
        whatsapp: &formatted,
        user_name: &actor.name,
        discord_id: &actor.id,
    };

    match relay.post(webhook_url, &payload).await {
        Ok(_) => {
            responder
                .send(Reply::ephemeral(format!(
                    "Cadastro enviado com sucesso! \nEmail: {} \nWhatsApp: {}",
                    email, formatted
                )))
                .await?;
        }
        Err(e) => {
            error!("Failed to submit registration form: {}", e);
            responder
                .send(Reply::ephemeral("Erro ao enviar cadastro."))
                .await?;
        }
    }

    Ok(())
}
