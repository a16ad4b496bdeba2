use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

/// A user-triggered UI event delivered by the platform client.
#[derive(Debug, Clone)]
pub struct Interaction {
    pub kind: InteractionKind,
    /// Opaque component identifier; the sole dispatch key.
    pub component_id: String,
    pub actor: Actor,
}

#[derive(Debug, Clone)]
pub enum InteractionKind {
    Button,
    ModalSubmit { fields: HashMap<String, String> },
    SelectMenu { value: String },
}

impl InteractionKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::ModalSubmit { .. } => "modal",
            Self::SelectMenu { .. } => "select menu",
        }
    }
}

/// The platform user behind an interaction.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The platform allows one initial reply per interaction.
    #[error("interaction was already acknowledged")]
    AlreadyAcknowledged,
    #[error("gateway request failed: {0}")]
    Send(String),
}

/// Modal form description; the platform client renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalSpec {
    pub custom_id: String,
    pub title: String,
    pub inputs: Vec<TextInput>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextInput {
    pub custom_id: String,
    pub label: String,
    pub placeholder: Option<String>,
    /// Multi-line style when true, single-line otherwise.
    pub paragraph: bool,
}

impl TextInput {
    pub fn short(custom_id: &str, label: &str, placeholder: &str) -> Self {
        Self {
            custom_id: custom_id.to_string(),
            label: label.to_string(),
            placeholder: (!placeholder.is_empty()).then(|| placeholder.to_string()),
            paragraph: false,
        }
    }
}

/// Reply to an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    pub content: String,
    pub ephemeral: bool,
    pub embed: Option<Embed>,
}

impl Reply {
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
            embed: None,
        }
    }

    pub fn ephemeral_embed(embed: Embed) -> Self {
        Self {
            content: String::new(),
            ephemeral: true,
            embed: Some(embed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Embed {
    pub title: String,
    pub description: String,
    /// RGB color of the embed border.
    pub color: u32,
    pub footer: Option<String>,
    pub author: Option<String>,
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Free-standing channel message (panels, leaderboard posts).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelMessage {
    pub content: String,
    pub embed: Option<Embed>,
    pub buttons: Vec<ButtonSpec>,
}

impl ChannelMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonSpec {
    pub custom_id: String,
    pub label: String,
    pub style: ButtonStyle,
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Success,
}

/// Reply and messaging surface of the platform client. Session management,
/// auth handshake and component rendering live behind this trait.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    async fn show_modal(
        &self,
        interaction: &Interaction,
        modal: ModalSpec,
    ) -> Result<(), GatewayError>;

    async fn reply(&self, interaction: &Interaction, reply: Reply) -> Result<(), GatewayError>;

    async fn defer_reply(
        &self,
        interaction: &Interaction,
        ephemeral: bool,
    ) -> Result<(), GatewayError>;

    async fn edit_reply(
        &self,
        interaction: &Interaction,
        reply: Reply,
    ) -> Result<(), GatewayError>;

    async fn send_to_channel(
        &self,
        channel_id: &str,
        message: ChannelMessage,
    ) -> Result<(), GatewayError>;
}

/// Inbound side of the platform client.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Next interaction, or `None` once the stream has ended.
    async fn next_event(&self) -> Result<Option<Interaction>, GatewayError>;
}

/// Inert gateway used until a platform connection is wired in.
pub struct NoopGateway;

#[async_trait]
impl GatewayClient for NoopGateway {
    async fn show_modal(
        &self,
        interaction: &Interaction,
        modal: ModalSpec,
    ) -> Result<(), GatewayError> {
        warn!(
            "No gateway connected; dropping modal '{}' for {}",
            modal.custom_id, interaction.actor.id
        );
        Ok(())
    }

    async fn reply(&self, interaction: &Interaction, _reply: Reply) -> Result<(), GatewayError> {
        warn!(
            "No gateway connected; dropping reply for {}",
            interaction.actor.id
        );
        Ok(())
    }

    async fn defer_reply(
        &self,
        interaction: &Interaction,
        _ephemeral: bool,
    ) -> Result<(), GatewayError> {
        warn!(
            "No gateway connected; dropping defer for {}",
            interaction.actor.id
        );
        Ok(())
    }

    async fn edit_reply(
        &self,
        interaction: &Interaction,
        _reply: Reply,
    ) -> Result<(), GatewayError> {
        warn!(
            "No gateway connected; dropping reply edit for {}",
            interaction.actor.id
        );
        Ok(())
    }

    async fn send_to_channel(
        &self,
        channel_id: &str,
        _message: ChannelMessage,
    ) -> Result<(), GatewayError> {
        warn!("No gateway connected; dropping message to channel {}", channel_id);
        Ok(())
    }
}

/// Event source that ends immediately.
pub struct NoopEventSource;

#[async_trait]
impl EventSource for NoopEventSource {
    async fn next_event(&self) -> Result<Option<Interaction>, GatewayError> {
        Ok(None)
    }
}

/// Tracks how an interaction has been acknowledged so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponderState {
    Pending,
    Deferred,
    Replied,
}

/// Per-interaction reply guard.
///
/// An interaction accepts exactly one initial response (reply, defer or
/// modal) and any number of edits afterwards. Handlers go through this so
/// a second initial response is impossible by construction.
pub struct Responder<'a> {
    gateway: &'a dyn GatewayClient,
    interaction: &'a Interaction,
    state: ResponderState,
}

impl<'a> Responder<'a> {
    pub fn new(gateway: &'a dyn GatewayClient, interaction: &'a Interaction) -> Self {
        Self {
            gateway,
            interaction,
            state: ResponderState::Pending,
        }
    }

    /// Whether an initial response has been sent.
    pub fn acknowledged(&self) -> bool {
        self.state != ResponderState::Pending
    }

    pub async fn show_modal(&mut self, modal: ModalSpec) -> Result<(), GatewayError> {
        if self.acknowledged() {
            return Err(GatewayError::AlreadyAcknowledged);
        }
        self.gateway.show_modal(self.interaction, modal).await?;
        self.state = ResponderState::Replied;
        Ok(())
    }

    pub async fn defer_ephemeral(&mut self) -> Result<(), GatewayError> {
        if self.acknowledged() {
            return Err(GatewayError::AlreadyAcknowledged);
        }
        self.gateway.defer_reply(self.interaction, true).await?;
        self.state = ResponderState::Deferred;
        Ok(())
    }

    /// Send a terminal reply, choosing initial reply vs edit automatically.
    pub async fn send(&mut self, reply: Reply) -> Result<(), GatewayError> {
        match self.state {
            ResponderState::Pending => {
                self.gateway.reply(self.interaction, reply).await?;
            }
            ResponderState::Deferred | ResponderState::Replied => {
                self.gateway.edit_reply(self.interaction, reply).await?;
            }
        }
        self.state = ResponderState::Replied;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{button, GatewayCall, RecordingGateway};
    use super::*;

    #[tokio::test]
    async fn first_send_replies_then_edits() {
        let gateway = RecordingGateway::new();
        let interaction = button("register");
        let mut responder = Responder::new(&gateway, &interaction);

        responder.send(Reply::ephemeral("one")).await.unwrap();
        responder.send(Reply::ephemeral("two")).await.unwrap();

        assert_eq!(
            gateway.calls(),
            vec![
                GatewayCall::Reply(Reply::ephemeral("one")),
                GatewayCall::EditReply(Reply::ephemeral("two")),
            ]
        );
    }

    #[tokio::test]
    async fn send_after_defer_edits() {
        let gateway = RecordingGateway::new();
        let interaction = button("consult_points");
        let mut responder = Responder::new(&gateway, &interaction);

        responder.defer_ephemeral().await.unwrap();
        responder.send(Reply::ephemeral("done")).await.unwrap();

        assert_eq!(
            gateway.calls(),
            vec![
                GatewayCall::DeferReply { ephemeral: true },
                GatewayCall::EditReply(Reply::ephemeral("done")),
            ]
        );
    }

    #[tokio::test]
    async fn second_initial_acknowledgement_is_rejected() {
        let gateway = RecordingGateway::new();
        let interaction = button("register");
        let mut responder = Responder::new(&gateway, &interaction);

        responder.defer_ephemeral().await.unwrap();
        let err = responder.defer_ephemeral().await.unwrap_err();
        assert!(matches!(err, GatewayError::AlreadyAcknowledged));

        let err = responder
            .show_modal(ModalSpec {
                custom_id: "registerModal".to_string(),
                title: "Cadastro".to_string(),
                inputs: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::AlreadyAcknowledged));

        // Only the one defer reached the gateway.
        assert_eq!(gateway.calls().len(), 1);
    }
}
