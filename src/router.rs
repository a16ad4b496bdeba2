use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use crate::config::WebhookConfig;
use crate::gateway::{EventSource, GatewayClient, Interaction, InteractionKind, Reply, Responder};
use crate::handlers::{points, register};
use crate::relay::WebhookRelay;

/// Stateless interaction dispatcher. Each inbound event is handled to
/// completion in one pass; there is no cross-event session state here.
pub struct Router {
    gateway: Arc<dyn GatewayClient>,
    relay: Arc<WebhookRelay>,
    webhooks: WebhookConfig,
}

impl Router {
    pub fn new(
        gateway: Arc<dyn GatewayClient>,
        relay: Arc<WebhookRelay>,
        webhooks: WebhookConfig,
    ) -> Self {
        Self {
            gateway,
            relay,
            webhooks,
        }
    }

    /// Handle one interaction. Never returns an error: anything a handler
    /// lets escape is logged and answered with a generic ephemeral message,
    /// provided no reply has gone out yet.
    pub async fn dispatch(&self, interaction: &Interaction) {
        let mut responder = Responder::new(self.gateway.as_ref(), interaction);

        if let Err(e) = self.route(interaction, &mut responder).await {
            error!(
                "Error handling {} interaction '{}': {:#}",
                interaction.kind.label(),
                interaction.component_id,
                e
            );
            if !responder.acknowledged() {
                if let Err(send_err) = responder
                    .send(Reply::ephemeral("Ocorreu um erro ao processar sua interação."))
                    .await
                {
                    error!("Failed to send error response: {}", send_err);
                }
            }
        }
    }

    async fn route(
        &self,
        interaction: &Interaction,
        responder: &mut Responder<'_>,
    ) -> Result<()> {
        match (&interaction.kind, interaction.component_id.as_str()) {
            // start_onboarding is an alias kept for older panel messages.
            (InteractionKind::Button, "register" | "start_onboarding") => {
                register::open_form(responder).await
            }
            (InteractionKind::Button, "consult_points") => {
                points::consult(
                    responder,
                    &self.relay,
                    &self.webhooks.points_url,
                    &interaction.actor,
                )
                .await
            }
            (InteractionKind::Button, "manage_points") => {
                points::open_manage_form(responder).await
            }
            (InteractionKind::ModalSubmit { fields }, "registerModal") => {
                register::submit(
                    responder,
                    &self.relay,
                    &self.webhooks.registration_url,
                    &interaction.actor,
                    fields,
                )
                .await
            }
            (InteractionKind::ModalSubmit { fields }, "managePointsModal") => {
                points::submit_adjustment(
                    responder,
                    &self.relay,
                    &self.webhooks.adjust_url,
                    &interaction.actor,
                    fields,
                )
                .await
            }
            // Components of co-tenant bots share our channels; ignore them.
            (kind, unknown) => {
                info!("Unknown {} interaction: {}", kind.label(), unknown);
                Ok(())
            }
        }
    }
}

/// Drive the dispatcher from an event source until the stream ends. Each
/// interaction runs in its own task; in-flight interactions are independent.
pub async fn run(router: Arc<Router>, source: Arc<dyn EventSource>) -> Result<()> {
    info!("Interaction dispatcher started");

    while let Some(interaction) = source.next_event().await? {
        let router = router.clone();
        tokio::spawn(async move {
            router.dispatch(&interaction).await;
        });
    }

    info!("Gateway event stream ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::{button, modal_submit, GatewayCall, RecordingGateway};
    use crate::gateway::{Actor, InteractionKind};
    use axum::routing::{get, post};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Backend {
        base: String,
        hits: Arc<AtomicUsize>,
        last_body: Arc<Mutex<Option<Value>>>,
    }

    /// Stub backend standing in for the three webhook endpoints.
    async fn spawn_backend(points_body: &'static str) -> Backend {
        let hits = Arc::new(AtomicUsize::new(0));
        let last_body = Arc::new(Mutex::new(None));

        let post_hits = hits.clone();
        let post_body = last_body.clone();
        let get_hits = hits.clone();

        let app = axum::Router::new()
            .route(
                "/submit",
                post(move |body: String| {
                    post_hits.fetch_add(1, Ordering::SeqCst);
                    *post_body.lock().unwrap() = serde_json::from_str(&body).ok();
                    async { r#"{"message": "ok"}"# }
                }),
            )
            .route(
                "/points",
                get(move || {
                    get_hits.fetch_add(1, Ordering::SeqCst);
                    async move { points_body }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Backend {
            base: format!("http://{}", addr),
            hits,
            last_body,
        }
    }

    fn test_router(gateway: Arc<RecordingGateway>, base: &str) -> Router {
        Router::new(
            gateway,
            Arc::new(WebhookRelay::new(None)),
            WebhookConfig {
                registration_url: format!("{}/submit", base),
                points_url: format!("{}/points", base),
                adjust_url: format!("{}/submit", base),
                rank_url: None,
                auth_token: None,
            },
        )
    }

    #[tokio::test]
    async fn unknown_component_is_ignored_without_any_calls() {
        let gateway = Arc::new(RecordingGateway::new());
        let backend = spawn_backend("").await;
        let router = test_router(gateway.clone(), &backend.base);

        router.dispatch(&button("unknown_xyz")).await;

        let select = Interaction {
            kind: InteractionKind::SelectMenu {
                value: "whatever".to_string(),
            },
            component_id: "some_other_bot_menu".to_string(),
            actor: Actor {
                id: "1".to_string(),
                name: "x".to_string(),
            },
        };
        router.dispatch(&select).await;

        assert!(gateway.calls().is_empty());
        assert_eq!(backend.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn register_button_opens_the_registration_modal() {
        let gateway = Arc::new(RecordingGateway::new());
        let backend = spawn_backend("").await;
        let router = test_router(gateway.clone(), &backend.base);

        router.dispatch(&button("register")).await;
        router.dispatch(&button("start_onboarding")).await;

        let calls = gateway.calls();
        assert_eq!(calls.len(), 2);
        for call in calls {
            match call {
                GatewayCall::ShowModal(modal) => {
                    assert_eq!(modal.custom_id, "registerModal");
                    assert_eq!(modal.inputs.len(), 2);
                }
                other => panic!("expected modal, got {:?}", other),
            }
        }
        assert_eq!(backend.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_registration_is_rejected_before_the_network() {
        let gateway = Arc::new(RecordingGateway::new());
        let backend = spawn_backend("").await;
        let router = test_router(gateway.clone(), &backend.base);

        let submit = modal_submit(
            "registerModal",
            &[("email", "not-an-email"), ("whatsapp", "11987654321")],
        );
        router.dispatch(&submit).await;

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            GatewayCall::Reply(reply) => {
                assert!(reply.ephemeral);
                assert!(reply.content.contains("email válido"));
            }
            other => panic!("expected reply, got {:?}", other),
        }
        assert_eq!(backend.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn valid_registration_posts_once_and_confirms() {
        let gateway = Arc::new(RecordingGateway::new());
        let backend = spawn_backend("").await;
        let router = test_router(gateway.clone(), &backend.base);

        let submit = modal_submit(
            "registerModal",
            &[("email", "ana@example.com"), ("whatsapp", "11987654321")],
        );
        router.dispatch(&submit).await;

        assert_eq!(backend.hits.load(Ordering::SeqCst), 1);
        let body = backend.last_body.lock().unwrap().clone().unwrap();
        assert_eq!(body["email"], "ana@example.com");
        assert_eq!(body["whatsapp"], "+55(11)98765-4321");
        assert_eq!(body["userName"], "tester");
        assert_eq!(body["discordId"], "9001");

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            GatewayCall::Reply(reply) => {
                assert!(reply.content.contains("Cadastro enviado com sucesso!"));
                assert!(reply.content.contains("+55(11)98765-4321"));
            }
            other => panic!("expected reply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn bad_adjustment_amounts_never_reach_the_backend() {
        let gateway = Arc::new(RecordingGateway::new());
        let backend = spawn_backend("").await;
        let router = test_router(gateway.clone(), &backend.base);

        for bad in ["-5", "abc"] {
            let submit = modal_submit(
                "managePointsModal",
                &[
                    ("userId", "123"),
                    ("action", "adicionar"),
                    ("description", "motivo"),
                    ("points", bad),
                ],
            );
            router.dispatch(&submit).await;
        }

        assert_eq!(backend.hits.load(Ordering::SeqCst), 0);
        let calls = gateway.calls();
        assert_eq!(calls.len(), 2);
        for call in calls {
            match call {
                GatewayCall::Reply(reply) => {
                    assert_eq!(reply.content, "O valor de pontos deve ser um número positivo.");
                }
                other => panic!("expected reply, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn valid_adjustment_posts_once_with_wire_action() {
        let gateway = Arc::new(RecordingGateway::new());
        let backend = spawn_backend("").await;
        let router = test_router(gateway.clone(), &backend.base);

        let submit = modal_submit(
            "managePointsModal",
            &[
                ("userId", "424242"),
                ("action", "adicionar"),
                ("description", "ajudou no suporte"),
                ("points", "100"),
            ],
        );
        router.dispatch(&submit).await;

        assert_eq!(backend.hits.load(Ordering::SeqCst), 1);
        let body = backend.last_body.lock().unwrap().clone().unwrap();
        assert_eq!(body["action"], "add");
        assert_eq!(body["points"], 100);
        assert_eq!(body["userId"], "424242");
        assert_eq!(body["adminId"], "9001");

        let calls = gateway.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], GatewayCall::DeferReply { ephemeral: true });
        match &calls[1] {
            GatewayCall::EditReply(reply) => {
                assert!(reply.content.contains("**100** pontos foram adicionados"));
                assert!(reply.content.contains("<@424242>"));
            }
            other => panic!("expected edit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn consult_defers_then_shows_the_summary() {
        let gateway = Arc::new(RecordingGateway::new());
        let backend = spawn_backend(r#"{"points": 42, "rank": 3}"#).await;
        let router = test_router(gateway.clone(), &backend.base);

        router.dispatch(&button("consult_points")).await;

        assert_eq!(backend.hits.load(Ordering::SeqCst), 1);
        let calls = gateway.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], GatewayCall::DeferReply { ephemeral: true });
        match &calls[1] {
            GatewayCall::EditReply(reply) => {
                let embed = reply.embed.as_ref().unwrap();
                assert_eq!(embed.description, "Você possui **42** pontos acumulados!");
            }
            other => panic!("expected edit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn backend_failure_becomes_a_generic_user_message() {
        let gateway = Arc::new(RecordingGateway::new());
        // Unroutable port: the relay sees a transport error.
        let router = test_router(gateway.clone(), "http://127.0.0.1:1");

        let submit = modal_submit(
            "registerModal",
            &[("email", "ana@example.com"), ("whatsapp", "11987654321")],
        );
        router.dispatch(&submit).await;

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            GatewayCall::Reply(reply) => {
                assert_eq!(reply.content, "Erro ao enviar cadastro.");
            }
            other => panic!("expected reply, got {:?}", other),
        }
    }
}
