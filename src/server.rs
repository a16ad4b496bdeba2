use anyhow::{Context, Result};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tracing::info;

/// Liveness endpoint: an invite link when one is configured, a static
/// string otherwise. Unauthenticated.
fn app(invite_url: Option<String>) -> axum::Router {
    axum::Router::new().route(
        "/",
        get(move || {
            let invite_url = invite_url.clone();
            async move { root(invite_url) }
        }),
    )
}

fn root(invite_url: Option<String>) -> Response {
    match invite_url {
        Some(url) => Html(format!("<a href=\"{}\">Invite the bot</a>", url)).into_response(),
        None => "Bot is running".into_response(),
    }
}

pub async fn run(port: u16, invite_url: Option<String>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind HTTP server on port {}", port))?;
    info!("HTTP server running on port {}", port);

    axum::serve(listener, app(invite_url))
        .await
        .context("HTTP server failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn serve(invite_url: Option<String>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app(invite_url)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn reports_running_without_invite_url() {
        let base = serve(None).await;
        let body = reqwest::get(&base).await.unwrap().text().await.unwrap();
        assert_eq!(body, "Bot is running");
    }

    #[tokio::test]
    async fn links_the_invite_when_configured() {
        let base = serve(Some("https://discord.example/invite".to_string())).await;
        let body = reqwest::get(&base).await.unwrap().text().await.unwrap();
        assert_eq!(
            body,
            "<a href=\"https://discord.example/invite\">Invite the bot</a>"
        );
    }
}
