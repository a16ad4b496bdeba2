use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("webhook request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("webhook returned status {0}")]
    HttpStatus(StatusCode),
}

/// One leaderboard row as the backend reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankEntry {
    pub username: String,
    pub points: i64,
}

/// Shape of a successful webhook reply after decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayResult {
    /// JSON array of user rows.
    Entries(Vec<RankEntry>),
    /// A `message` field, or the raw body when no known shape matched.
    Message(String),
    /// Empty or whitespace-only body.
    Empty,
}

/// Sends JSON payloads to the configured backend endpoints and shapes the
/// reply. One attempt per call; retry policy belongs to the caller (none of
/// the current callers retries).
pub struct WebhookRelay {
    http: reqwest::Client,
    auth_token: Option<String>,
}

impl WebhookRelay {
    pub fn new(auth_token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth_token: auth_token.filter(|t| !t.is_empty()),
        }
    }

    pub async fn post<T: Serialize>(
        &self,
        url: &str,
        payload: &T,
    ) -> Result<RelayResult, RelayError> {
        debug!("POST {}", url);
        let mut request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(payload);
        if let Some(token) = &self.auth_token {
            request = request.header(AUTHORIZATION, token);
        }

        Self::finish(request.send().await?).await
    }

    pub async fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<RelayResult, RelayError> {
        debug!("GET {}", url);
        let mut request = self
            .http
            .get(url)
            .header(ACCEPT, "text/plain, application/json")
            .query(query);
        if let Some(token) = &self.auth_token {
            request = request.header(AUTHORIZATION, token);
        }

        Self::finish(request.send().await?).await
    }

    async fn finish(response: reqwest::Response) -> Result<RelayResult, RelayError> {
        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::HttpStatus(status));
        }

        let body = response.text().await?;
        Ok(shape_body(&body))
    }
}

/// Decode a reply body into a [`RelayResult`].
///
/// The backend answers with whatever its workflow produced: a JSON object
/// with a `message`, a JSON array of user rows, or plain text. Unknown JSON
/// shapes fall back to the raw text rather than being rejected.
fn shape_body(body: &str) -> RelayResult {
    if body.trim().is_empty() {
        return RelayResult::Empty;
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(fields)) => match fields.get("message").and_then(Value::as_str) {
            Some(message) => RelayResult::Message(message.to_string()),
            None => RelayResult::Message(body.to_string()),
        },
        Ok(Value::Array(items)) if !items.is_empty() => {
            RelayResult::Entries(items.iter().map(entry_from_value).collect())
        }
        _ => RelayResult::Message(body.to_string()),
    }
}

fn entry_from_value(value: &Value) -> RankEntry {
    RankEntry {
        username: value
            .get("username")
            .and_then(Value::as_str)
            .unwrap_or("Usuário")
            .to_string(),
        points: value.get("points").and_then(Value::as_i64).unwrap_or(0),
    }
}
