//! Xray Cloud authentication

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::client::{AUTHENTICATE_PATH, AUTH_TIMEOUT};
use crate::error::{Error, Result};

/// Bearerトークン。1回の実行の間だけ保持する
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

#[derive(Serialize)]
struct Credentials<'a> {
    client_id: &'a str,
    client_secret: &'a str,
}

/// クライアントID/シークレットをトークンと交換する
///
/// 失敗はすべて [`Error::AuthenticationFailed`] として返す。
pub async fn authenticate(
    client: &Client,
    base_url: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<AuthToken> {
    request_token(client, base_url, client_id, client_secret)
        .await
        .map_err(Error::authentication)
}

async fn request_token(
    client: &Client,
    base_url: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<AuthToken> {
    let url = format!("{}{}", base_url, AUTHENTICATE_PATH);
    debug!(%url, "Requesting token");

    let response = client
        .post(&url)
        .timeout(AUTH_TIMEOUT)
        .json(&Credentials {
            client_id,
            client_secret,
        })
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        return Err(Error::ApiError { status, message });
    }

    // 応答本文はJSON文字列（"eyJ..."）
    let payload = response.text().await?;
    match serde_json::from_str::<Value>(&payload) {
        Ok(Value::String(token)) if !token.trim().is_empty() => Ok(AuthToken::new(token.trim())),
        _ => Err(Error::InvalidToken(truncate(&payload, 80))),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}
