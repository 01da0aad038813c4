use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

use crate::auth::{self, AuthToken};
use crate::config::Config;
use crate::error::{Error, Result};

pub const AUTHENTICATE_PATH: &str = "/api/v2/authenticate";
pub const GRAPHQL_PATH: &str = "/api/v2/graphql";

/// 認証リクエストのタイムアウト
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(30);

/// Xray Cloud API クライアント（認証済み）
#[derive(Debug, Clone)]
pub struct XrayClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) timeout: Duration,
    token: AuthToken,
}

pub(crate) fn build_http_client() -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("application/json"),
    );

    Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| Error::InvalidConfiguration(format!("Failed to build HTTP client: {}", e)))
}

impl XrayClient {
    /// クライアント資格情報で認証し、トークンを保持したクライアントを作成
    pub async fn connect(config: &Config) -> Result<Self> {
        let client = build_http_client()?;
        let token = auth::authenticate(
            &client,
            &config.base_url,
            &config.client_id,
            &config.client_secret,
        )
        .await?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            timeout: config.request_timeout,
            token,
        })
    }

    /// 取得済みのトークンからクライアントを作成
    pub fn with_token(config: &Config, token: AuthToken) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            base_url: config.base_url.clone(),
            timeout: config.request_timeout,
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GraphQLクエリを実行し、`data` を返す
    pub(crate) async fn graphql<T>(&self, query: &str, variables: Value) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, GRAPHQL_PATH);
        let body = GraphQLRequest { query, variables };

        trace!(%url, variables = %body.variables, "GraphQL request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token.as_str())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::ApiError { status, message });
        }

        let response = response.json::<GraphQLResponse>().await?;
        debug!(has_errors = response.errors.is_some(), "GraphQL response received");

        if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
            let messages = errors
                .iter()
                .map(|e| e.message.clone())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Error::GraphQL(messages));
        }

        match response.data {
            Some(data) => Ok(serde_json::from_value(data)?),
            None => Err(Error::GraphQL("No data in response".to_string())),
        }
    }
}

#[derive(Debug, Serialize)]
struct GraphQLRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    data: Option<Value>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}
