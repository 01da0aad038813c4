use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::XrayClient;
use crate::error::{Error, Result};
use crate::models::{IssueSummary, RawTest, TestDetail};

pub(crate) const GET_TEST_QUERY: &str = r#"
query ($issueId: String!) {
  getTest(issueId: $issueId) {
    issueId
    jira(fields: ["*all"])
    steps {
      id
      action
      data
      result
      customFields { name value }
    }
    preconditions(limit: 50) {
      results {
        jira(fields: ["key", "summary"])
        definition
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GetTestData {
    #[serde(rename = "getTest")]
    get_test: Option<RawTest>,
}

impl XrayClient {
    /// テスト1件の詳細を取得
    ///
    /// 失敗は [`Error::DetailFailed`] として返し、継続するかどうかは呼び出し側が決める。
    pub async fn get_test(&self, issue: &IssueSummary) -> Result<TestDetail> {
        debug!(issue_key = %issue.issue_key, issue_id = %issue.issue_id, "Fetching test detail");

        let data: GetTestData = self
            .graphql(GET_TEST_QUERY.trim(), json!({ "issueId": issue.issue_id }))
            .await
            .map_err(|e| e.detail(&issue.issue_key))?;

        let raw = data
            .get_test
            .ok_or_else(|| Error::NotFound(issue.issue_id.clone()).detail(&issue.issue_key))?;

        let mut detail = raw.into_detail(&issue.issue_id);
        if detail.key.is_empty() {
            detail.key = issue.issue_key.clone();
        }
        if detail.summary.is_empty() {
            if let Some(summary) = &issue.summary {
                detail.summary = summary.clone();
            }
        }
        Ok(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthToken;
    use crate::client::GRAPHQL_PATH;
    use crate::config::Config;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(mock_server: &MockServer) -> XrayClient {
        let config = Config::new(mock_server.uri(), "id", "secret", "project = TEST").unwrap();
        XrayClient::with_token(&config, AuthToken::new("token")).unwrap()
    }

    #[tokio::test]
    async fn test_get_test_success() {
        // Given: getTest に応答するモックサーバー
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GRAPHQL_PATH))
            .and(body_partial_json(json!({"variables": {"issueId": "10001"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "getTest": {
                        "issueId": "10001",
                        "jira": {
                            "key": "TEST-1",
                            "summary": "Login works",
                            "labels": ["smoke"],
                            "customfield_10138": {"value": "Web"}
                        },
                        "steps": [
                            {"id": "1", "action": "Open", "data": "", "result": "Shown", "customFields": []}
                        ],
                        "preconditions": {"results": []}
                    }
                }
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;

        // When: 詳細を取得
        let detail = client
            .get_test(&IssueSummary::new("10001", "TEST-1"))
            .await
            .unwrap();

        // Then: ステップとカスタムフィールドが取得される
        assert_eq!(detail.key, "TEST-1");
        assert_eq!(detail.labels, vec!["smoke"]);
        assert_eq!(detail.steps.len(), 1);
        assert_eq!(detail.steps[0].expected_result, "Shown");
        assert_eq!(detail.custom_field("customfield_10138"), Some(&json!({"value": "Web"})));
    }

    #[tokio::test]
    async fn test_get_test_fills_identity_from_summary() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GRAPHQL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"getTest": {"issueId": "10002", "jira": null, "steps": null}}
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;
        let summary = IssueSummary::new("10002", "TEST-2").with_summary("From search");

        let detail = client.get_test(&summary).await.unwrap();

        assert_eq!(detail.key, "TEST-2");
        assert_eq!(detail.summary, "From search");
        assert!(detail.steps.is_empty());
    }

    #[tokio::test]
    async fn test_get_test_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GRAPHQL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"getTest": null}
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;

        let err = client
            .get_test(&IssueSummary::new("99999", "TEST-99"))
            .await
            .unwrap_err();

        match err {
            Error::DetailFailed { issue_key, source } => {
                assert_eq!(issue_key, "TEST-99");
                assert!(matches!(*source, Error::NotFound(ref id) if id == "99999"));
            }
            other => panic!("Expected DetailFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_test_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GRAPHQL_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server).await;

        let err = client
            .get_test(&IssueSummary::new("10001", "TEST-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DetailFailed { .. }));
        assert!(matches!(err.root(), Error::ApiError { status: 503, .. }));
    }
}
