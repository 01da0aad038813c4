use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 検索結果の1件（テストIssueの識別情報）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub issue_id: String,
    pub issue_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl IssueSummary {
    pub fn new(issue_id: impl Into<String>, issue_key: impl Into<String>) -> Self {
        Self {
            issue_id: issue_id.into(),
            issue_key: issue_key.into(),
            summary: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchParams {
    pub jql: String,
    pub start: u32,
    pub limit: u32,
}

impl SearchParams {
    pub fn new(jql: impl Into<String>) -> Self {
        Self {
            jql: jql.into(),
            start: 0,
            limit: 100,
        }
    }

    pub fn start(mut self, start: u32) -> Self {
        self.start = start;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

/// `getTests` の1ページ分
#[derive(Debug, Clone, Default)]
pub struct TestPage {
    pub total: Option<u32>,
    pub start: Option<u32>,
    pub limit: Option<u32>,
    pub results: Vec<IssueSummary>,
}

/// GraphQLレスポンスの `getTests` 部分
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawTestPage {
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default)]
    pub start: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub results: Option<Vec<RawSearchHit>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawSearchHit {
    #[serde(rename = "issueId")]
    #[serde(default)]
    pub issue_id: Option<String>,
    #[serde(default)]
    pub jira: Option<Value>,
}

impl From<RawTestPage> for TestPage {
    fn from(raw: RawTestPage) -> Self {
        let results = raw
            .results
            .unwrap_or_default()
            .into_iter()
            .filter_map(|hit| {
                let jira = hit.jira.unwrap_or(Value::Null);
                let key = jira.get("key").and_then(Value::as_str).map(str::to_string);
                let issue_id = hit
                    .issue_id
                    .or_else(|| jira.get("id").and_then(Value::as_str).map(str::to_string))?;
                let summary = jira.get("summary").and_then(Value::as_str).map(str::to_string);
                Some(IssueSummary {
                    issue_key: key.unwrap_or_else(|| issue_id.clone()),
                    issue_id,
                    summary,
                })
            })
            .collect();

        Self {
            total: raw.total,
            start: raw.start,
            limit: raw.limit,
            results,
        }
    }
}
