use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// テストIssueの詳細（ステップ、事前条件、カスタムフィールド）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestDetail {
    pub issue_id: String,
    pub key: String,
    pub summary: String,
    pub labels: Vec<String>,
    pub preconditions: Vec<Precondition>,
    pub steps: Vec<TestStep>,
    /// `customfield_*` のみ。値はAPIが返したままのJSON
    pub custom_fields: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Precondition {
    pub key: Option<String>,
    pub summary: Option<String>,
    pub definition: Option<String>,
}

impl Precondition {
    /// `KEY - summary` 形式のタイトル（どちらかが欠けていれば None）
    pub fn title(&self) -> Option<String> {
        match (self.key.as_deref(), self.summary.as_deref()) {
            (Some(key), Some(summary)) if !key.is_empty() && !summary.is_empty() => {
                Some(format!("{} - {}", key, summary))
            }
            _ => None,
        }
    }

    /// 空白を正規化した定義文
    pub fn normalized_definition(&self) -> Option<String> {
        let normalized = self
            .definition
            .as_deref()?
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        (!normalized.is_empty()).then_some(normalized)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestStep {
    pub id: Option<String>,
    pub action: String,
    pub data: String,
    pub expected_result: String,
    /// ステップのカスタムフィールド "Precondition" の値
    pub precondition: String,
}

impl TestDetail {
    pub fn custom_field(&self, field_id: &str) -> Option<&Value> {
        self.custom_fields.get(field_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawTest {
    #[serde(rename = "issueId")]
    #[serde(default)]
    pub issue_id: Option<String>,
    #[serde(default)]
    pub jira: Option<Value>,
    #[serde(default)]
    pub steps: Option<Vec<Option<RawStep>>>,
    #[serde(default)]
    pub preconditions: Option<RawPreconditionPage>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawStep {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(rename = "customFields")]
    #[serde(default)]
    pub custom_fields: Option<Vec<Option<RawStepField>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawStepField {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawPreconditionPage {
    #[serde(default)]
    pub results: Option<Vec<Option<RawPrecondition>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawPrecondition {
    #[serde(default)]
    pub jira: Option<Value>,
    #[serde(default)]
    pub definition: Option<String>,
}

fn str_field(value: &Value, name: &str) -> Option<String> {
    value.get(name).and_then(Value::as_str).map(str::to_string)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl From<RawStep> for TestStep {
    fn from(raw: RawStep) -> Self {
        let precondition = raw
            .custom_fields
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .find(|field| {
                field
                    .name
                    .as_deref()
                    .map(|name| name.trim().eq_ignore_ascii_case("precondition"))
                    .unwrap_or(false)
            })
            .and_then(|field| field.value)
            .map(|value| value_text(&value))
            .unwrap_or_default();

        Self {
            id: raw.id,
            action: raw.action.unwrap_or_default().trim().to_string(),
            data: raw.data.unwrap_or_default().trim().to_string(),
            expected_result: raw.result.unwrap_or_default().trim().to_string(),
            precondition: precondition.trim().to_string(),
        }
    }
}

impl From<RawPrecondition> for Precondition {
    fn from(raw: RawPrecondition) -> Self {
        let jira = raw.jira.unwrap_or(Value::Null);
        Self {
            key: str_field(&jira, "key"),
            summary: str_field(&jira, "summary"),
            definition: raw.definition,
        }
    }
}

impl RawTest {
    /// 欠けている項目は空として扱い、`issue_id` はフォールバックに使う
    pub(crate) fn into_detail(self, issue_id: &str) -> TestDetail {
        let jira = self.jira.unwrap_or(Value::Null);

        let labels: Vec<String> = jira
            .get("labels")
            .and_then(Value::as_array)
            .map(|labels| labels.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();

        let custom_fields: BTreeMap<String, Value> = jira
            .as_object()
            .map(|fields| {
                fields
                    .iter()
                    .filter(|(id, _)| id.starts_with("customfield_"))
                    .map(|(id, value)| (id.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let steps: Vec<TestStep> = self
            .steps
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .map(TestStep::from)
            .collect();

        let preconditions: Vec<Precondition> = self
            .preconditions
            .and_then(|page| page.results)
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .map(Precondition::from)
            .collect();

        TestDetail {
            issue_id: self.issue_id.unwrap_or_else(|| issue_id.to_string()),
            key: str_field(&jira, "key").unwrap_or_default(),
            summary: str_field(&jira, "summary").unwrap_or_default(),
            labels,
            preconditions,
            steps,
            custom_fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detail_deserialization() {
        let json_data = json!({
            "issueId": "10001",
            "jira": {
                "key": "TEST-1",
                "summary": "Login works",
                "labels": ["smoke", "auth"],
                "status": {"name": "Open"},
                "customfield_10138": [{"value": "Web"}],
                "customfield_10167": null
            },
            "steps": [
                {
                    "id": "s1",
                    "action": "  Open the login page ",
                    "data": "user=alice",
                    "result": "Form is shown\n",
                    "customFields": [{"name": "Precondition", "value": " Browser open "}]
                },
                {"id": "s2", "action": "Submit", "result": "Logged in"}
            ],
            "preconditions": {
                "results": [
                    {"jira": {"key": "TEST-9", "summary": "User exists"}, "definition": "An   account\n exists"}
                ]
            }
        });

        let raw: RawTest = serde_json::from_value(json_data).unwrap();
        let detail = raw.into_detail("10001");

        assert_eq!(detail.key, "TEST-1");
        assert_eq!(detail.summary, "Login works");
        assert_eq!(detail.labels, vec!["smoke", "auth"]);
        assert_eq!(detail.custom_fields.len(), 2);
        assert!(detail.custom_field("status").is_none());
        assert_eq!(detail.steps.len(), 2);
        assert_eq!(detail.steps[0].action, "Open the login page");
        assert_eq!(detail.steps[0].data, "user=alice");
        assert_eq!(detail.steps[0].expected_result, "Form is shown");
        assert_eq!(detail.steps[0].precondition, "Browser open");
        assert_eq!(detail.steps[1].data, "");
        assert_eq!(detail.steps[1].precondition, "");
        assert_eq!(detail.preconditions[0].title().as_deref(), Some("TEST-9 - User exists"));
        assert_eq!(
            detail.preconditions[0].normalized_definition().as_deref(),
            Some("An account exists")
        );
    }

    #[test]
    fn test_detail_with_missing_optional_parts() {
        // Given: steps と preconditions が欠けたレスポンス
        let raw: RawTest = serde_json::from_value(json!({
            "jira": {"key": "TEST-2", "summary": "No steps"},
            "steps": null
        }))
        .unwrap();

        // When: TestDetailに変換
        let detail = raw.into_detail("10002");

        // Then: 空のシーケンスになり、issue_idは引数で補われる
        assert_eq!(detail.issue_id, "10002");
        assert!(detail.steps.is_empty());
        assert!(detail.preconditions.is_empty());
        assert!(detail.labels.is_empty());
        assert!(detail.custom_fields.is_empty());
    }

    #[test]
    fn test_precondition_without_key_has_no_title() {
        let precondition = Precondition {
            key: None,
            summary: Some("Orphan".to_string()),
            definition: Some("   ".to_string()),
        };

        assert_eq!(precondition.title(), None);
        assert_eq!(precondition.normalized_definition(), None);
    }
}
