use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Jiraのカスタムフィールド値の形状
///
/// APIが返す値はテキスト、`{"value": ...}` 形式の選択肢、またはその配列のいずれか。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Empty,
    Scalar(String),
    Tagged(String),
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// 値を表示用の文字列に正規化
    pub fn to_display(&self) -> String {
        match self {
            FieldValue::Empty => String::new(),
            FieldValue::Scalar(s) | FieldValue::Tagged(s) => s.clone(),
            FieldValue::List(items) => items
                .iter()
                .map(FieldValue::to_display)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    fn from_item(value: &Value) -> Self {
        match value {
            Value::Array(_) => FieldValue::Scalar(value.to_string()),
            other => FieldValue::from(other),
        }
    }
}

impl From<&Value> for FieldValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Empty,
            Value::String(s) if s.is_empty() => FieldValue::Empty,
            Value::String(s) => FieldValue::Scalar(s.clone()),
            Value::Bool(b) => FieldValue::Scalar(b.to_string()),
            Value::Number(n) => FieldValue::Scalar(n.to_string()),
            Value::Array(items) => FieldValue::List(items.iter().map(FieldValue::from_item).collect()),
            Value::Object(map) if map.is_empty() => FieldValue::Empty,
            // 選択肢は value、コンポーネントやバージョンは name を持つ
            Value::Object(map) => match map.get("value").or_else(|| map.get("name")) {
                Some(Value::String(s)) => FieldValue::Tagged(s.clone()),
                Some(Value::Null) => FieldValue::Empty,
                Some(other) => FieldValue::Tagged(other.to_string()),
                None => FieldValue::Scalar(value.to_string()),
            },
        }
    }
}

impl From<Option<&Value>> for FieldValue {
    fn from(value: Option<&Value>) -> Self {
        value.map(FieldValue::from).unwrap_or(FieldValue::Empty)
    }
}

/// エクスポートするカスタムフィールドの定義（フィールドID → 列名、順序保持）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldMap(Vec<(String, String)>);

impl CustomFieldMap {
    pub fn new<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields: Vec<(String, String)> = Vec::new();
        for (id, name) in entries {
            let id = id.into().trim().to_string();
            let name = name.into().trim().to_string();
            if id.is_empty() || name.is_empty() {
                return Err(Error::InvalidConfiguration(
                    "custom field id and column name must not be empty".to_string(),
                ));
            }
            if fields.iter().any(|(existing, _)| *existing == id) {
                return Err(Error::InvalidConfiguration(format!(
                    "custom field {} is listed more than once",
                    id
                )));
            }
            fields.push((id, name));
        }
        Ok(Self(fields))
    }

    /// `customfield_10138=Components;customfield_10167=Severity` 形式をパース
    pub fn parse(spec: &str) -> Result<Self> {
        let entries = spec
            .split(';')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                entry.split_once('=').ok_or_else(|| {
                    Error::InvalidConfiguration(format!(
                        "custom field entry '{}' must look like <field id>=<column name>",
                        entry
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(entries)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(id, name)| (id.as_str(), name.as_str()))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(_, name)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for CustomFieldMap {
    fn default() -> Self {
        // フィールドIDが不明な場合は --diagnose-fields で調べる
        Self(vec![
            ("customfield_10138".to_string(), "Components".to_string()),
            ("customfield_10167".to_string(), "Custom Field 2".to_string()),
        ])
    }
}
