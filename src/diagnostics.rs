//! カスタムフィールドIDを調べるための診断モード

use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::export::SkippedIssue;
use crate::flatten::Cell;
use crate::models::{FieldValue, IssueSummary, SearchParams, TestDetail};
use crate::repository::TestRepository;

pub const DIAGNOSTIC_COLUMNS: [&str; 4] = ["Field ID", "Issue Key", "Display Value", "Raw Value"];

/// (フィールド, Issue) ごとの1行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRow {
    pub field_id: String,
    pub issue_key: String,
    /// APIが返したJSON。フィールドがなければ空
    pub raw_value: String,
    pub display_value: String,
}

impl DiagnosticRow {
    pub fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(&self.field_id),
            Cell::text(&self.issue_key),
            Cell::text(&self.display_value),
            Cell::text(&self.raw_value),
        ]
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiagnosticReport {
    pub sampled: Vec<String>,
    pub field_ids: Vec<String>,
    pub rows: Vec<DiagnosticRow>,
    pub skipped: Vec<SkippedIssue>,
}

/// サンプル中の全カスタムフィールドを (フィールド, Issue) の組で列挙する
///
/// フィールドはサンプル全体の和集合をID順に並べる。あるIssueに存在しない
/// フィールドも空の値で出力するので、行数は常に「Issue数 × フィールド数」になる。
pub fn diagnostic_rows(samples: &[TestDetail]) -> (Vec<String>, Vec<DiagnosticRow>) {
    let field_ids: Vec<String> = samples
        .iter()
        .flat_map(|detail| detail.custom_fields.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let rows = field_ids
        .iter()
        .flat_map(|field_id| {
            samples.iter().map(move |detail| {
                let raw = detail.custom_field(field_id);
                DiagnosticRow {
                    field_id: field_id.clone(),
                    issue_key: detail.key.clone(),
                    raw_value: raw.map(raw_text).unwrap_or_default(),
                    display_value: FieldValue::from(raw).to_display(),
                }
            })
        })
        .collect();

    (field_ids, rows)
}

fn raw_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// 検索結果の先頭 `sample_size` 件の詳細を取得し、全カスタムフィールドを出力する
pub async fn diagnose<R>(repo: &R, jql: &str, sample_size: u32) -> Result<DiagnosticReport>
where
    R: TestRepository + ?Sized,
{
    let sample_size = sample_size.max(1);
    info!("Fetching up to {} sample tests", sample_size);

    let params = SearchParams::new(jql).start(0).limit(sample_size);
    let page = repo.search_page(&params).await.map_err(Error::query)?;

    let sample: Vec<IssueSummary> = page.results.into_iter().take(sample_size as usize).collect();
    if sample.is_empty() {
        return Err(Error::NoTestsFound(jql.to_string()));
    }
    info!("{} tests fetched for diagnosis", sample.len());

    let mut details = Vec::with_capacity(sample.len());
    let mut skipped = Vec::new();
    for issue in &sample {
        match repo.fetch_detail(issue).await {
            Ok(mut detail) => {
                if detail.key.is_empty() {
                    detail.key = issue.issue_key.clone();
                }
                details.push(detail);
            }
            Err(e) => {
                warn!(issue_key = %issue.issue_key, error = %e, "Skipping test");
                skipped.push(SkippedIssue::new(&issue.issue_key, &e));
            }
        }
    }

    let (field_ids, rows) = diagnostic_rows(&details);
    info!("Found {} custom fields across {} tests", field_ids.len(), details.len());

    Ok(DiagnosticReport {
        sampled: details.into_iter().map(|d| d.key).collect(),
        field_ids,
        rows,
        skipped,
    })
}
