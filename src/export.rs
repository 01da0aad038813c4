use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::flatten::{ExportRow, flatten};
use crate::models::CustomFieldMap;
use crate::query::search_all;
use crate::repository::TestRepository;

/// 詳細取得に失敗してエクスポートから除外したテスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedIssue {
    pub issue_key: String,
    pub reason: String,
}

impl SkippedIssue {
    pub fn new(issue_key: &str, error: &Error) -> Self {
        Self {
            issue_key: issue_key.to_string(),
            reason: error.root().to_string(),
        }
    }
}

/// エクスポート処理の結果
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    /// JQLに一致したテスト数
    pub issue_count: usize,
    pub rows: Vec<ExportRow>,
    pub skipped: Vec<SkippedIssue>,
}

impl ExportReport {
    pub fn exported_count(&self) -> usize {
        self.issue_count - self.skipped.len()
    }
}

/// 検索 → 詳細取得 → 行展開 を順に実行する
///
/// 検索の失敗は致命的。詳細取得の失敗はログに残してそのテストだけ除外する。
pub async fn collect_rows<R>(
    repo: &R,
    jql: &str,
    page_size: u32,
    custom_fields: &CustomFieldMap,
) -> Result<ExportReport>
where
    R: TestRepository + ?Sized,
{
    let issues = search_all(repo, jql, page_size).await?;
    info!("{} test issues matched", issues.len());

    let mut report = ExportReport {
        issue_count: issues.len(),
        ..Default::default()
    };

    for (index, issue) in issues.iter().enumerate() {
        debug!(
            issue_key = %issue.issue_key,
            "Fetching detail {}/{}",
            index + 1,
            issues.len()
        );

        match repo.fetch_detail(issue).await {
            Ok(detail) => {
                let rows = flatten(issue, &detail, custom_fields);
                debug!(issue_key = %issue.issue_key, rows = rows.len(), "Flattened test");
                report.rows.extend(rows);
            }
            Err(e) => {
                warn!(issue_key = %issue.issue_key, error = %e, "Skipping test");
                report.skipped.push(SkippedIssue::new(&issue.issue_key, &e));
            }
        }
    }

    info!(
        "Collected {} rows from {} tests ({} skipped)",
        report.rows.len(),
        report.exported_count(),
        report.skipped.len()
    );

    Ok(report)
}
