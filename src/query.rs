use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::client::XrayClient;
use crate::error::{Error, Result};
use crate::models::{IssueSummary, RawTestPage, SearchParams, TestPage};
use crate::repository::TestRepository;

pub(crate) const GET_TESTS_QUERY: &str = r#"
query ($jql: String!, $limit: Int!, $start: Int!) {
  getTests(jql: $jql, limit: $limit, start: $start) {
    total
    start
    limit
    results {
      issueId
      jira(fields: ["key", "summary"])
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GetTestsData {
    #[serde(rename = "getTests")]
    get_tests: Option<RawTestPage>,
}

impl XrayClient {
    /// `getTests` を1ページ分実行
    pub async fn get_tests(&self, params: &SearchParams) -> Result<TestPage> {
        debug!(start = params.start, limit = params.limit, "Fetching test page");

        let data: GetTestsData = self
            .graphql(GET_TESTS_QUERY.trim(), serde_json::to_value(params)?)
            .await?;

        data.get_tests
            .map(TestPage::from)
            .ok_or_else(|| Error::GraphQL("getTests returned no data".to_string()))
    }
}

/// JQLに一致するテストをページングしながら全件取得
///
/// 次のいずれかで終了する:
/// - ページが実効ページサイズより短い
/// - 取得位置が `total` に達した
/// - 結果が空、または新しいIssueが1件も含まれない（進捗が止まった）
///
/// 1ページでも失敗すれば全体を [`Error::QueryFailed`] として中断する。
pub async fn search_all<R>(repo: &R, jql: &str, page_size: u32) -> Result<Vec<IssueSummary>>
where
    R: TestRepository + ?Sized,
{
    let page_size = page_size.max(1);
    let mut issues = Vec::new();
    let mut seen = HashSet::new();
    let mut start = 0u32;

    loop {
        let params = SearchParams::new(jql).start(start).limit(page_size);
        let page = repo.search_page(&params).await.map_err(Error::query)?;

        let returned = page.results.len() as u32;
        let mut added = 0usize;
        for issue in page.results {
            if seen.insert(issue.issue_id.clone()) {
                issues.push(issue);
                added += 1;
            }
        }

        match page.total {
            Some(total) => info!("Fetched {}/{} tests", issues.len(), total),
            None => info!("Fetched {} tests", issues.len()),
        }

        if returned == 0 || added == 0 {
            break;
        }

        start = start.saturating_add(returned);

        // サーバーが limit を切り詰めた場合はその値を基準にする
        let effective_limit = page.limit.filter(|limit| *limit > 0).unwrap_or(page_size).min(page_size);
        if returned < effective_limit {
            break;
        }
        if page.total.is_some_and(|total| start >= total) {
            break;
        }
    }

    Ok(issues)
}
