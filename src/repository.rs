use async_trait::async_trait;

use crate::client::XrayClient;
use crate::error::Result;
use crate::models::{IssueSummary, SearchParams, TestDetail, TestPage};

/// テストデータの取得元の抽象化トレイト
#[async_trait]
pub trait TestRepository: Send + Sync {
    /// JQL検索の1ページを取得
    async fn search_page(&self, params: &SearchParams) -> Result<TestPage>;

    /// 1件のテストの詳細を取得
    async fn fetch_detail(&self, issue: &IssueSummary) -> Result<TestDetail>;
}

#[async_trait]
impl TestRepository for XrayClient {
    async fn search_page(&self, params: &SearchParams) -> Result<TestPage> {
        self.get_tests(params).await
    }

    async fn fetch_detail(&self, issue: &IssueSummary) -> Result<TestDetail> {
        self.get_test(issue).await
    }
}
