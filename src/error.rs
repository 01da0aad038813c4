use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("GraphQL error: {0}")]
    GraphQL(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(#[source] Box<Error>),

    #[error("Unexpected token response: {0}")]
    InvalidToken(String),

    #[error("Test query failed: {0}")]
    QueryFailed(#[source] Box<Error>),

    #[error("Failed to fetch test {issue_key}: {source}")]
    DetailFailed {
        issue_key: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Test not found: {0}")]
    NotFound(String),

    #[error("No tests matched the JQL: {0}")]
    NoTestsFound(String),

    #[error("Failed to write {path}: {message}")]
    WriteFailed { path: String, message: String },

    #[error("Failed to write {path}: {source}")]
    WorkbookFailed {
        path: String,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },
}

impl Error {
    /// 認証ステージのエラーとしてラップ
    pub fn authentication(self) -> Self {
        match self {
            err @ Error::AuthenticationFailed(_) => err,
            err => Error::AuthenticationFailed(Box::new(err)),
        }
    }

    /// 検索ステージのエラーとしてラップ
    pub fn query(self) -> Self {
        match self {
            err @ Error::QueryFailed(_) => err,
            err => Error::QueryFailed(Box::new(err)),
        }
    }

    /// 詳細取得ステージのエラーとしてラップ
    pub fn detail(self, issue_key: impl Into<String>) -> Self {
        match self {
            err @ Error::DetailFailed { .. } => err,
            err => Error::DetailFailed {
                issue_key: issue_key.into(),
                source: Box::new(err),
            },
        }
    }

    pub fn write(path: impl AsRef<std::path::Path>, message: impl std::fmt::Display) -> Self {
        Error::WriteFailed {
            path: path.as_ref().display().to_string(),
            message: message.to_string(),
        }
    }

    pub fn workbook(path: impl AsRef<std::path::Path>, source: rust_xlsxwriter::XlsxError) -> Self {
        Error::WorkbookFailed {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// 出力ファイルに関するエラーか
    pub fn is_write_failure(&self) -> bool {
        matches!(self, Error::WriteFailed { .. } | Error::WorkbookFailed { .. })
    }

    /// ステージのラップを剥がした元のエラー
    pub fn root(&self) -> &Error {
        match self {
            Error::AuthenticationFailed(inner)
            | Error::QueryFailed(inner)
            | Error::DetailFailed { source: inner, .. } => inner.root(),
            other => other,
        }
    }

    /// HTTP 401 が原因かどうか
    pub fn is_unauthorized(&self) -> bool {
        match self.root() {
            Error::ApiError { status, .. } => *status == 401,
            Error::RequestFailed(e) => e.status().map(|s| s.as_u16() == 401).unwrap_or(false),
            _ => false,
        }
    }

    /// リクエストタイムアウトが原因かどうか
    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), Error::RequestFailed(e) if e.is_timeout())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_wrapping_is_idempotent() {
        // Given: 既に認証エラーとしてラップ済みのエラー
        let err = Error::ApiError {
            status: 401,
            message: "Unauthorized".to_string(),
        }
        .authentication();

        // When: もう一度ラップする
        let err = err.authentication();

        // Then: 二重にはラップされない
        match &err {
            Error::AuthenticationFailed(inner) => {
                assert!(matches!(**inner, Error::ApiError { status: 401, .. }));
            }
            _ => panic!("Expected AuthenticationFailed"),
        }
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_detail_error_message_names_issue() {
        let err = Error::NotFound("10001".to_string()).detail("TEST-1");

        assert_eq!(
            err.to_string(),
            "Failed to fetch test TEST-1: Test not found: 10001"
        );
        assert!(!err.is_unauthorized());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_query_error_keeps_root_cause() {
        let err = Error::GraphQL("jql is invalid".to_string()).query();

        assert!(matches!(err.root(), Error::GraphQL(msg) if msg == "jql is invalid"));
        assert_eq!(err.to_string(), "Test query failed: GraphQL error: jql is invalid");
    }

    #[test]
    fn test_workbook_error_keeps_source() {
        // Given: rust_xlsxwriter が返したエラー
        let mut sheet = rust_xlsxwriter::Worksheet::new();
        let xlsx_error = match sheet.set_name("") {
            Err(e) => e,
            Ok(_) => panic!("Expected blank sheet name to be rejected"),
        };
        let expected = xlsx_error.to_string();

        // When: 書き出しエラーとしてラップ
        let err = Error::workbook("out.xlsx", xlsx_error);

        // Then: 元のエラーが source として辿れる
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some(expected.as_str()));
        assert!(err.is_write_failure());
        assert!(err.to_string().starts_with("Failed to write out.xlsx: "));
        assert!(Error::write("out.xlsx", "file is read-only").is_write_failure());
    }
}
