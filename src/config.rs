use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};
use crate::models::CustomFieldMap;

pub const DEFAULT_BASE_URL: &str = "https://xray.cloud.getxray.app";
pub const DEFAULT_OUTFILE: &str = "xray_tests.xlsx";
pub const DIAGNOSTICS_OUTFILE: &str = "field_diagnostics.xlsx";
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_SAMPLE_SIZE: u32 = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const ENV_CLIENT_ID: &str = "XRAY_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "XRAY_CLIENT_SECRET";
pub const ENV_JQL: &str = "JIRA_JQL";
pub const ENV_BASE_URL: &str = "XRAY_BASE_URL";
pub const ENV_CUSTOM_FIELDS: &str = "XRAY_CUSTOM_FIELDS";
pub const ENV_TIMEOUT_SECS: &str = "XRAY_TIMEOUT_SECS";

/// 1回の実行で使う設定。起動時に組み立て、以降は変更しない
#[derive(Clone)]
pub struct Config {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub jql: String,
    pub custom_fields: CustomFieldMap,
    pub request_timeout: Duration,
    pub outfile: Option<PathBuf>,
    pub diagnose: bool,
    pub page_size: u32,
    pub sample_size: u32,
}

impl Config {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        jql: impl Into<String>,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let _ = Url::parse(&base_url)
            .map_err(|_| Error::InvalidConfiguration(format!("Invalid base URL: {}", base_url)))?;

        let client_id = clean_secret(&client_id.into());
        let client_secret = clean_secret(&client_secret.into());
        let jql = jql.into().trim().to_string();

        if client_id.is_empty() {
            return Err(Error::ConfigurationMissing(format!("{} is empty", ENV_CLIENT_ID)));
        }
        if client_secret.is_empty() {
            return Err(Error::ConfigurationMissing(format!("{} is empty", ENV_CLIENT_SECRET)));
        }
        if jql.is_empty() {
            return Err(Error::ConfigurationMissing(format!("{} is empty", ENV_JQL)));
        }

        Ok(Self {
            base_url,
            client_id,
            client_secret,
            jql,
            custom_fields: CustomFieldMap::default(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            outfile: None,
            diagnose: false,
            page_size: DEFAULT_PAGE_SIZE,
            sample_size: DEFAULT_SAMPLE_SIZE,
        })
    }

    /// プロセス環境変数から読み込む（.env は呼び出し側で読み込み済みであること）
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意のキー・値ソースから読み込む
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| {
                    Error::ConfigurationMissing(format!("{} not found in environment", key))
                })
        };

        let client_id = required(ENV_CLIENT_ID)?;
        let client_secret = required(ENV_CLIENT_SECRET)?;
        let jql = required(ENV_JQL)?;

        let base_url = lookup(ENV_BASE_URL)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut config = Self::new(base_url, client_id, client_secret, jql)?;

        if let Some(spec) = lookup(ENV_CUSTOM_FIELDS).filter(|spec| !spec.trim().is_empty()) {
            config.custom_fields = CustomFieldMap::parse(&spec)?;
        }

        if let Some(secs) = lookup(ENV_TIMEOUT_SECS).filter(|secs| !secs.trim().is_empty()) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                Error::InvalidConfiguration(format!("{} must be a number of seconds", ENV_TIMEOUT_SECS))
            })?;
            if secs == 0 {
                return Err(Error::InvalidConfiguration(format!(
                    "{} must be greater than zero",
                    ENV_TIMEOUT_SECS
                )));
            }
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn custom_fields(mut self, custom_fields: CustomFieldMap) -> Self {
        self.custom_fields = custom_fields;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn outfile(mut self, outfile: Option<PathBuf>) -> Self {
        self.outfile = outfile;
        self
    }

    pub fn diagnose(mut self, diagnose: bool) -> Self {
        self.diagnose = diagnose;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Result<Self> {
        if page_size == 0 {
            return Err(Error::InvalidConfiguration("page size must be at least 1".to_string()));
        }
        self.page_size = page_size;
        Ok(self)
    }

    pub fn sample_size(mut self, sample_size: u32) -> Result<Self> {
        if sample_size == 0 {
            return Err(Error::InvalidConfiguration("sample size must be at least 1".to_string()));
        }
        self.sample_size = sample_size;
        Ok(self)
    }

    /// 書き込み先。診断モードでは --outfile を無視して固定ファイル名
    pub fn output_path(&self) -> &Path {
        if self.diagnose {
            Path::new(DIAGNOSTICS_OUTFILE)
        } else {
            self.outfile
                .as_deref()
                .unwrap_or_else(|| Path::new(DEFAULT_OUTFILE))
        }
    }

    /// ログ出力用に伏せ字にしたクライアントID
    pub fn masked_client_id(&self) -> String {
        mask(&self.client_id)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("client_id", &self.masked_client_id())
            .field("client_secret", &"***")
            .field("jql", &self.jql)
            .field("custom_fields", &self.custom_fields)
            .field("request_timeout", &self.request_timeout)
            .field("outfile", &self.outfile)
            .field("diagnose", &self.diagnose)
            .field("page_size", &self.page_size)
            .field("sample_size", &self.sample_size)
            .finish()
    }
}

/// 前後の空白と引用符を取り除く
fn clean_secret(value: &str) -> String {
    value
        .trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .trim()
        .to_string()
}

fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
