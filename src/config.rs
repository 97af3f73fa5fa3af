use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 评分服务地址
    pub api_base_url: String,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 完成标记文件路径（结果页据此判断是否放行）
    pub marker_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout_secs: 30,
            marker_file: "survey_session.toml".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 先读 `SURVEY_CONFIG_FILE` 指向的 TOML 文件（如有），再用环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var("SURVEY_CONFIG_FILE") {
            Ok(path) => Self::from_toml_file(Path::new(&path))?.with_env_overrides(),
            Err(_) => Self::from_env(),
        }
    }

    /// 默认值 + 环境变量覆盖
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::ParseFailed {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn with_env_overrides(self) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: std::env::var("SURVEY_API_BASE_URL").unwrap_or(self.api_base_url),
            request_timeout_secs: parse_env("SURVEY_REQUEST_TIMEOUT_SECS")?
                .unwrap_or(self.request_timeout_secs),
            marker_file: std::env::var("SURVEY_MARKER_FILE").unwrap_or(self.marker_file),
            verbose_logging: parse_env("VERBOSE_LOGGING")?.unwrap_or(self.verbose_logging),
        })
    }
}

/// 环境变量存在但无法解析时报错，不存在时返回 None
fn parse_env<T: std::str::FromStr>(var_name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                expected_type: std::any::type_name::<T>().to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}
