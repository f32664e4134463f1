//! 配置管理模块
//!
//! 启动时从进程环境一次性构造显式配置结构，之后按引用传入各组件；
//! 热路径中不做任何环境变量查找。

use crate::models::ProviderType;
use std::env;
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_DB_PATH: &str = "./speedtest.db";

/// 应用配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP 监听端口
    pub port: u16,
    /// SQLite 数据库文件路径
    pub database_path: PathBuf,
    /// 各 Provider 的 API Key
    pub api_keys: ApiKeys,
}

impl AppConfig {
    /// 从进程环境读取配置
    ///
    /// 缺失的 API Key 不是启动错误；只有实际请求到对应 Provider
    /// 时才作为配置故障上报。
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let database_path = env::var("SPEEDCAST_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_PATH));

        Self {
            port,
            database_path,
            api_keys: ApiKeys::from_env(),
        }
    }
}

/// 各 Provider 的上游凭证
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    openai: Option<String>,
    anthropic: Option<String>,
    gemini: Option<String>,
    openrouter: Option<String>,
    hyperbolic: Option<String>,
}

impl ApiKeys {
    pub fn from_env() -> Self {
        Self {
            openai: non_empty(env::var("OPENAI_API_KEY").ok()),
            anthropic: non_empty(env::var("ANTHROPIC_API_KEY").ok()),
            gemini: non_empty(env::var("GEMINI_API_KEY").ok()),
            openrouter: non_empty(env::var("OPENROUTER_API_KEY").ok()),
            hyperbolic: non_empty(env::var("HYPERBOLIC_API_KEY").ok()),
        }
    }

    /// 构造固定凭证集（测试与嵌入式使用）
    pub fn with_key(mut self, provider: ProviderType, key: impl Into<String>) -> Self {
        let key = Some(key.into());
        match provider {
            ProviderType::OpenAi => self.openai = key,
            ProviderType::Anthropic => self.anthropic = key,
            ProviderType::Gemini => self.gemini = key,
            ProviderType::OpenRouter => self.openrouter = key,
            ProviderType::Hyperbolic => self.hyperbolic = key,
        }
        self
    }

    /// 查询指定 Provider 的 API Key
    pub fn key_for(&self, provider: ProviderType) -> Option<&str> {
        match provider {
            ProviderType::OpenAi => self.openai.as_deref(),
            ProviderType::Anthropic => self.anthropic.as_deref(),
            ProviderType::Gemini => self.gemini.as_deref(),
            ProviderType::OpenRouter => self.openrouter.as_deref(),
            ProviderType::Hyperbolic => self.hyperbolic.as_deref(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_lookup() {
        let keys = ApiKeys::default()
            .with_key(ProviderType::OpenAi, "sk-test")
            .with_key(ProviderType::Gemini, "AIza-test");

        assert_eq!(keys.key_for(ProviderType::OpenAi), Some("sk-test"));
        assert_eq!(keys.key_for(ProviderType::Gemini), Some("AIza-test"));
        assert_eq!(keys.key_for(ProviderType::Anthropic), None);
        assert_eq!(keys.key_for(ProviderType::OpenRouter), None);
        assert_eq!(keys.key_for(ProviderType::Hyperbolic), None);
    }

    #[test]
    fn test_blank_key_treated_as_absent() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some(String::new())), None);
        assert_eq!(non_empty(Some("sk-1".to_string())), Some("sk-1".to_string()));
        assert_eq!(non_empty(None), None);
    }
}
