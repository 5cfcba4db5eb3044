use crate::application::ModuleConfig;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::{Environment, STALE_THRESHOLD_MS};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// 支付宝桥接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlipayConfig {
    /// 原生SDK宿主地址
    pub sdk_base_url: String,

    /// 默认环境，None 表示不主动设置
    pub default_environment: Option<Environment>,

    /// 授权是否共用支付防重守卫
    pub guard_authorization: bool,

    /// 超时阈值（毫秒）
    pub stale_threshold_ms: i64,

    /// SDK宿主请求超时（秒）
    pub sdk_timeout_secs: u64,

    /// 监听地址
    pub server_host: String,

    /// 监听端口
    pub server_port: u16,
}

impl AlipayConfig {
    pub fn from_env() -> DomainResult<Arc<Self>> {
        Self::from_lookup(|key| std::env::var(key).ok()).map(Arc::new)
    }

    pub fn from_lookup<F>(lookup: F) -> DomainResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_environment = match lookup("ALIPAY_DEFAULT_ENV") {
            Some(value) => Environment::parse_default(&value).ok_or_else(|| {
                DomainError::ConfigurationError(format!(
                    "ALIPAY_DEFAULT_ENV must be sandbox, production or unset, got {}",
                    value
                ))
            })?,
            None => None,
        };

        let stale_threshold_ms = parse_or(&lookup, "ALIPAY_STALE_THRESHOLD_MS", STALE_THRESHOLD_MS)?;
        if stale_threshold_ms <= 0 {
            return Err(DomainError::ConfigurationError(
                "ALIPAY_STALE_THRESHOLD_MS must be positive".to_string(),
            ));
        }

        Ok(Self {
            sdk_base_url: lookup("ALIPAY_SDK_BASE_URL")
                .unwrap_or_else(|| "http://127.0.0.1:8765".to_string()),
            default_environment,
            guard_authorization: parse_or(&lookup, "ALIPAY_GUARD_AUTH", false)?,
            stale_threshold_ms,
            sdk_timeout_secs: parse_or(&lookup, "ALIPAY_SDK_TIMEOUT_SECS", 60)?,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            server_port: parse_or(&lookup, "SERVER_PORT", 3000)?,
        })
    }

    pub fn module_config(&self) -> ModuleConfig {
        ModuleConfig {
            default_environment: self.default_environment,
            guard_authorization: self.guard_authorization,
            stale_threshold_ms: self.stale_threshold_ms,
            sdk_call_timeout: Duration::from_secs(self.sdk_timeout_secs),
            ..ModuleConfig::default()
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> DomainResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| {
            DomainError::ConfigurationError(format!("{} is invalid: {}", key, e))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AlipayConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.default_environment, None);
        assert!(!config.guard_authorization);
        assert_eq!(config.stale_threshold_ms, 3000);
        assert_eq!(config.listen_addr(), "127.0.0.1:3000");
    }

    #[test]
    fn test_explicit_values() {
        let config = AlipayConfig::from_lookup(lookup(&[
            ("ALIPAY_DEFAULT_ENV", "sandbox"),
            ("ALIPAY_GUARD_AUTH", "true"),
            ("ALIPAY_STALE_THRESHOLD_MS", "5000"),
            ("SERVER_PORT", "8080"),
        ]))
        .unwrap();

        let module = config.module_config();
        assert_eq!(module.default_environment, Some(Environment::Sandbox));
        assert!(module.guard_authorization);
        assert_eq!(module.stale_threshold_ms, 5000);
        assert_eq!(module.sdk_call_timeout, Duration::from_secs(60));
        assert_eq!(config.server_port, 8080);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let err = AlipayConfig::from_lookup(lookup(&[("ALIPAY_DEFAULT_ENV", "staging")]))
            .unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION_ERROR");

        assert!(AlipayConfig::from_lookup(lookup(&[("ALIPAY_GUARD_AUTH", "maybe")])).is_err());
        assert!(AlipayConfig::from_lookup(lookup(&[("ALIPAY_STALE_THRESHOLD_MS", "0")])).is_err());
    }
}
