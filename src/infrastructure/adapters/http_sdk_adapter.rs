use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::{Environment, SdkPayload};
use crate::infrastructure::config::AlipayConfig;
use crate::ports::AlipaySdkPort;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// 通过HTTP调用原生SDK宿主的适配器
///
/// 宿主进程持有支付宝SDK（PayTask/AuthTask/EnvUtils），本适配器只负责转发。
#[derive(Clone)]
pub struct HttpSdkAdapter {
    config: Arc<AlipayConfig>,
    client: Client,
}

impl HttpSdkAdapter {
    pub fn new(config: Arc<AlipayConfig>) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.sdk_timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/sdk/{}", self.config.sdk_base_url.trim_end_matches('/'), path)
    }

    async fn post(&self, path: &str, body: Value) -> DomainResult<Value> {
        let url = self.endpoint(path);
        debug!("SDK host request: POST {}", url);

        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("SDK host error: {} - {}", status, error_text);
            return Err(DomainError::SdkError(format!(
                "SDK host returned {}: {}",
                status, error_text
            )));
        }

        Ok(response.json().await?)
    }
}

/// 把SDK宿主返回的JSON对象转成扁平的字符串键值
pub fn parse_payload(value: Value) -> DomainResult<SdkPayload> {
    let Value::Object(map) = value else {
        return Err(DomainError::SdkError(format!(
            "expected a JSON object from SDK host, got {}",
            value
        )));
    };

    Ok(map
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((key, s)),
            other => Some((key, other.to_string())),
        })
        .collect())
}

fn environment_name(environment: Environment) -> &'static str {
    match environment {
        Environment::Sandbox => "SANDBOX",
        Environment::Production => "ONLINE",
    }
}

#[async_trait]
impl AlipaySdkPort for HttpSdkAdapter {
    async fn pay(&self, order_info: &str) -> DomainResult<SdkPayload> {
        let body = json!({ "orderInfo": order_info, "isShowPayLoading": true });
        parse_payload(self.post("pay", body).await?)
    }

    async fn auth(&self, auth_info: &str) -> DomainResult<SdkPayload> {
        let body = json!({ "authInfo": auth_info, "isShowLoading": true });
        parse_payload(self.post("auth", body).await?)
    }

    async fn version(&self) -> DomainResult<Option<String>> {
        let url = self.endpoint("version");
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DomainError::SdkError(format!(
                "Version lookup failed: {} - {}",
                status, error_text
            )));
        }

        let resp_json: Value = response.json().await?;
        Ok(resp_json["version"].as_str().map(String::from))
    }

    async fn set_environment(&self, environment: Environment) -> DomainResult<()> {
        let body = json!({ "env": environment_name(environment) });
        self.post("env", body).await?;
        Ok(())
    }
}
