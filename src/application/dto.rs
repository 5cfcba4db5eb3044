use crate::domain::SdkPayload;
use serde::{Deserialize, Serialize};

/// 支付请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayRequest {
    /// 支付宝订单信息字符串
    #[serde(default)]
    pub order_info: String,
}

/// 授权请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    #[serde(default)]
    pub auth_info: String,
}

/// 开关类请求（沙箱、调试模式）
#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub enabled: bool,
}

/// 调试日志请求
#[derive(Debug, Deserialize)]
pub struct LogRequest {
    pub level: String,
    pub message: String,
}

/// 宿主活动回调
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResultRequest {
    pub request_code: i32,
    pub result_code: i32,
    /// 回调携带的数据，可能为空
    #[serde(default)]
    pub data: Option<SdkPayload>,
}

/// 调试信息
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub attached: bool,
    pub sandbox_mode: bool,
    pub debug_mode: bool,
    pub payment_in_progress: bool,
    /// 最近一次准入时间（毫秒时间戳），空闲时为0
    pub last_payment_time: i64,
    pub pending_completions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alipay_installed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alipay_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alipay_error: Option<String>,
}

/// 错误响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: String, message: String) -> Self {
        Self { error, message }
    }
}
