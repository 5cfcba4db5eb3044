use crate::domain::errors::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 支付宝SDK回调请求码
pub const ALIPAY_SDK_REQUEST_CODE: i32 = 10000;

/// 结果字段名（由SDK约定，不可修改）
pub const RESULT_STATUS_KEY: &str = "resultStatus";
pub const RESULT_KEY: &str = "result";
pub const MEMO_KEY: &str = "memo";

/// SDK返回的扁平键值结果
pub type SdkPayload = BTreeMap<String, String>;

/// 支付结果状态码
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResultStatus {
    /// 支付成功
    Success,
    /// 正在处理中
    Processing,
    /// 支付失败
    Failed,
    /// 用户取消
    UserCanceled,
    /// 网络连接出错
    NetworkError,
    /// 未知错误
    Unknown,
    /// SDK返回的其他状态码，原样透传
    Other(String),
}

impl ResultStatus {
    /// SDK调用异常时使用的状态码，与支付失败共用 "4000"
    pub const INTERNAL_EXCEPTION: ResultStatus = ResultStatus::Failed;

    pub fn from_code(code: &str) -> Self {
        match code {
            "9000" => ResultStatus::Success,
            "8000" => ResultStatus::Processing,
            "4000" => ResultStatus::Failed,
            "6001" => ResultStatus::UserCanceled,
            "6002" => ResultStatus::NetworkError,
            "6004" => ResultStatus::Unknown,
            other => ResultStatus::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            ResultStatus::Success => "9000",
            ResultStatus::Processing => "8000",
            ResultStatus::Failed => "4000",
            ResultStatus::UserCanceled => "6001",
            ResultStatus::NetworkError => "6002",
            ResultStatus::Unknown => "6004",
            ResultStatus::Other(code) => code,
        }
    }

    pub fn is_success(&self) -> bool {
        *self == ResultStatus::Success
    }

    pub fn is_processing(&self) -> bool {
        *self == ResultStatus::Processing
    }

    pub fn is_cancelled(&self) -> bool {
        *self == ResultStatus::UserCanceled
    }

    /// 状态码对应的提示文字
    pub fn message(&self) -> &'static str {
        match self {
            ResultStatus::Success => "Payment succeeded",
            ResultStatus::Processing => "Payment result is being confirmed",
            ResultStatus::Failed => "Payment failed",
            ResultStatus::UserCanceled => "Payment canceled by user",
            ResultStatus::NetworkError => "Network connection error",
            ResultStatus::Unknown | ResultStatus::Other(_) => "Unknown error",
        }
    }

    /// 导出给宿主的常量表
    pub fn exported_constants() -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([
            ("SUCCESS", "9000"),
            ("PROCESSING", "8000"),
            ("FAILED", "4000"),
            ("CANCEL", "6001"),
            ("NETWORK_ERROR", "6002"),
            ("UNKNOWN", "6004"),
        ])
    }
}

impl From<String> for ResultStatus {
    fn from(code: String) -> Self {
        ResultStatus::from_code(&code)
    }
}

impl From<ResultStatus> for String {
    fn from(status: ResultStatus) -> Self {
        status.code().to_string()
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// SDK运行环境
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// 沙箱环境
    Sandbox,
    /// 正式环境
    Production,
}

impl Environment {
    pub fn from_sandbox_flag(enabled: bool) -> Self {
        if enabled {
            Environment::Sandbox
        } else {
            Environment::Production
        }
    }

    pub fn is_sandbox(&self) -> bool {
        *self == Environment::Sandbox
    }

    /// 解析配置值，`unset` 表示不主动设置环境
    pub fn parse_default(value: &str) -> Option<Option<Self>> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "unset" | "none" => Some(None),
            "sandbox" => Some(Some(Environment::Sandbox)),
            "production" | "online" => Some(Some(Environment::Production)),
            _ => None,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Sandbox => write!(f, "sandbox"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// 规范化后的支付结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    /// 结果状态码
    #[serde(rename = "resultStatus")]
    pub status: ResultStatus,

    /// SDK返回的原始结果，不做解析
    #[serde(rename = "result", default)]
    pub raw_payload: String,

    /// 备注信息
    #[serde(default)]
    pub memo: String,

    /// SDK返回的其他字段，原样透传
    #[serde(flatten)]
    pub extra: SdkPayload,
}

impl PaymentOutcome {
    pub fn new(status: ResultStatus, raw_payload: impl Into<String>, memo: impl Into<String>) -> Self {
        Self {
            status,
            raw_payload: raw_payload.into(),
            memo: memo.into(),
            extra: SdkPayload::new(),
        }
    }

    /// 转换为便于宿主判断的格式
    pub fn format(&self) -> FormattedResult {
        FormattedResult {
            success: self.status.is_success(),
            processing: self.status.is_processing(),
            cancelled: self.status.is_cancelled(),
            pending: self.status.is_processing(),
            result_status: self.status.clone(),
            message: self.status.message().to_string(),
            result: self.raw_payload.clone(),
            memo: self.memo.clone(),
            raw_result: Some(self.clone()),
            error: None,
        }
    }
}

/// 格式化后的支付结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedResult {
    pub success: bool,
    pub processing: bool,
    pub cancelled: bool,
    pub pending: bool,
    pub result_status: ResultStatus,
    pub message: String,
    pub result: String,
    pub memo: String,

    /// 原始结果，调用失败时为空
    pub raw_result: Option<PaymentOutcome>,

    /// 调用失败时的错误码
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FormattedResult {
    /// 调用未产生结果（被拒绝或出错）时的失败记录
    pub fn from_error(error: &DomainError) -> Self {
        let message = error.to_string();
        Self {
            success: false,
            processing: false,
            cancelled: false,
            pending: false,
            result_status: ResultStatus::Failed,
            message: message.clone(),
            result: String::new(),
            memo: message,
            raw_result: None,
            error: Some(error.code().to_string()),
        }
    }
}
