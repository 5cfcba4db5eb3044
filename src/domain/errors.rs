use thiserror::Error;

/// 领域层错误类型
#[derive(Error, Debug)]
pub enum DomainError {
    /// 宿主上下文不可用
    #[error("Host context is not available")]
    HostUnavailable,

    /// 支付参数为空
    #[error("Order info must not be empty")]
    EmptyOrder,

    /// 授权参数为空
    #[error("Auth info must not be empty")]
    EmptyAuth,

    /// 支付正在进行中
    #[error("Payment already in progress, retry in {retry_after_ms}ms")]
    PaymentInProgress { retry_after_ms: i64 },

    /// 授权正在进行中
    #[error("Authorization blocked by an in-flight session, retry in {retry_after_ms}ms")]
    AuthorizationInProgress { retry_after_ms: i64 },

    /// 设置环境失败
    #[error("Failed to set environment: {0}")]
    EnvironmentSetting(String),

    /// 获取版本失败
    #[error("Failed to get Alipay version: {0}")]
    VersionLookup(String),

    /// SDK调用错误
    #[error("Alipay SDK error: {0}")]
    SdkError(String),

    /// HTTP请求错误
    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// 配置错误
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// 返回给宿主的固定错误码
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::HostUnavailable => "ERR_ACTIVITY_NOT_FOUND",
            DomainError::EmptyOrder => "ERR_EMPTY_ORDER",
            DomainError::EmptyAuth => "ERR_EMPTY_AUTH",
            DomainError::PaymentInProgress { .. } => "PAY_IN_PROGRESS",
            DomainError::AuthorizationInProgress { .. } => "AUTH_IN_PROGRESS",
            DomainError::EnvironmentSetting(_) => "ENV_SETTING_ERROR",
            DomainError::VersionLookup(_) => "GET_VERSION_ERROR",
            DomainError::SdkError(_) | DomainError::HttpError(_) => "SDK_ERROR",
            DomainError::SerializationError(_) => "SERIALIZATION_ERROR",
            DomainError::ConfigurationError(_) => "CONFIGURATION_ERROR",
            DomainError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否属于前置条件失败（未产生会话）
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            DomainError::HostUnavailable | DomainError::EmptyOrder | DomainError::EmptyAuth
        )
    }

    /// 是否属于准入冲突
    pub fn is_admission_conflict(&self) -> bool {
        matches!(
            self,
            DomainError::PaymentInProgress { .. } | DomainError::AuthorizationInProgress { .. }
        )
    }
}

/// 领域结果类型
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbolic_codes() {
        assert_eq!(DomainError::EmptyOrder.code(), "ERR_EMPTY_ORDER");
        assert_eq!(
            DomainError::PaymentInProgress { retry_after_ms: 10 }.code(),
            "PAY_IN_PROGRESS"
        );
        assert_eq!(
            DomainError::EnvironmentSetting("boom".to_string()).code(),
            "ENV_SETTING_ERROR"
        );
    }

    #[test]
    fn test_classification() {
        assert!(DomainError::HostUnavailable.is_precondition());
        assert!(!DomainError::HostUnavailable.is_admission_conflict());
        assert!(DomainError::AuthorizationInProgress { retry_after_ms: 0 }.is_admission_conflict());
    }
}
