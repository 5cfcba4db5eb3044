use crate::application::{
    ActivityResultRequest, AlipayModule, AuthRequest, ErrorResponse, LogRequest, PayRequest,
    ToggleRequest,
};
use crate::domain::FormattedResult;
use crate::domain::errors::DomainError;
use crate::ports::{AlipaySdkPort, ClockPort};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// 应用状态
pub struct AppState<S: AlipaySdkPort, C: ClockPort> {
    pub module: Arc<AlipayModule<S, C>>,
}

impl<S: AlipaySdkPort, C: ClockPort> Clone for AppState<S, C> {
    fn clone(&self) -> Self {
        Self {
            module: self.module.clone(),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// 把领域错误转换为带固定错误码的拒绝响应
fn reject(e: DomainError) -> ApiError {
    let status = match &e {
        DomainError::EmptyOrder | DomainError::EmptyAuth => StatusCode::BAD_REQUEST,
        DomainError::PaymentInProgress { .. } | DomainError::AuthorizationInProgress { .. } => {
            StatusCode::CONFLICT
        }
        DomainError::HostUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        DomainError::EnvironmentSetting(_) | DomainError::VersionLookup(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Bridge call failed: {}", e);
    }
    (
        status,
        Json(ErrorResponse::new(e.code().to_string(), e.to_string())),
    )
}

/// 发起支付
pub async fn pay<S: AlipaySdkPort, C: ClockPort>(
    State(state): State<AppState<S, C>>,
    Json(request): Json<PayRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Received pay request");

    state
        .module
        .pay(&request.order_info)
        .await
        .map(|outcome| (StatusCode::OK, Json(outcome)))
        .map_err(reject)
}

/// 发起支付并返回格式化结果，失败也以格式化结果返回
pub async fn pay_formatted<S: AlipaySdkPort, C: ClockPort>(
    State(state): State<AppState<S, C>>,
    Json(request): Json<PayRequest>,
) -> impl IntoResponse {
    let formatted = match state.module.pay(&request.order_info).await {
        Ok(outcome) => outcome.format(),
        Err(e) => {
            info!("Formatted pay failed: {}", e);
            FormattedResult::from_error(&e)
        }
    };
    (StatusCode::OK, Json(formatted))
}

/// 发起授权
pub async fn auth<S: AlipaySdkPort, C: ClockPort>(
    State(state): State<AppState<S, C>>,
    Json(request): Json<AuthRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Received auth request");

    state
        .module
        .auth(&request.auth_info)
        .await
        .map(|outcome| (StatusCode::OK, Json(outcome)))
        .map_err(reject)
}

/// 重置支付状态
pub async fn reset_payment_state<S: AlipaySdkPort, C: ClockPort>(
    State(state): State<AppState<S, C>>,
) -> impl IntoResponse {
    Json(json!({ "reset": state.module.reset_payment_state() }))
}

pub async fn set_sandbox_mode<S: AlipaySdkPort, C: ClockPort>(
    State(state): State<AppState<S, C>>,
    Json(request): Json<ToggleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .module
        .set_sandbox_mode(request.enabled)
        .await
        .map(|enabled| Json(json!({ "sandbox": enabled })))
        .map_err(reject)
}

pub async fn is_sandbox_enabled<S: AlipaySdkPort, C: ClockPort>(
    State(state): State<AppState<S, C>>,
) -> impl IntoResponse {
    Json(json!({ "sandbox": state.module.is_sandbox_enabled() }))
}

pub async fn is_alipay_installed<S: AlipaySdkPort, C: ClockPort>(
    State(state): State<AppState<S, C>>,
) -> impl IntoResponse {
    Json(json!({ "installed": state.module.is_alipay_installed().await }))
}

pub async fn alipay_version<S: AlipaySdkPort, C: ClockPort>(
    State(state): State<AppState<S, C>>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .module
        .alipay_version()
        .await
        .map(|version| Json(json!({ "version": version })))
        .map_err(reject)
}

pub async fn constants<S: AlipaySdkPort, C: ClockPort>(
    State(state): State<AppState<S, C>>,
) -> impl IntoResponse {
    Json(state.module.constants())
}

pub async fn set_debug_mode<S: AlipaySdkPort, C: ClockPort>(
    State(state): State<AppState<S, C>>,
    Json(request): Json<ToggleRequest>,
) -> impl IntoResponse {
    Json(json!({ "debug": state.module.set_debug_mode(request.enabled) }))
}

pub async fn log_debug_info<S: AlipaySdkPort, C: ClockPort>(
    State(state): State<AppState<S, C>>,
    Json(request): Json<LogRequest>,
) -> impl IntoResponse {
    let logged = state
        .module
        .log_debug_info(&request.level, &request.message);
    Json(json!({ "logged": logged }))
}

pub async fn debug_info<S: AlipaySdkPort, C: ClockPort>(
    State(state): State<AppState<S, C>>,
) -> impl IntoResponse {
    Json(state.module.debug_info().await)
}

/// 宿主挂载
pub async fn attach<S: AlipaySdkPort, C: ClockPort>(
    State(state): State<AppState<S, C>>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .module
        .attach()
        .await
        .map(|_| Json(json!({ "attached": true })))
        .map_err(reject)
}

/// 宿主卸载
pub async fn detach<S: AlipaySdkPort, C: ClockPort>(
    State(state): State<AppState<S, C>>,
) -> impl IntoResponse {
    state.module.detach();
    Json(json!({ "attached": false }))
}

/// 宿主活动回调
pub async fn activity_result<S: AlipaySdkPort, C: ClockPort>(
    State(state): State<AppState<S, C>>,
    Json(request): Json<ActivityResultRequest>,
) -> impl IntoResponse {
    let outcome = state.module.on_activity_result(
        request.request_code,
        request.result_code,
        request.data,
    );
    Json(json!({ "handled": outcome.is_some(), "outcome": outcome }))
}

/// 健康检查
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
