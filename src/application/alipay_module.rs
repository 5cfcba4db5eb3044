use crate::application::dto::DebugInfo;
use crate::application::in_flight::{InFlight, SharedInFlight};
use crate::application::result_reconciler::{
    ResultReconciler, normalize_direct_result, outcome_from_error,
};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::{
    ALIPAY_SDK_REQUEST_CODE, Admission, Environment, PaymentGuard, PaymentOutcome,
    PaymentOutcomeReported, ResultStatus, STALE_THRESHOLD_MS, SdkPayload, SessionId,
};
use crate::ports::{AlipaySdkPort, ClockPort};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, error, info, warn};

/// 模块配置
#[derive(Debug, Clone)]
pub struct ModuleConfig {
    /// 挂载时应用的默认环境，None 表示不主动设置
    pub default_environment: Option<Environment>,

    /// 授权是否与支付共用防重守卫
    pub guard_authorization: bool,

    /// 超时阈值（毫秒）
    pub stale_threshold_ms: i64,

    /// 结果广播通道容量
    pub event_capacity: usize,

    /// 单次SDK调用的最长等待时间，超时按调用异常处理
    pub sdk_call_timeout: Duration,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            default_environment: None,
            guard_authorization: false,
            stale_threshold_ms: STALE_THRESHOLD_MS,
            event_capacity: 64,
            sdk_call_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Default)]
struct ModuleSettings {
    attached: bool,
    environment: Option<Environment>,
    debug_mode: bool,
}

/// 已准入、等待结果的支付
#[derive(Debug)]
pub struct PendingPayment {
    session_id: SessionId,
    receiver: oneshot::Receiver<PaymentOutcome>,
}

impl PendingPayment {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// 等待结果；无论支付成功与否都以结果形式返回
    pub async fn outcome(self) -> DomainResult<PaymentOutcome> {
        self.receiver.await.map_err(|_| {
            DomainError::InternalError(format!(
                "completion handle of session {} dropped",
                self.session_id
            ))
        })
    }
}

/// 支付宝桥接模块
pub struct AlipayModule<S: AlipaySdkPort, C: ClockPort> {
    sdk: Arc<S>,
    clock: Arc<C>,
    config: ModuleConfig,
    in_flight: SharedInFlight,
    reconciler: ResultReconciler,
    settings: Mutex<ModuleSettings>,
}

impl<S: AlipaySdkPort, C: ClockPort> AlipayModule<S, C> {
    pub fn new(sdk: Arc<S>, clock: Arc<C>, config: ModuleConfig) -> Self {
        let in_flight = InFlight::shared(PaymentGuard::new(config.stale_threshold_ms));
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let reconciler = ResultReconciler::new(in_flight.clone(), events);

        Self {
            sdk,
            clock,
            config,
            in_flight,
            reconciler,
            settings: Mutex::new(ModuleSettings::default()),
        }
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    /// 挂载到宿主：注册活动回调，应用默认环境
    pub async fn attach(&self) -> DomainResult<()> {
        let default_environment = {
            let mut settings = self.settings.lock();
            settings.attached = true;
            if settings.environment.is_none() {
                self.config.default_environment
            } else {
                None
            }
        };
        info!("AlipayModule attached to host");

        if let Some(environment) = default_environment {
            self.apply_environment(environment).await?;
        }
        Ok(())
    }

    /// 从宿主卸载：注销活动回调
    pub fn detach(&self) {
        self.settings.lock().attached = false;
        info!("AlipayModule detached from host");
    }

    pub fn is_attached(&self) -> bool {
        self.settings.lock().attached
    }

    /// 发起支付宝支付并等待结果
    pub async fn pay(&self, order_info: &str) -> DomainResult<PaymentOutcome> {
        self.start_payment(order_info)?.outcome().await
    }

    /// 校验前置条件、准入并在工作任务中调用SDK
    pub fn start_payment(&self, order_info: &str) -> DomainResult<PendingPayment> {
        debug!("Payment requested, order length: {}", order_info.len());

        if !self.is_attached() {
            return Err(DomainError::HostUnavailable);
        }
        if order_info.is_empty() {
            return Err(DomainError::EmptyOrder);
        }

        let now = self.clock.now();
        let (handle, receiver) = oneshot::channel();
        let session_id = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.guard_mut().try_admit(now) {
                Admission::Admitted(id) => {
                    in_flight.register(id, handle);
                    id
                }
                Admission::Rejected {
                    reason,
                    retry_after_ms,
                } => {
                    info!("Payment request rejected: {}", reason);
                    return Err(DomainError::PaymentInProgress { retry_after_ms });
                }
            }
        };

        info!("Payment session {} admitted", session_id);

        let sdk = Arc::clone(&self.sdk);
        let reconciler = self.reconciler.clone();
        let order_info = order_info.to_string();
        let limit = self.config.sdk_call_timeout;
        tokio::spawn(async move {
            debug!("Invoking Alipay SDK for session {}", session_id);
            match run_isolated(async move { sdk.pay(&order_info).await }, limit).await {
                Ok(payload) => reconciler.on_direct_result(session_id, payload),
                Err(e) => reconciler.on_operation_error(session_id, &e),
            };
        });

        Ok(PendingPayment {
            session_id,
            receiver,
        })
    }

    /// 发起支付宝授权
    pub async fn auth(&self, auth_info: &str) -> DomainResult<PaymentOutcome> {
        if auth_info.is_empty() {
            return Err(DomainError::EmptyAuth);
        }
        if !self.is_attached() {
            return Err(DomainError::HostUnavailable);
        }

        let session_id = if self.config.guard_authorization {
            let now = self.clock.now();
            let admission = self.in_flight.lock().guard_mut().try_admit(now);
            match admission {
                Admission::Admitted(id) => Some(id),
                Admission::Rejected {
                    reason,
                    retry_after_ms,
                } => {
                    info!("Authorization request rejected: {}", reason);
                    return Err(DomainError::AuthorizationInProgress { retry_after_ms });
                }
            }
        } else {
            None
        };

        let sdk = Arc::clone(&self.sdk);
        let in_flight = self.in_flight.clone();
        let auth_info = auth_info.to_string();
        let limit = self.config.sdk_call_timeout;
        let worker = tokio::spawn(async move {
            let outcome = match run_isolated(async move { sdk.auth(&auth_info).await }, limit).await {
                Ok(payload) => normalize_direct_result(payload),
                Err(e) => {
                    warn!("Authorization failed: {}", e);
                    outcome_from_error("Authorization", &e)
                }
            };
            if let Some(id) = session_id {
                in_flight.lock().guard_mut().release_session(id);
            }
            outcome
        });

        let outcome = worker
            .await
            .map_err(|e| DomainError::InternalError(format!("authorization worker failed: {}", e)))?;
        info!("Authorization finished: resultStatus={}", outcome.status);
        Ok(outcome)
    }

    /// 宿主活动回调入口
    pub fn on_activity_result(
        &self,
        request_code: i32,
        result_code: i32,
        payload: Option<SdkPayload>,
    ) -> Option<PaymentOutcome> {
        debug!(
            "Activity result: requestCode={}, resultCode={}",
            request_code, result_code
        );

        if !self.is_attached() {
            warn!("Activity result received while detached, ignored");
            return None;
        }
        if request_code != ALIPAY_SDK_REQUEST_CODE {
            return None;
        }

        Some(
            self.reconciler
                .on_channel_notification(payload, self.clock.now()),
        )
    }

    /// 订阅支付结果广播
    pub fn subscribe(&self) -> broadcast::Receiver<PaymentOutcomeReported> {
        self.reconciler.subscribe()
    }

    /// 手动重置支付状态
    pub fn reset_payment_state(&self) -> bool {
        self.in_flight.lock().guard_mut().release();
        info!("Payment state reset manually");
        true
    }

    pub fn is_payment_in_progress(&self) -> bool {
        self.in_flight.lock().guard().is_in_progress()
    }

    pub fn last_payment_time(&self) -> Option<DateTime<Utc>> {
        self.in_flight.lock().guard().last_attempt_time()
    }

    /// 设置沙箱模式
    pub async fn set_sandbox_mode(&self, enabled: bool) -> DomainResult<bool> {
        self.apply_environment(Environment::from_sandbox_flag(enabled))
            .await?;
        Ok(enabled)
    }

    pub fn is_sandbox_enabled(&self) -> bool {
        self.settings
            .lock()
            .environment
            .is_some_and(|env| env.is_sandbox())
    }

    pub fn environment(&self) -> Option<Environment> {
        self.settings.lock().environment
    }

    async fn apply_environment(&self, environment: Environment) -> DomainResult<()> {
        self.sdk
            .set_environment(environment)
            .await
            .map_err(|e| {
                error!("Failed to set environment {}: {}", environment, e);
                DomainError::EnvironmentSetting(e.to_string())
            })?;

        self.settings.lock().environment = Some(environment);
        info!("Environment set to {}", environment);
        Ok(())
    }

    /// 检查支付宝是否已安装
    pub async fn is_alipay_installed(&self) -> bool {
        if !self.is_attached() {
            return false;
        }
        match self.sdk.version().await {
            Ok(version) => version.is_some(),
            Err(e) => {
                debug!("Version lookup failed: {}", e);
                false
            }
        }
    }

    /// 获取支付宝SDK版本号
    pub async fn alipay_version(&self) -> DomainResult<Option<String>> {
        if !self.is_attached() {
            return Err(DomainError::HostUnavailable);
        }
        self.sdk
            .version()
            .await
            .map_err(|e| DomainError::VersionLookup(e.to_string()))
    }

    pub fn set_debug_mode(&self, enabled: bool) -> bool {
        self.settings.lock().debug_mode = enabled;
        info!(
            "Debug mode {}",
            if enabled { "enabled" } else { "disabled" }
        );
        enabled
    }

    /// 记录宿主传来的调试日志，仅在调试模式下生效
    pub fn log_debug_info(&self, level: &str, message: &str) -> bool {
        if !self.settings.lock().debug_mode {
            return false;
        }

        match level.to_ascii_lowercase().as_str() {
            "info" => info!(target: "alipay_host", "{}", message),
            "warn" => warn!(target: "alipay_host", "{}", message),
            "error" => error!(target: "alipay_host", "{}", message),
            _ => debug!(target: "alipay_host", "{}", message),
        }
        true
    }

    /// 汇总调试信息
    pub async fn debug_info(&self) -> DebugInfo {
        let (attached, sandbox_mode, debug_mode) = {
            let settings = self.settings.lock();
            (
                settings.attached,
                settings.environment.is_some_and(|env| env.is_sandbox()),
                settings.debug_mode,
            )
        };
        let (payment_in_progress, last_payment_time, pending_completions) = {
            let in_flight = self.in_flight.lock();
            (
                in_flight.guard().is_in_progress(),
                in_flight
                    .guard()
                    .last_attempt_time()
                    .map(|t| t.timestamp_millis())
                    .unwrap_or(0),
                in_flight.pending_count(),
            )
        };

        let mut info = DebugInfo {
            attached,
            sandbox_mode,
            debug_mode,
            payment_in_progress,
            last_payment_time,
            pending_completions,
            alipay_installed: None,
            alipay_version: None,
            alipay_error: None,
        };

        if attached {
            match self.sdk.version().await {
                Ok(version) => {
                    info.alipay_installed = Some(version.as_deref().is_some_and(|v| !v.is_empty()));
                    info.alipay_version = version;
                }
                Err(e) => info.alipay_error = Some(e.to_string()),
            }
        }
        info
    }

    /// 导出的状态码常量
    pub fn constants(&self) -> BTreeMap<&'static str, &'static str> {
        ResultStatus::exported_constants()
    }
}

/// 在独立任务中执行SDK调用：任务异常终止或超时都转为错误
async fn run_isolated<F>(call: F, limit: Duration) -> DomainResult<SdkPayload>
where
    F: Future<Output = DomainResult<SdkPayload>> + Send + 'static,
{
    let mut task = tokio::spawn(call);
    match tokio::time::timeout(limit, &mut task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(DomainError::InternalError(format!("SDK worker aborted: {}", e))),
        Err(_) => {
            task.abort();
            Err(DomainError::SdkError(format!(
                "SDK call timed out after {}ms",
                limit.as_millis()
            )))
        }
    }
}
