use crate::application::in_flight::SharedInFlight;
use crate::domain::errors::DomainError;
use crate::domain::events::{OutcomeOrigin, PaymentOutcomeReported};
use crate::domain::value_objects::{MEMO_KEY, RESULT_KEY, RESULT_STATUS_KEY};
use crate::domain::{PaymentOutcome, ResultStatus, SdkPayload, SessionId};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const RESULT_STATUS_PATTERN: &str = "resultStatus={";
const EMPTY_NOTIFICATION_MEMO: &str = "Alipay returned no result data";

/// 从旧版SDK的 result 字符串中提取 `resultStatus={CODE}`
pub fn extract_result_status(raw: &str) -> Option<&str> {
    let start = raw.find(RESULT_STATUS_PATTERN)? + RESULT_STATUS_PATTERN.len();
    let len = raw[start..].find('}')?;
    (len > 0).then(|| &raw[start..start + len])
}

/// 规范化SDK直接返回的结果
pub fn normalize_direct_result(mut payload: SdkPayload) -> PaymentOutcome {
    let raw_payload = payload.remove(RESULT_KEY).unwrap_or_default();
    let memo = payload.remove(MEMO_KEY).unwrap_or_default();
    let status = match payload
        .remove(RESULT_STATUS_KEY)
        .filter(|code| !code.is_empty())
    {
        Some(code) => ResultStatus::from(code),
        None => extract_result_status(&raw_payload)
            .map(ResultStatus::from_code)
            .unwrap_or(ResultStatus::Unknown),
    };

    PaymentOutcome {
        status,
        raw_payload,
        memo,
        extra: payload,
    }
}

/// 规范化宿主活动回调携带的结果
pub fn normalize_channel_notification(payload: Option<SdkPayload>) -> PaymentOutcome {
    let Some(mut payload) = payload.filter(|p| !p.is_empty()) else {
        return PaymentOutcome::new(ResultStatus::NetworkError, "", EMPTY_NOTIFICATION_MEMO);
    };

    let status = payload
        .remove(RESULT_STATUS_KEY)
        .map(ResultStatus::from)
        .unwrap_or(ResultStatus::Unknown);

    PaymentOutcome {
        status,
        raw_payload: payload.remove(RESULT_KEY).unwrap_or_default(),
        memo: payload.remove(MEMO_KEY).unwrap_or_default(),
        extra: payload,
    }
}

/// SDK调用异常时合成的结果
pub fn outcome_from_error(context: &str, error: &DomainError) -> PaymentOutcome {
    PaymentOutcome::new(
        ResultStatus::INTERNAL_EXCEPTION,
        "",
        format!("{} raised an exception: {}", context, error),
    )
}

/// 结果对账器
///
/// 两条结果通道汇聚于此：在同一把锁内释放守卫、广播结果、兑现完成句柄。
#[derive(Clone)]
pub struct ResultReconciler {
    in_flight: SharedInFlight,
    events: broadcast::Sender<PaymentOutcomeReported>,
}

impl ResultReconciler {
    pub fn new(in_flight: SharedInFlight, events: broadcast::Sender<PaymentOutcomeReported>) -> Self {
        Self { in_flight, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PaymentOutcomeReported> {
        self.events.subscribe()
    }

    /// SDK调用直接返回结果
    pub fn on_direct_result(&self, session_id: SessionId, payload: SdkPayload) -> PaymentOutcome {
        let outcome = normalize_direct_result(payload);
        info!(
            "Direct result for session {}: resultStatus={}",
            session_id, outcome.status
        );
        self.settle(session_id, OutcomeOrigin::DirectResult, outcome.clone());
        outcome
    }

    /// SDK调用在产生结果前抛出异常
    pub fn on_operation_error(&self, session_id: SessionId, error: &DomainError) -> PaymentOutcome {
        warn!("Payment session {} failed: {}", session_id, error);
        let outcome = outcome_from_error("Payment process", error);
        self.settle(session_id, OutcomeOrigin::OperationError, outcome.clone());
        outcome
    }

    /// 宿主通过活动回调送达的结果，只广播，不兑现完成句柄
    ///
    /// 通知本身不带会话，只有当前会话仍在阈值内时才归属于它；
    /// 已超时的会话可能已被新会话取代，此时事件的 session_id 为空。
    pub fn on_channel_notification(
        &self,
        payload: Option<SdkPayload>,
        now: DateTime<Utc>,
    ) -> PaymentOutcome {
        let outcome = normalize_channel_notification(payload);

        let mut in_flight = self.in_flight.lock();
        let session_id = in_flight.guard().fresh_session(now).map(|s| s.id);
        in_flight.guard_mut().release();
        self.broadcast(session_id, OutcomeOrigin::ChannelNotification, outcome.clone());
        drop(in_flight);

        info!(
            "Channel notification handled: resultStatus={}",
            outcome.status
        );
        outcome
    }

    fn settle(&self, session_id: SessionId, origin: OutcomeOrigin, outcome: PaymentOutcome) {
        let mut in_flight = self.in_flight.lock();

        if !in_flight.guard_mut().release_session(session_id) {
            debug!(
                "Session {} is no longer current, guard left untouched",
                session_id
            );
        }

        self.broadcast(Some(session_id), origin, outcome.clone());

        match in_flight.take_handle(session_id) {
            Some(handle) => {
                if handle.send(outcome).is_err() {
                    debug!("Caller of session {} is gone", session_id);
                }
            }
            None => debug!("Session {} has no pending completion handle", session_id),
        }
    }

    fn broadcast(&self, session_id: Option<SessionId>, origin: OutcomeOrigin, outcome: PaymentOutcome) {
        let event = PaymentOutcomeReported::new(session_id, origin, outcome, Utc::now());
        match self.events.send(event) {
            Ok(receivers) => debug!("Outcome broadcast to {} subscribers", receivers),
            Err(_) => debug!("No outcome subscribers"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::in_flight::InFlight;
    use crate::domain::{Admission, PaymentGuard};
    use tokio::sync::oneshot;

    fn payload(entries: &[(&str, &str)]) -> SdkPayload {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn reconciler() -> (ResultReconciler, SharedInFlight) {
        let in_flight = InFlight::shared(PaymentGuard::default());
        let (events, _) = broadcast::channel(16);
        (ResultReconciler::new(in_flight.clone(), events), in_flight)
    }

    fn admit(in_flight: &SharedInFlight) -> (SessionId, oneshot::Receiver<PaymentOutcome>) {
        let mut state = in_flight.lock();
        let Admission::Admitted(id) = state.guard_mut().try_admit(Utc::now()) else {
            panic!("admission rejected");
        };
        let (tx, rx) = oneshot::channel();
        state.register(id, tx);
        (id, rx)
    }

    #[test]
    fn test_extract_result_status() {
        assert_eq!(
            extract_result_status("resultStatus={9000};memo={};result={}"),
            Some("9000")
        );
        assert_eq!(extract_result_status("resultStatus={}"), None);
        assert_eq!(extract_result_status("resultStatus={6001"), None);
        assert_eq!(extract_result_status("no status here"), None);
    }

    #[test]
    fn test_direct_result_recovers_status_from_raw() {
        let outcome = normalize_direct_result(payload(&[(
            "result",
            "resultStatus={8000};memo={processing}",
        )]));
        assert_eq!(outcome.status, ResultStatus::Processing);
        assert_eq!(outcome.raw_payload, "resultStatus={8000};memo={processing}");
    }

    #[test]
    fn test_direct_result_falls_back_to_unknown() {
        let outcome = normalize_direct_result(payload(&[("result", "garbage")]));
        assert_eq!(outcome.status, ResultStatus::Unknown);

        let outcome = normalize_direct_result(SdkPayload::new());
        assert_eq!(outcome.status, ResultStatus::Unknown);
        assert_eq!(outcome.memo, "");
    }

    #[test]
    fn test_direct_result_keeps_extra_fields() {
        let outcome = normalize_direct_result(payload(&[
            ("resultStatus", "9000"),
            ("result", "{\"alipay_trade_app_pay_response\":{}}"),
            ("extendInfo", "abc"),
        ]));
        assert_eq!(outcome.status, ResultStatus::Success);
        assert_eq!(outcome.extra.get("extendInfo").map(String::as_str), Some("abc"));
        assert!(!outcome.extra.contains_key("resultStatus"));
    }

    #[test]
    fn test_channel_notification_defaults() {
        let outcome = normalize_channel_notification(None);
        assert_eq!(outcome.status, ResultStatus::NetworkError);
        assert!(!outcome.memo.is_empty());

        let outcome = normalize_channel_notification(Some(SdkPayload::new()));
        assert_eq!(outcome.status, ResultStatus::NetworkError);

        let outcome = normalize_channel_notification(Some(payload(&[("memo", "m")])));
        assert_eq!(outcome.status, ResultStatus::Unknown);
        assert_eq!(outcome.raw_payload, "");
        assert_eq!(outcome.memo, "m");
    }

    #[test]
    fn test_direct_result_settles_session() {
        let (reconciler, in_flight) = reconciler();
        let mut events = reconciler.subscribe();
        let (id, mut rx) = admit(&in_flight);

        reconciler.on_direct_result(id, payload(&[("resultStatus", "9000")]));

        assert!(!in_flight.lock().guard().is_in_progress());
        assert_eq!(rx.try_recv().unwrap().status, ResultStatus::Success);
        let event = events.try_recv().unwrap();
        assert_eq!(event.session_id, Some(id));
        assert_eq!(event.origin, OutcomeOrigin::DirectResult);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_operation_error_outcome() {
        let (reconciler, in_flight) = reconciler();
        let (id, mut rx) = admit(&in_flight);

        reconciler.on_operation_error(id, &DomainError::SdkError("timeout".to_string()));

        let outcome = rx.try_recv().unwrap();
        assert_eq!(outcome.status.code(), "4000");
        assert!(outcome.memo.contains("timeout"));
        assert!(!in_flight.lock().guard().is_in_progress());
    }

    #[test]
    fn test_channel_notification_releases_without_fulfilling_handle() {
        let (reconciler, in_flight) = reconciler();
        let mut events = reconciler.subscribe();
        let (id, mut rx) = admit(&in_flight);

        reconciler.on_channel_notification(Some(payload(&[("resultStatus", "6001")])), Utc::now());

        assert!(!in_flight.lock().guard().is_in_progress());
        assert!(rx.try_recv().is_err());
        assert_eq!(in_flight.lock().pending_count(), 1);
        let event = events.try_recv().unwrap();
        assert_eq!(event.session_id, Some(id));
        assert_eq!(event.outcome.status, ResultStatus::UserCanceled);
    }

    #[test]
    fn test_late_result_for_idle_guard_still_broadcasts() {
        let (reconciler, in_flight) = reconciler();
        let mut events = reconciler.subscribe();
        let (id, mut rx) = admit(&in_flight);
        in_flight.lock().guard_mut().release();

        reconciler.on_direct_result(id, payload(&[("resultStatus", "9000")]));
        reconciler.on_direct_result(id, payload(&[("resultStatus", "9000")]));

        assert!(rx.try_recv().is_ok());
        assert!(events.try_recv().is_ok());
        assert!(events.try_recv().is_ok());
        assert!(!in_flight.lock().guard().is_in_progress());
    }

    #[test]
    fn test_notification_for_stale_session_is_unattributed() {
        let (reconciler, in_flight) = reconciler();
        let mut events = reconciler.subscribe();
        let (_id, _rx) = admit(&in_flight);

        let later = Utc::now() + chrono::TimeDelta::milliseconds(5000);
        reconciler.on_channel_notification(Some(payload(&[("resultStatus", "9000")])), later);

        let event = events.try_recv().unwrap();
        assert_eq!(event.session_id, None);
        assert!(!in_flight.lock().guard().is_in_progress());
    }
}
