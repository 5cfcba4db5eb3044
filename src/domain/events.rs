use crate::domain::entities::SessionId;
use crate::domain::value_objects::PaymentOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 领域事件trait
pub trait DomainEvent {
    fn event_type(&self) -> &'static str;
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// 结果来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeOrigin {
    /// SDK调用直接返回
    DirectResult,
    /// 宿主的活动回调通知
    ChannelNotification,
    /// SDK调用异常
    OperationError,
}

/// 支付结果广播事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOutcomeReported {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    /// 对应的会话，宿主通知无法确定会话时为空
    pub session_id: Option<SessionId>,
    pub origin: OutcomeOrigin,
    pub outcome: PaymentOutcome,
}

impl DomainEvent for PaymentOutcomeReported {
    fn event_type(&self) -> &'static str {
        "AlipayPaymentResult"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl PaymentOutcomeReported {
    pub fn new(
        session_id: Option<SessionId>,
        origin: OutcomeOrigin,
        outcome: PaymentOutcome,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at,
            session_id,
            origin,
            outcome,
        }
    }
}
