use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};
use uuid::Uuid;

/// 默认超时阈值（毫秒），超过后认为上一次支付的回调已丢失
pub const STALE_THRESHOLD_MS: i64 = 3000;

/// 支付会话ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 支付会话：从准入到结果对账
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentSession {
    /// 会话ID
    pub id: SessionId,

    /// 准入时间
    pub started_at: DateTime<Utc>,
}

/// 准入结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// 已准入
    Admitted(SessionId),
    /// 被拒绝
    Rejected {
        reason: &'static str,
        retry_after_ms: i64,
    },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted(_))
    }
}

/// 支付防重守卫
///
/// 同一时刻最多只有一个进行中的会话。回调丢失时，超过阈值的会话会在
/// 下一次准入时被视为已放弃。
#[derive(Debug, Clone)]
pub struct PaymentGuard {
    stale_threshold: TimeDelta,
    session: Option<PaymentSession>,
}

impl PaymentGuard {
    pub fn new(stale_threshold_ms: i64) -> Self {
        Self {
            stale_threshold: TimeDelta::milliseconds(stale_threshold_ms),
            session: None,
        }
    }

    /// 尝试准入新的支付请求
    pub fn try_admit(&mut self, now: DateTime<Utc>) -> Admission {
        if let Some(current) = self.session {
            let elapsed = now - current.started_at;
            if elapsed < self.stale_threshold {
                debug!(
                    "Admission rejected: session {} started {}ms ago",
                    current.id,
                    elapsed.num_milliseconds()
                );
                return Admission::Rejected {
                    reason: "payment already in progress",
                    retry_after_ms: (self.stale_threshold - elapsed).num_milliseconds(),
                };
            }

            warn!(
                "Session {} presumed abandoned after {}ms, admitting a new one",
                current.id,
                elapsed.num_milliseconds()
            );
        }

        let session = PaymentSession {
            id: SessionId::new(),
            started_at: now,
        };
        self.session = Some(session);
        Admission::Admitted(session.id)
    }

    /// 无条件回到空闲状态，可重复调用
    pub fn release(&mut self) {
        if let Some(session) = self.session.take() {
            debug!("Payment session {} released", session.id);
        }
    }

    /// 仅当指定会话仍是当前会话时释放
    pub fn release_session(&mut self, id: SessionId) -> bool {
        match self.session {
            Some(current) if current.id == id => {
                self.release();
                true
            }
            _ => false,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.session.is_some()
    }

    /// 最近一次准入时间，空闲时为 None
    pub fn last_attempt_time(&self) -> Option<DateTime<Utc>> {
        self.session.map(|s| s.started_at)
    }

    pub fn current_session(&self) -> Option<PaymentSession> {
        self.session
    }

    /// 仍在超时阈值内的当前会话；已被视为放弃的会话返回 None
    pub fn fresh_session(&self, now: DateTime<Utc>) -> Option<PaymentSession> {
        self.session
            .filter(|session| now - session.started_at < self.stale_threshold)
    }

    pub fn stale_threshold_ms(&self) -> i64 {
        self.stale_threshold.num_milliseconds()
    }
}

impl Default for PaymentGuard {
    fn default() -> Self {
        Self::new(STALE_THRESHOLD_MS)
    }
}
