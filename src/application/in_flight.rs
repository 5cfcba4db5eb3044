use crate::domain::{PaymentGuard, PaymentOutcome, SessionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;

/// 调用方的完成句柄，只能兑现一次
pub type CompletionHandle = oneshot::Sender<PaymentOutcome>;

/// 进行中的支付状态：守卫 + 待兑现的完成句柄
///
/// 只在 [`SharedInFlight`] 的锁内修改。
#[derive(Debug)]
pub struct InFlight {
    guard: PaymentGuard,
    pending: HashMap<SessionId, CompletionHandle>,
}

pub type SharedInFlight = Arc<Mutex<InFlight>>;

impl InFlight {
    pub fn new(guard: PaymentGuard) -> Self {
        Self {
            guard,
            pending: HashMap::new(),
        }
    }

    pub fn shared(guard: PaymentGuard) -> SharedInFlight {
        Arc::new(Mutex::new(Self::new(guard)))
    }

    pub fn guard(&self) -> &PaymentGuard {
        &self.guard
    }

    pub fn guard_mut(&mut self) -> &mut PaymentGuard {
        &mut self.guard
    }

    /// 登记新会话的句柄，顺带清理调用方已放弃等待的句柄
    pub fn register(&mut self, session_id: SessionId, handle: CompletionHandle) {
        self.pending.retain(|_, pending| !pending.is_closed());
        self.pending.insert(session_id, handle);
    }

    /// 取出句柄；已兑现过的会话返回 None
    pub fn take_handle(&mut self, session_id: SessionId) -> Option<CompletionHandle> {
        self.pending.remove(&session_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
