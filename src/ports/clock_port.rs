use chrono::{DateTime, Utc};

/// 时钟端口
pub trait ClockPort: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}
