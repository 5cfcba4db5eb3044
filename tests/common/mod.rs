#![allow(dead_code)]

use alipay_payment_rs::application::{AlipayModule, ModuleConfig};
use alipay_payment_rs::domain::{DomainError, DomainResult, Environment, SdkPayload};
use alipay_payment_rs::ports::{AlipaySdkPort, ClockPort};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use tokio::sync::{Mutex, mpsc};

pub const EPOCH_MS: i64 = 1_700_000_000_000;

/// 可手动推进的时钟
#[derive(Debug)]
pub struct ManualClock {
    offset_ms: AtomicI64,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            offset_ms: AtomicI64::new(0),
        })
    }

    pub fn set(&self, offset_ms: i64) {
        self.offset_ms.store(offset_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: i64) {
        self.offset_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl ClockPort for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(EPOCH_MS + self.offset_ms.load(Ordering::SeqCst)).unwrap()
    }
}

/// 按脚本应答的SDK替身：pay/auth 会一直等待测试推送的应答
pub struct ScriptedSdk {
    pay_replies: Mutex<mpsc::UnboundedReceiver<DomainResult<SdkPayload>>>,
    auth_replies: Mutex<mpsc::UnboundedReceiver<DomainResult<SdkPayload>>>,
    pub pay_calls: AtomicUsize,
    pub auth_calls: AtomicUsize,
    pub fail_environment: AtomicBool,
    pub panic_on_pay: AtomicBool,
    pub environments: parking_lot::Mutex<Vec<Environment>>,
    pub version: parking_lot::Mutex<Option<String>>,
}

/// 测试侧的应答发送端
#[derive(Clone)]
pub struct SdkScript {
    pay: mpsc::UnboundedSender<DomainResult<SdkPayload>>,
    auth: mpsc::UnboundedSender<DomainResult<SdkPayload>>,
}

impl SdkScript {
    pub fn reply_pay(&self, reply: DomainResult<SdkPayload>) {
        self.pay.send(reply).unwrap();
    }

    pub fn reply_auth(&self, reply: DomainResult<SdkPayload>) {
        self.auth.send(reply).unwrap();
    }
}

impl ScriptedSdk {
    pub fn new() -> (Arc<Self>, SdkScript) {
        let (pay_tx, pay_rx) = mpsc::unbounded_channel();
        let (auth_tx, auth_rx) = mpsc::unbounded_channel();
        let sdk = Arc::new(Self {
            pay_replies: Mutex::new(pay_rx),
            auth_replies: Mutex::new(auth_rx),
            pay_calls: AtomicUsize::new(0),
            auth_calls: AtomicUsize::new(0),
            fail_environment: AtomicBool::new(false),
            panic_on_pay: AtomicBool::new(false),
            environments: parking_lot::Mutex::new(Vec::new()),
            version: parking_lot::Mutex::new(Some("15.8.17".to_string())),
        });
        (
            sdk,
            SdkScript {
                pay: pay_tx,
                auth: auth_tx,
            },
        )
    }
}

#[async_trait]
impl AlipaySdkPort for ScriptedSdk {
    async fn pay(&self, _order_info: &str) -> DomainResult<SdkPayload> {
        self.pay_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_pay.load(Ordering::SeqCst) {
            panic!("SDK crashed");
        }
        self.pay_replies
            .lock()
            .await
            .recv()
            .await
            .unwrap_or_else(|| Err(DomainError::SdkError("script closed".to_string())))
    }

    async fn auth(&self, _auth_info: &str) -> DomainResult<SdkPayload> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        self.auth_replies
            .lock()
            .await
            .recv()
            .await
            .unwrap_or_else(|| Err(DomainError::SdkError("script closed".to_string())))
    }

    async fn version(&self) -> DomainResult<Option<String>> {
        Ok(self.version.lock().clone())
    }

    async fn set_environment(&self, environment: Environment) -> DomainResult<()> {
        if self.fail_environment.load(Ordering::SeqCst) {
            return Err(DomainError::SdkError("EnvUtils unavailable".to_string()));
        }
        self.environments.lock().push(environment);
        Ok(())
    }
}

pub type TestModule = AlipayModule<ScriptedSdk, ManualClock>;

pub struct Harness {
    pub module: Arc<TestModule>,
    pub sdk: Arc<ScriptedSdk>,
    pub script: SdkScript,
    pub clock: Arc<ManualClock>,
}

/// 创建已挂载的模块
pub async fn harness(config: ModuleConfig) -> Harness {
    let (sdk, script) = ScriptedSdk::new();
    let clock = ManualClock::new();
    let module = Arc::new(AlipayModule::new(sdk.clone(), clock.clone(), config));
    module.attach().await.unwrap();
    Harness {
        module,
        sdk,
        script,
        clock,
    }
}

/// 等待SDK被调用指定次数
pub async fn wait_for_calls(counter: &AtomicUsize, expected: usize) {
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while counter.load(Ordering::SeqCst) < expected {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("SDK was not called in time");
}

pub fn payload(entries: &[(&str, &str)]) -> SdkPayload {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
