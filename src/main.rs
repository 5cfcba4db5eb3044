use alipay_payment_rs::api::{self, AppState};
use alipay_payment_rs::application::AlipayModule;
use alipay_payment_rs::domain::DomainEvent;
use alipay_payment_rs::infrastructure::{AlipayConfig, HttpSdkAdapter, SystemClock};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // 加载环境变量
    dotenvy::dotenv().ok();

    info!("Starting Alipay bridge...");

    let config = AlipayConfig::from_env()?;
    info!(
        "Alipay configuration loaded: sdk host {}, default environment {}, guard authorization {}",
        config.sdk_base_url,
        config
            .default_environment
            .map(|env| env.to_string())
            .unwrap_or_else(|| "unset".to_string()),
        config.guard_authorization
    );

    // 创建SDK适配器
    let sdk = Arc::new(HttpSdkAdapter::new(config.clone())?);

    // 创建桥接模块
    let module = Arc::new(AlipayModule::new(
        sdk,
        Arc::new(SystemClock),
        config.module_config(),
    ));
    module.attach().await?;

    // 记录所有广播的支付结果
    let mut outcomes = module.subscribe();
    tokio::spawn(async move {
        loop {
            match outcomes.recv().await {
                Ok(event) => info!(
                    "{} ({:?}): resultStatus={}, session={:?}",
                    event.event_type(),
                    event.origin,
                    event.outcome.status,
                    event.session_id
                ),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Outcome subscriber lagged, {} events skipped", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let app = api::create_router(AppState {
        module: module.clone(),
    });

    let addr = config.listen_addr();
    info!("Bridge listening on {}", addr);
    info!("Available endpoints:");
    info!("  POST /api/alipay/pay - Start payment");
    info!("  POST /api/alipay/auth - Start authorization");
    info!("  POST /api/alipay/host/activity-result - Host activity result");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    module.detach();
    info!("Alipay bridge stopped");

    Ok(())
}
