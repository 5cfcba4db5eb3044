use super::handlers::*;
use crate::ports::{AlipaySdkPort, ClockPort};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub fn create_router<S: AlipaySdkPort, C: ClockPort>(state: AppState<S, C>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/alipay/pay", post(pay::<S, C>))
        .route("/api/alipay/pay/formatted", post(pay_formatted::<S, C>))
        .route("/api/alipay/auth", post(auth::<S, C>))
        .route("/api/alipay/reset", post(reset_payment_state::<S, C>))
        .route(
            "/api/alipay/sandbox",
            get(is_sandbox_enabled::<S, C>).post(set_sandbox_mode::<S, C>),
        )
        .route("/api/alipay/installed", get(is_alipay_installed::<S, C>))
        .route("/api/alipay/version", get(alipay_version::<S, C>))
        .route("/api/alipay/constants", get(constants::<S, C>))
        .route("/api/alipay/debug", post(set_debug_mode::<S, C>))
        .route("/api/alipay/log", post(log_debug_info::<S, C>))
        .route("/api/alipay/debug-info", get(debug_info::<S, C>))
        .route("/api/alipay/host/attach", post(attach::<S, C>))
        .route("/api/alipay/host/detach", post(detach::<S, C>))
        .route(
            "/api/alipay/host/activity-result",
            post(activity_result::<S, C>),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
