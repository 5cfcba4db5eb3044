pub mod alipay_module;
pub mod dto;
pub mod in_flight;
pub mod result_reconciler;

pub use alipay_module::{AlipayModule, ModuleConfig, PendingPayment};
pub use dto::*;
pub use result_reconciler::ResultReconciler;
