pub mod alipay_config;

pub use alipay_config::AlipayConfig;
