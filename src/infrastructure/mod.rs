pub mod adapters;
pub mod config;

pub use adapters::{HttpSdkAdapter, SystemClock};
pub use config::AlipayConfig;
