pub mod http_sdk_adapter;
pub mod system_clock;

pub use http_sdk_adapter::HttpSdkAdapter;
pub use system_clock::SystemClock;
