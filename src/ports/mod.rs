pub mod alipay_sdk_port;
pub mod clock_port;

pub use alipay_sdk_port::AlipaySdkPort;
pub use clock_port::ClockPort;
