//! 支付宝支付桥接模块：防重复提交守卫与双通道结果对账。

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;
