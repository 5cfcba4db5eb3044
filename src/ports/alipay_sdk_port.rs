use crate::domain::errors::DomainResult;
use crate::domain::value_objects::{Environment, SdkPayload};
use async_trait::async_trait;

/// 支付宝SDK端口接口
///
/// 调用可能阻塞在与支付宝客户端的进程间通信上，只能在工作任务中调用。
/// 模块按 `ModuleConfig::sdk_call_timeout` 限制 `pay`/`auth` 的等待时间，
/// 超时的调用会被中止，实现方不需要自己保证返回。
#[async_trait]
pub trait AlipaySdkPort: Send + Sync + 'static {
    /// 发起支付，返回SDK的扁平结果
    async fn pay(&self, order_info: &str) -> DomainResult<SdkPayload>;

    /// 发起授权
    async fn auth(&self, auth_info: &str) -> DomainResult<SdkPayload>;

    /// SDK版本号，未安装支付宝时为 None
    async fn version(&self) -> DomainResult<Option<String>>;

    /// 切换沙箱/正式环境
    async fn set_environment(&self, environment: Environment) -> DomainResult<()>;
}
