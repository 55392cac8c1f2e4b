//! rsunit - 单元测试框架
//!
//! 提供测试组合、执行、结果汇总以及通过动态库插件扩展测试集的能力
//!
//! # 架构分层
//!
//! - **核心执行层**: 测试树、故障分类、运行协调器、测试工厂注册表
//! - **插件层**: 动态库加载、插件协议与生命周期管理
//! - **服务层**: 结果收集、进度显示与报告输出
//! - **宿主层**: 配置、运行器与 `rsunit_runner` 命令行程序
//!
//! # 特性
//!
//! - **类型化故障**: 断言失败与一般错误在类型上区分，无需解析消息
//! - **观察者协议**: 监听器按挂载顺序接收生命周期事件
//! - **协作式停止**: 任意线程或监听器回调中都可以请求停止
//! - **插件扩展**: 外部动态库可以在运行前注册测试和监听器

pub mod types;
pub mod error;
pub mod core;
pub mod plugins;
pub mod services;
pub mod config;
pub mod runner;

// 重新导出核心类型
pub use types::*;
pub use error::*;
pub use self::core::*;
pub use plugins::*;
pub use services::*;
pub use runner::TestRunner;

/// 框架信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const FRAMEWORK_NAME: &str = "rsunit";

/// 初始化日志系统
///
/// `level` 为 tracing 过滤表达式（如 `"info"`、`"rsunit=debug"`）。
/// 重复调用时保留已安装的订阅器。
pub fn initialize_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .map_err(|e| RsUnitError::config(&format!("Invalid log filter '{}': {}", level, e)))?;

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Initializing {} v{}", FRAMEWORK_NAME, VERSION);
    }
    Ok(())
}
