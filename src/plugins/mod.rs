//! 测试插件模块
//!
//! 动态库加载、插件协议与多插件生命周期管理

pub mod core;
pub mod dynamic_loader;
pub mod lifecycle;

// 重新导出核心组件
pub use self::core::*;
pub use dynamic_loader::*;
pub use lifecycle::*;
