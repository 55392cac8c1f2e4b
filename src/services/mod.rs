//! 框架服务层模块
//!
//! 挂在运行协调器上的监听器服务：结果收集、进度显示与报告输出

pub mod outputter;
pub mod progress;
pub mod result_collector;

// 重新导出核心服务
pub use outputter::*;
pub use progress::*;
pub use result_collector::*;
