//! rsunit 核心数据类型模块
//!
//! 测试结果记录、诊断消息与源码位置等在各组件之间传递的值类型

pub mod message;
pub mod failure;

// 重新导出所有公共类型
pub use message::*;
pub use failure::*;

/// 测试标识符（用例或套件名称）
pub type TestId = String;
