//! 核心执行层模块
//!
//! 提供测试树、故障分类、运行协调器、监听器协议以及测试工厂注册表

pub mod coordinator;
pub mod fault;
pub mod helpers;
pub mod listener;
pub mod registry;
pub mod test;

// 重新导出核心组件
pub use coordinator::{RunCoordinator, RunPhase, RunState, Stage};
pub use fault::{Asserter, AssertionFailure, CheckResult, ErrorFault, Fault};
pub use helpers::{AutoRegisterSuite, FixtureSuite, TestCaller, TestMethod, TestSuiteBuilder, TestSuiteFactory};
pub use listener::TestListener;
pub use registry::{TestFactory, TestFactoryRegistry, DEFAULT_REGISTRY_NAME};
pub use test::{Fixture, Test, TestCase, TestDecorator, TestSuite};
