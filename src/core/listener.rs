//! 测试监听器
//!
//! 协调器在运行的各个生命周期节点上通知监听器。所有方法默认为空实现。

use super::coordinator::RunCoordinator;
use super::test::Test;
use crate::types::TestFailure;

/// 测试监听器
///
/// 监听器以 `Arc<dyn TestListener>` 挂到协调器上，协调器不拥有它们。
/// 回调内部不要再进入同一个结果收集器的加锁操作。
pub trait TestListener: Send + Sync {
    /// 整个运行开始
    fn start_test_run(&self, _test: &Test<'_>, _coordinator: &RunCoordinator) {}

    /// 套件开始
    fn start_suite(&self, _suite: &Test<'_>) {}

    /// 用例开始
    fn start_test(&self, _test: &Test<'_>) {}

    /// 用例产生了一条失败记录
    fn add_failure(&self, _failure: &TestFailure) {}

    /// 用例结束
    fn end_test(&self, _test: &Test<'_>) {}

    /// 套件结束
    fn end_suite(&self, _suite: &Test<'_>) {}

    /// 整个运行结束
    fn end_test_run(&self, _test: &Test<'_>, _coordinator: &RunCoordinator) {}
}
