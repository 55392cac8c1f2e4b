//! 测试结果收集器
//!
//! 作为监听器挂到协调器上，累积执行过的用例与失败记录。
//! 所有状态由一把互斥锁保护，查询在其他线程上同样安全。

use crate::core::{RunCoordinator, Test, TestListener};
use crate::types::{FailureKind, TestFailure};
use parking_lot::Mutex;
use tracing::debug;

/// 单个用例的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStatus {
    /// 没有任何失败
    Passed,
    /// 只有已知失败
    KnownFailure,
    /// 至少一条活动失败
    Failed,
}

/// 收集器内部状态
#[derive(Debug, Default)]
struct CollectorState {
    /// 已开始执行的用例名称（执行顺序）
    tests: Vec<String>,
    /// 与 `tests` 一一对应的结果
    statuses: Vec<TestStatus>,
    /// 活动失败（断言失败与错误）
    failures: Vec<TestFailure>,
    /// 已知失败
    known_failures: Vec<TestFailure>,
    /// 活动失败中的错误数量
    test_errors: usize,
}

impl CollectorState {
    /// 失败记录属于最近开始的用例
    fn mark_current(&mut self, failure: &TestFailure) {
        let current = self
            .tests
            .last()
            .filter(|name| **name == failure.failed_test)
            .map(|_| self.tests.len() - 1);
        let Some(index) = current else {
            return;
        };

        let status = &mut self.statuses[index];
        *status = match (*status, failure.is_known()) {
            (_, false) => TestStatus::Failed,
            (TestStatus::Passed, true) => TestStatus::KnownFailure,
            (other, true) => other,
        };
    }
}

/// 测试结果收集器
#[derive(Debug, Default)]
pub struct TestResultCollector {
    state: Mutex<CollectorState>,
}

impl TestResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 清空全部结果
    pub fn reset(&self) {
        *self.state.lock() = CollectorState::default();
    }

    /// 已执行的用例数量
    pub fn run_tests(&self) -> usize {
        self.state.lock().tests.len()
    }

    /// 错误数量
    pub fn test_errors(&self) -> usize {
        self.state.lock().test_errors
    }

    /// 断言失败数量
    pub fn test_failures(&self) -> usize {
        let state = self.state.lock();
        state.failures.len() - state.test_errors
    }

    /// 活动失败总数（断言失败 + 错误）
    pub fn test_failures_total(&self) -> usize {
        self.state.lock().failures.len()
    }

    /// 已知失败数量
    pub fn test_known_failures(&self) -> usize {
        self.state.lock().known_failures.len()
    }

    /// 没有任何活动失败
    pub fn was_successful(&self) -> bool {
        self.state.lock().failures.is_empty()
    }

    /// 已执行用例名称的快照
    pub fn tests(&self) -> Vec<String> {
        self.state.lock().tests.clone()
    }

    /// 按执行顺序列出每个用例及其结果。同名用例各占一项。
    pub fn test_results(&self) -> Vec<(String, TestStatus)> {
        let state = self.state.lock();
        state
            .tests
            .iter()
            .cloned()
            .zip(state.statuses.iter().copied())
            .collect()
    }

    /// 活动失败的快照
    pub fn failures(&self) -> Vec<TestFailure> {
        self.state.lock().failures.clone()
    }

    /// 已知失败的快照
    pub fn known_failures(&self) -> Vec<TestFailure> {
        self.state.lock().known_failures.clone()
    }
}

impl TestListener for TestResultCollector {
    fn start_test_run(&self, test: &Test<'_>, _coordinator: &RunCoordinator) {
        debug!("Collecting results for '{}'", test.name());
    }

    fn start_test(&self, test: &Test<'_>) {
        let mut state = self.state.lock();
        state.tests.push(test.name().to_string());
        state.statuses.push(TestStatus::Passed);
    }

    fn add_failure(&self, failure: &TestFailure) {
        let mut state = self.state.lock();
        state.mark_current(failure);
        if failure.is_known() {
            state.known_failures.push(failure.clone());
            return;
        }

        if failure.kind == FailureKind::Error {
            state.test_errors += 1;
        }
        state.failures.push(failure.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;

    fn failure(name: &str, kind: FailureKind, known: bool) -> TestFailure {
        let record = TestFailure::new(name, Message::new("failed"), None, kind);
        if known {
            record.into_known()
        } else {
            record
        }
    }

    fn assert_counter_invariant(collector: &TestResultCollector) {
        assert_eq!(
            collector.test_failures_total(),
            collector.test_failures() + collector.test_errors()
        );
    }

    #[test]
    fn test_counter_invariant_over_mixed_outcomes() {
        let collector = TestResultCollector::new();
        let sequence = [
            (FailureKind::AssertionFailure, false),
            (FailureKind::Error, false),
            (FailureKind::AssertionFailure, true),
            (FailureKind::Error, true),
            (FailureKind::Error, false),
            (FailureKind::AssertionFailure, false),
        ];

        for (index, (kind, known)) in sequence.into_iter().enumerate() {
            collector.add_failure(&failure(&format!("t{}", index), kind, known));
            assert_counter_invariant(&collector);
        }

        assert_eq!(collector.test_errors(), 2);
        assert_eq!(collector.test_failures(), 2);
        assert_eq!(collector.test_failures_total(), 4);
        assert_eq!(collector.test_known_failures(), 2);
        assert!(!collector.was_successful());
    }

    #[test]
    fn test_known_failure_does_not_affect_success() {
        let collector = TestResultCollector::new();
        collector.add_failure(&failure("flaky", FailureKind::AssertionFailure, true));
        assert!(collector.was_successful());
        assert_eq!(collector.known_failures()[0].failed_test, "flaky");
    }

    #[test]
    fn test_start_test_records_names_in_order() {
        let collector = TestResultCollector::new();
        collector.start_test(&Test::case("first", || Ok(())));
        collector.start_test(&Test::case("second", || Ok(())));
        assert_eq!(collector.run_tests(), 2);
        assert_eq!(collector.tests(), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_results_follow_each_leaf() {
        let collector = TestResultCollector::new();
        let start = |name: &str| collector.start_test(&Test::case(name, || Ok(())));
        start("twin");
        start("twin");
        collector.add_failure(&failure("twin", FailureKind::AssertionFailure, false));
        start("expected");
        collector.add_failure(&failure("expected", FailureKind::AssertionFailure, true));
        start("mixed");
        collector.add_failure(&failure("mixed", FailureKind::AssertionFailure, true));
        collector.add_failure(&failure("mixed", FailureKind::Error, false));

        assert_eq!(
            collector.test_results(),
            vec![
                ("twin".to_string(), TestStatus::Passed),
                ("twin".to_string(), TestStatus::Failed),
                ("expected".to_string(), TestStatus::KnownFailure),
                ("mixed".to_string(), TestStatus::Failed),
            ]
        );
    }

    #[test]
    fn test_reset_zeroes_every_query() {
        let collector = TestResultCollector::new();
        collector.start_test(&Test::case("a", || Ok(())));
        collector.add_failure(&failure("a", FailureKind::Error, false));
        collector.add_failure(&failure("a", FailureKind::AssertionFailure, false));
        collector.add_failure(&failure("a", FailureKind::AssertionFailure, true));

        collector.reset();

        assert_eq!(collector.run_tests(), 0);
        assert_eq!(collector.test_errors(), 0);
        assert_eq!(collector.test_failures(), 0);
        assert_eq!(collector.test_failures_total(), 0);
        assert_eq!(collector.test_known_failures(), 0);
        assert!(collector.tests().is_empty());
        assert!(collector.test_results().is_empty());
        assert!(collector.failures().is_empty());
        assert!(collector.known_failures().is_empty());
        assert!(collector.was_successful());
    }

    #[test]
    fn test_concurrent_reporting() {
        let collector = std::sync::Arc::new(TestResultCollector::new());
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let collector = collector.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        let kind = if i % 2 == 0 {
                            FailureKind::Error
                        } else {
                            FailureKind::AssertionFailure
                        };
                        collector.add_failure(&failure(&format!("w{}_{}", worker, i), kind, false));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(collector.test_failures_total(), 100);
        assert_eq!(collector.test_errors(), 52);
        assert_counter_invariant(&collector);
    }
}
