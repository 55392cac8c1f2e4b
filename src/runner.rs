//! rsunit 测试运行器
//!
//! 持有组装好的测试树，挂载结果收集器与进度监听器，按测试路径选择子树运行。

use crate::config::ProgressStyle;
use crate::core::{RunCoordinator, Test, TestFactoryRegistry, TestListener, TestSuite, DEFAULT_REGISTRY_NAME};
use crate::services::{BriefProgressListener, TestResultCollector, TextProgressListener};
use crate::{Result, RsUnitError};
use std::io;
use std::sync::Arc;
use tracing::info;

/// 测试运行器
pub struct TestRunner {
    root: Test<'static>,
    coordinator: RunCoordinator,
}

impl TestRunner {
    /// 以空的根套件创建
    pub fn new() -> Self {
        Self::with_root(Test::Suite(TestSuite::new(DEFAULT_REGISTRY_NAME)))
    }

    /// 以注册表组装的套件为根
    pub fn from_registry(registry: &TestFactoryRegistry) -> Self {
        Self::with_root(registry.make_test())
    }

    pub fn with_root(root: Test<'static>) -> Self {
        Self {
            root,
            coordinator: RunCoordinator::new(),
        }
    }

    /// 向根套件追加测试；根不是套件时先把它包进一个新套件
    pub fn add_test(&mut self, test: Test<'static>) {
        match &mut self.root {
            Test::Suite(suite) => suite.add_test(test),
            _ => {
                let previous = std::mem::replace(&mut self.root, Test::Suite(TestSuite::new(DEFAULT_REGISTRY_NAME)));
                if let Test::Suite(suite) = &mut self.root {
                    suite.add_test(previous);
                    suite.add_test(test);
                }
            }
        }
    }

    pub fn root(&self) -> &Test<'static> {
        &self.root
    }

    /// 运行期间使用的协调器，插件在此挂载监听器
    pub fn coordinator(&self) -> &RunCoordinator {
        &self.coordinator
    }

    /// 运行 `test_path` 指定的子树（为空时运行整棵树），返回收集到的结果
    ///
    /// 运行前请求的停止只作用于这一次运行；结束后协调器回到空闲状态，
    /// 运行器可以再次使用。
    pub fn run(
        &self,
        test_path: Option<&str>,
        progress: Option<Arc<dyn TestListener>>,
    ) -> Result<Arc<TestResultCollector>> {
        let test = match test_path {
            Some(path) => self
                .root
                .find_test_by_path(path)
                .ok_or_else(|| RsUnitError::config(&format!("Test path not found: {}", path)))?,
            None => &self.root,
        };

        let collector = Arc::new(TestResultCollector::new());
        let collector_listener: Arc<dyn TestListener> = collector.clone();
        self.coordinator.add_listener(collector_listener.clone());
        if let Some(progress) = &progress {
            self.coordinator.add_listener(progress.clone());
        }

        let outcome = self.coordinator.run_test(test);

        if let Some(progress) = &progress {
            self.coordinator.remove_listener(progress);
        }
        self.coordinator.remove_listener(&collector_listener);
        outcome?;
        self.coordinator.reset();

        info!(
            "Ran {} tests: {} failures, {} errors",
            collector.run_tests(),
            collector.test_failures(),
            collector.test_errors()
        );
        Ok(collector)
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// 按配置创建进度监听器
pub fn progress_listener(style: ProgressStyle, use_cout: bool) -> Option<Arc<dyn TestListener>> {
    let stream: Box<dyn io::Write + Send> = if use_cout {
        Box::new(io::stdout())
    } else {
        Box::new(io::stderr())
    };

    match style {
        ProgressStyle::Dots => Some(Arc::new(TextProgressListener::with_stream(stream))),
        ProgressStyle::Brief => Some(Arc::new(BriefProgressListener::with_stream(stream))),
        ProgressStyle::None => None,
    }
}
