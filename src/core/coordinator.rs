//! 运行协调器
//!
//! 驱动一棵测试树的执行，维护运行级控制状态（停止标志），
//! 并在固定的生命周期节点上按挂载顺序通知监听器。

use super::fault::Fault;
use super::listener::TestListener;
use super::test::Test;
use crate::types::{FailureKind, Message, TestFailure};
use crate::{Result, RsUnitError};
use parking_lot::{Mutex, RwLock};
use std::fmt::{self, Display};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info};

/// 运行阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// 尚未运行
    Idle,
    /// 运行中
    Running,
    /// 已请求停止，正在收尾
    Stopping,
    /// 运行结束
    Stopped,
}

/// 运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunState {
    /// 当前阶段
    pub phase: RunPhase,
    /// 是否已请求停止
    pub stop_requested: bool,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            phase: RunPhase::Idle,
            stop_requested: false,
        }
    }
}

/// 用例执行阶段，用于标注错误来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// 创建夹具
    Construction,
    /// setUp
    SetUp,
    /// 测试体
    Body,
    /// tearDown
    TearDown,
}

impl Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = match self {
            Stage::Construction => "fixture construction failed",
            Stage::SetUp => "setUp() failed",
            Stage::Body => "test body failed",
            Stage::TearDown => "tearDown() failed",
        };
        write!(f, "{}", description)
    }
}

/// 运行协调器
///
/// 所有方法都只需要共享引用，可以放进 `Arc` 由其他线程调用
/// [`RunCoordinator::request_stop`] 或查询状态。
pub struct RunCoordinator {
    /// 按挂载顺序排列的监听器
    listeners: RwLock<Vec<Arc<dyn TestListener>>>,
    /// 运行状态
    state: Mutex<RunState>,
}

impl RunCoordinator {
    /// 创建新的协调器
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            state: Mutex::new(RunState::default()),
        }
    }

    /// 挂载监听器。运行中挂载或卸载监听器不受支持。
    pub fn add_listener(&self, listener: Arc<dyn TestListener>) {
        self.listeners.write().push(listener);
    }

    /// 卸载监听器（按指针身份匹配），返回是否找到
    pub fn remove_listener(&self, listener: &Arc<dyn TestListener>) -> bool {
        let target = Arc::as_ptr(listener) as *const ();
        let mut listeners = self.listeners.write();
        match listeners
            .iter()
            .position(|candidate| Arc::as_ptr(candidate) as *const () == target)
        {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }

    /// 已挂载的监听器数量
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// 重置运行状态，只能在两次运行之间调用
    pub fn reset(&self) {
        *self.state.lock() = RunState::default();
    }

    /// 请求停止。可以从任意线程、也可以在监听器回调中调用。
    pub fn request_stop(&self) {
        let mut state = self.state.lock();
        state.stop_requested = true;
        if state.phase == RunPhase::Running {
            state.phase = RunPhase::Stopping;
        }
        info!("Stop requested for current test run");
    }

    /// 是否已请求停止
    pub fn should_stop(&self) -> bool {
        self.state.lock().stop_requested
    }

    /// 当前运行阶段
    pub fn phase(&self) -> RunPhase {
        self.state.lock().phase
    }

    /// 当前运行状态快照
    pub fn state(&self) -> RunState {
        *self.state.lock()
    }

    /// 运行一棵测试树
    ///
    /// 单个用例的故障不会中断整次运行；只有显式请求停止才会提前结束，
    /// 此时已进入的套件仍会收到结束通知。
    pub fn run_test(&self, test: &Test<'_>) -> Result<()> {
        {
            let mut state = self.state.lock();
            if matches!(state.phase, RunPhase::Running | RunPhase::Stopping) {
                return Err(RsUnitError::RunInProgress);
            }
            state.phase = if state.stop_requested {
                RunPhase::Stopping
            } else {
                RunPhase::Running
            };
        }

        let finish = FinishRun { state: &self.state };

        info!(
            "Starting test run '{}' ({} test cases)",
            test.name(),
            test.count_test_cases()
        );
        self.notify(|listener| listener.start_test_run(test, self));

        test.run(self);

        self.notify(|listener| listener.end_test_run(test, self));

        drop(finish);
        let stopped_early = self.state.lock().stop_requested;
        info!("Test run '{}' finished (stopped early: {})", test.name(), stopped_early);
        Ok(())
    }

    /// 通知用例开始
    pub fn start_test(&self, test: &Test<'_>) {
        debug!("Running test: {}", test.name());
        self.notify(|listener| listener.start_test(test));
    }

    /// 通知用例结束
    pub fn end_test(&self, test: &Test<'_>) {
        self.notify(|listener| listener.end_test(test));
    }

    /// 通知套件开始
    pub fn start_suite(&self, suite: &Test<'_>) {
        debug!("Entering suite: {}", suite.name());
        self.notify(|listener| listener.start_suite(suite));
    }

    /// 通知套件结束
    pub fn end_suite(&self, suite: &Test<'_>) {
        self.notify(|listener| listener.end_suite(suite));
    }

    /// 向所有监听器报告一条失败记录
    pub fn add_failure(&self, failure: &TestFailure) {
        debug!("Test failure reported: {}", failure);
        self.notify(|listener| listener.add_failure(failure));
    }

    /// 报告一条非断言错误
    pub fn add_error(&self, test: &Test<'_>, message: Message) {
        self.add_failure(&TestFailure::new(test.name(), message, None, FailureKind::Error));
    }

    /// 报告一个故障
    pub fn add_fault(&self, test: &Test<'_>, fault: Fault) {
        self.add_failure(&fault.into_failure(test.name()));
    }

    /// 在用例边界执行一段代码，捕获返回的故障和 panic 并转换为失败记录。
    /// 成功时返回 `Some`。
    pub fn protect<T, F>(&self, test: &Test<'_>, stage: Stage, f: F) -> Option<T>
    where
        F: FnOnce() -> std::result::Result<T, Fault>,
    {
        let fault = match catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(value)) => return Some(value),
            Ok(Err(fault)) => fault,
            Err(payload) => Fault::from_panic(payload),
        };

        let fault = match (fault, stage) {
            (Fault::Error(mut error), Stage::Construction | Stage::SetUp | Stage::TearDown) => {
                let mut message = Message::new(&stage.to_string());
                message.add_details_from(&error.message);
                error.message = message;
                Fault::Error(error)
            }
            (fault, _) => fault,
        };
        self.add_fault(test, fault);
        None
    }

    /// 按挂载顺序通知；先复制监听器列表，回调期间不持有锁
    fn notify<F>(&self, mut event: F)
    where
        F: FnMut(&dyn TestListener),
    {
        let listeners = self.listeners.read().clone();
        for listener in &listeners {
            event(listener.as_ref());
        }
    }
}

/// 运行结束时把阶段置为 Stopped，监听器 panic 展开时同样生效
struct FinishRun<'a> {
    state: &'a Mutex<RunState>,
}

impl Drop for FinishRun<'_> {
    fn drop(&mut self) {
        self.state.lock().phase = RunPhase::Stopped;
    }
}

impl Default for RunCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
