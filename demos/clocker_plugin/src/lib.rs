//! 计时插件
//!
//! 记录每个用例与套件的耗时，在运行结束时输出。参数 `text` 打开逐条输出，
//! 否则只输出总耗时。插件同时贡献一个小的自检套件。
//!
//! 构建后以 `rsunit_runner target/debug/libclocker_plugin.so="text"` 加载。

use parking_lot::Mutex;
use rsunit::{
    Asserter, CheckResult, DefaultTestPlugin, Fixture, FixtureSuite, Result, RunCoordinator, Test,
    TestFactoryRegistry, TestListener, TestPlugin, TestSuiteBuilder, TestSuiteFactory,
};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// 一条计时记录
#[derive(Debug, Clone, PartialEq)]
pub struct TestTiming {
    pub name: String,
    /// 在测试树中的深度
    pub depth: usize,
    pub is_suite: bool,
    pub elapsed: Duration,
}

#[derive(Default)]
struct ClockerState {
    /// 正在计时的节点：记录下标与开始时间
    running: Vec<(usize, Instant)>,
    timings: Vec<TestTiming>,
    run_started: Option<Instant>,
    total: Duration,
}

/// 计时监听器
pub struct ClockerListener {
    text: bool,
    state: Mutex<ClockerState>,
    stream: Mutex<Box<dyn Write + Send>>,
}

impl ClockerListener {
    pub fn new(text: bool) -> Self {
        Self::with_stream(text, Box::new(io::stdout()))
    }

    pub fn with_stream(text: bool, stream: Box<dyn Write + Send>) -> Self {
        Self {
            text,
            state: Mutex::new(ClockerState::default()),
            stream: Mutex::new(stream),
        }
    }

    /// 已完成的计时记录（开始顺序）
    pub fn timings(&self) -> Vec<TestTiming> {
        self.state.lock().timings.clone()
    }

    fn enter(&self, test: &Test<'_>, is_suite: bool) {
        let mut state = self.state.lock();
        let depth = state.running.len();
        let index = state.timings.len();
        state.timings.push(TestTiming {
            name: test.name().to_string(),
            depth,
            is_suite,
            elapsed: Duration::ZERO,
        });
        state.running.push((index, Instant::now()));
    }

    fn leave(&self) {
        let mut state = self.state.lock();
        if let Some((index, started)) = state.running.pop() {
            state.timings[index].elapsed = started.elapsed();
        }
    }

    fn report(&self) -> io::Result<()> {
        let state = self.state.lock();
        let mut stream = self.stream.lock();
        if self.text {
            for timing in &state.timings {
                writeln!(
                    stream,
                    "{}{} : {:.3} s",
                    "  ".repeat(timing.depth),
                    timing.name,
                    timing.elapsed.as_secs_f64()
                )?;
            }
        }
        writeln!(stream, "Total elapsed time: {:.3} s", state.total.as_secs_f64())?;
        stream.flush()
    }
}

impl TestListener for ClockerListener {
    fn start_test_run(&self, _test: &Test<'_>, _coordinator: &RunCoordinator) {
        let mut state = self.state.lock();
        *state = ClockerState::default();
        state.run_started = Some(Instant::now());
    }

    fn start_suite(&self, suite: &Test<'_>) {
        self.enter(suite, true);
    }

    fn start_test(&self, test: &Test<'_>) {
        self.enter(test, false);
    }

    fn end_test(&self, _test: &Test<'_>) {
        self.leave();
    }

    fn end_suite(&self, _suite: &Test<'_>) {
        self.leave();
    }

    fn end_test_run(&self, _test: &Test<'_>, _coordinator: &RunCoordinator) {
        {
            let mut state = self.state.lock();
            state.total = state.run_started.map(|started| started.elapsed()).unwrap_or_default();
        }
        if let Err(e) = self.report() {
            warn!("Failed to write timing report: {}", e);
        }
    }
}

/// 自检夹具
#[derive(Default)]
pub struct ClockerSelfTest {
    started: Option<Instant>,
}

impl Fixture for ClockerSelfTest {
    fn set_up(&mut self) -> CheckResult {
        self.started = Some(Instant::now());
        Ok(())
    }
}

fn clock_is_monotonic(fixture: &mut ClockerSelfTest) -> CheckResult {
    let started = fixture.started.unwrap_or_else(Instant::now);
    Asserter::check(Instant::now() >= started, "Instant::now() >= started")
}

fn duration_formatting(_: &mut ClockerSelfTest) -> CheckResult {
    Asserter::assert_equal("1.500", format!("{:.3}", Duration::from_millis(1500).as_secs_f64()).as_str())
}

impl FixtureSuite for ClockerSelfTest {
    fn suite_name() -> &'static str {
        "ClockerSelfTest"
    }

    fn add_tests(builder: TestSuiteBuilder<Self>) -> TestSuiteBuilder<Self> {
        builder
            .add_test("clock_is_monotonic", clock_is_monotonic)
            .add_test("duration_formatting", duration_formatting)
    }
}

fn register_self_test(registry: &mut TestFactoryRegistry) -> Result<()> {
    registry.register_factory(
        ClockerSelfTest::suite_name(),
        Box::new(TestSuiteFactory::<ClockerSelfTest>::new()),
    )
}

/// 计时插件
pub struct ClockerPlugin {
    suite: DefaultTestPlugin,
    listener: Option<Arc<dyn TestListener>>,
}

impl Default for ClockerPlugin {
    fn default() -> Self {
        Self {
            suite: DefaultTestPlugin::new("ClockerPlugIn", register_self_test),
            listener: None,
        }
    }
}

impl TestPlugin for ClockerPlugin {
    fn initialize(&mut self, registry: &mut TestFactoryRegistry, parameters: &[String]) -> Result<()> {
        let text = parameters.first().map(String::as_str) == Some("text");
        self.listener = Some(Arc::new(ClockerListener::new(text)));
        self.suite.initialize(registry, parameters)
    }

    fn add_listener(&mut self, coordinator: &RunCoordinator) {
        if let Some(listener) = &self.listener {
            coordinator.add_listener(listener.clone());
        }
    }

    fn remove_listener(&mut self, coordinator: &RunCoordinator) {
        if let Some(listener) = &self.listener {
            coordinator.remove_listener(listener);
        }
    }

    fn uninitialize(&mut self, registry: &mut TestFactoryRegistry) {
        self.suite.uninitialize(registry);
        self.listener = None;
    }
}

rsunit::export_test_plugin!(ClockerPlugin);
