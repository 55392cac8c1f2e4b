//! 进度监听器
//!
//! 在运行过程中把每个用例的进度写到输出流。

use crate::core::{RunCoordinator, Test, TestListener};
use crate::types::{FailureKind, TestFailure};
use parking_lot::Mutex;
use std::io::{self, Write};
use tracing::warn;

/// 共享输出流
pub type ProgressStream = Box<dyn Write + Send>;

fn emit(stream: &Mutex<ProgressStream>, text: &str) {
    let mut stream = stream.lock();
    if let Err(e) = stream.write_all(text.as_bytes()).and_then(|_| stream.flush()) {
        warn!("Failed to write progress output: {}", e);
    }
}

/// 点状进度：每个用例一个 `.`，失败追加 `F`，错误追加 `E`
pub struct TextProgressListener {
    stream: Mutex<ProgressStream>,
}

impl TextProgressListener {
    /// 写到标准错误
    pub fn new() -> Self {
        Self::with_stream(Box::new(io::stderr()))
    }

    pub fn with_stream(stream: ProgressStream) -> Self {
        Self {
            stream: Mutex::new(stream),
        }
    }
}

impl Default for TextProgressListener {
    fn default() -> Self {
        Self::new()
    }
}

impl TestListener for TextProgressListener {
    fn start_test(&self, _test: &Test<'_>) {
        emit(&self.stream, ".");
    }

    fn add_failure(&self, failure: &TestFailure) {
        let mark = match failure.kind {
            FailureKind::Error => "E",
            FailureKind::AssertionFailure => "F",
        };
        emit(&self.stream, mark);
    }

    fn end_test_run(&self, _test: &Test<'_>, _coordinator: &RunCoordinator) {
        emit(&self.stream, "\n\n");
    }
}

/// 简要进度：每个用例一行 `名称 : 结果`
pub struct BriefProgressListener {
    stream: Mutex<ProgressStream>,
    /// 当前用例是否已经报告过失败
    last_test_failed: Mutex<bool>,
}

impl BriefProgressListener {
    /// 写到标准输出
    pub fn new() -> Self {
        Self::with_stream(Box::new(io::stdout()))
    }

    pub fn with_stream(stream: ProgressStream) -> Self {
        Self {
            stream: Mutex::new(stream),
            last_test_failed: Mutex::new(false),
        }
    }
}

impl Default for BriefProgressListener {
    fn default() -> Self {
        Self::new()
    }
}

impl TestListener for BriefProgressListener {
    fn start_test(&self, test: &Test<'_>) {
        *self.last_test_failed.lock() = false;
        emit(&self.stream, test.name());
    }

    fn add_failure(&self, failure: &TestFailure) {
        let mut failed = self.last_test_failed.lock();
        if *failed {
            return;
        }
        *failed = true;
        let outcome = match failure.kind {
            FailureKind::Error => " : error",
            FailureKind::AssertionFailure => " : assertion",
        };
        emit(&self.stream, outcome);
    }

    fn end_test(&self, _test: &Test<'_>) {
        if !*self.last_test_failed.lock() {
            emit(&self.stream, " : OK");
        }
        emit(&self.stream, "\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Asserter;
    use std::sync::Arc;

    /// 可在测试中读取的内存输出
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn sample_suite() -> Test<'static> {
        Test::suite(
            "Progress",
            [
                Test::case("passes", || Ok(())),
                Test::case("fails", || Asserter::fail_with("nope")),
                Test::case("errors", || Err(crate::core::Fault::error("boom"))),
            ],
        )
    }

    #[test]
    fn test_dot_progress() {
        let buffer = SharedBuffer::default();
        let coordinator = RunCoordinator::new();
        coordinator.add_listener(Arc::new(TextProgressListener::with_stream(Box::new(buffer.clone()))));
        coordinator.run_test(&sample_suite()).unwrap();

        assert_eq!(buffer.contents(), "..F.E\n\n");
    }

    #[test]
    fn test_brief_progress() {
        let buffer = SharedBuffer::default();
        let coordinator = RunCoordinator::new();
        coordinator.add_listener(Arc::new(BriefProgressListener::with_stream(Box::new(buffer.clone()))));
        coordinator.run_test(&sample_suite()).unwrap();

        assert_eq!(
            buffer.contents(),
            "passes : OK\nfails : assertion\nerrors : error\n"
        );
    }
}
