//! 测试结果记录

use super::{Message, SourceLine, TestId};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// 失败类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// 未预期的错误（非断言产生的故障、panic）
    Error,
    /// 显式断言失败
    AssertionFailure,
}

/// 一条失败记录
///
/// 错误与断言失败统一表示，通过 `kind` 区分；`known` 标记已跟踪的已知失败。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFailure {
    /// 失败的测试
    pub failed_test: TestId,
    /// 诊断消息
    pub message: Message,
    /// 源码位置
    pub location: Option<SourceLine>,
    /// 失败类别
    pub kind: FailureKind,
    /// 是否为已知失败
    pub known: bool,
}

impl TestFailure {
    pub fn new(failed_test: &str, message: Message, location: Option<SourceLine>, kind: FailureKind) -> Self {
        Self {
            failed_test: failed_test.to_string(),
            message,
            location,
            kind,
            known: false,
        }
    }

    /// 标记为已知失败
    pub fn into_known(mut self) -> Self {
        self.known = true;
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind == FailureKind::Error
    }

    pub fn is_known(&self) -> bool {
        self.known
    }
}

impl Display for TestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            FailureKind::Error => "error",
            FailureKind::AssertionFailure => "assertion",
        };
        write!(f, "{} ({}", self.failed_test, kind)?;
        if self.known {
            write!(f, ", known")?;
        }
        write!(f, ")")?;
        if let Some(location) = &self.location {
            write!(f, " at {}", location)?;
        }
        write!(f, ": {}", self.message)
    }
}
