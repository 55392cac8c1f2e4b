//! 用例故障与断言层
//!
//! 测试代码通过 [`CheckResult`] 向上报告故障。断言失败与一般错误是两种
//! 不同的类型，协调器据此分类，无需解析消息文本。

use crate::types::{FailureKind, Message, SourceLine, TestFailure};
use std::any::Any;
use std::fmt::{self, Display};

/// 用例代码的返回类型
pub type CheckResult = std::result::Result<(), Fault>;

/// 断言失败
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    /// 诊断消息
    pub message: Message,
    /// 断言位置
    pub location: Option<SourceLine>,
    /// 是否为已知失败
    pub known: bool,
}

impl AssertionFailure {
    pub fn new(message: Message, location: Option<SourceLine>) -> Self {
        Self {
            message,
            location,
            known: false,
        }
    }

    /// 以 panic 方式抛出，供无法返回 [`CheckResult`] 的代码使用。
    /// 协调器会从 panic 负载中识别出断言失败。
    pub fn raise(self) -> ! {
        std::panic::panic_any(self)
    }
}

/// 非断言产生的故障
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorFault {
    /// 诊断消息
    pub message: Message,
    /// 故障位置
    pub location: Option<SourceLine>,
}

/// 用例故障
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// 断言失败
    Assertion(AssertionFailure),
    /// 一般错误
    Error(ErrorFault),
}

impl Fault {
    /// 创建一般错误
    pub fn error(description: impl Display) -> Self {
        Self::Error(ErrorFault {
            message: Message::new(&description.to_string()),
            location: None,
        })
    }

    /// 从 panic 负载分类
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let payload = match payload.downcast::<AssertionFailure>() {
            Ok(failure) => return Self::Assertion(*failure),
            Err(payload) => payload,
        };
        let payload = match payload.downcast::<Fault>() {
            Ok(fault) => return *fault,
            Err(payload) => payload,
        };

        let detail = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            String::new()
        };

        let mut message = Message::new("uncaught panic");
        message.add_detail(&detail);
        Self::Error(ErrorFault { message, location: None })
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Assertion(_) => FailureKind::AssertionFailure,
            Self::Error(_) => FailureKind::Error,
        }
    }

    /// 转换为针对某个测试的失败记录
    pub fn into_failure(self, failed_test: &str) -> TestFailure {
        let kind = self.kind();
        match self {
            Self::Assertion(failure) => {
                let record = TestFailure::new(failed_test, failure.message, failure.location, kind);
                if failure.known {
                    record.into_known()
                } else {
                    record
                }
            }
            Self::Error(error) => TestFailure::new(failed_test, error.message, error.location, kind),
        }
    }
}

impl Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assertion(failure) => write!(f, "{}", failure.message),
            Self::Error(error) => write!(f, "{}", error.message),
        }
    }
}

impl From<AssertionFailure> for Fault {
    fn from(failure: AssertionFailure) -> Self {
        Self::Assertion(failure)
    }
}

// Fault 本身不实现 std::error::Error，因此可以对所有错误类型做统一转换，
// 测试体中的 `?` 会把任意错误变成 Error 故障。
impl<E> From<E> for Fault
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self::error(error)
    }
}

/// 断言工具
///
/// 断言宏之下的最小函数集，全部返回 [`CheckResult`]。
pub struct Asserter;

impl Asserter {
    /// 无条件失败
    #[track_caller]
    pub fn fail(message: Message, known: bool) -> CheckResult {
        Err(Fault::Assertion(AssertionFailure {
            message,
            location: Some(SourceLine::caller()),
            known,
        }))
    }

    /// 以一句描述失败
    #[track_caller]
    pub fn fail_with(description: &str) -> CheckResult {
        let mut message = Message::new("assertion failed");
        message.add_detail(description);
        Self::fail(message, false)
    }

    /// 条件成立时失败
    #[track_caller]
    pub fn fail_if(should_fail: bool, message: Message, known: bool) -> CheckResult {
        if should_fail {
            Self::fail(message, known)
        } else {
            Ok(())
        }
    }

    /// 条件不成立时失败
    #[track_caller]
    pub fn check(condition: bool, expression: &str) -> CheckResult {
        let mut message = Message::new("assertion failed");
        message.add_detail(&format!("Expression: {}", expression));
        Self::fail_if(!condition, message, false)
    }

    pub fn make_expected(expected_value: &str) -> String {
        format!("Expected: {}", expected_value)
    }

    pub fn make_actual(actual_value: &str) -> String {
        format!("Actual  : {}", actual_value)
    }

    /// 构造不相等消息
    pub fn make_not_equal_message(
        expected_value: &str,
        actual_value: &str,
        additional_message: &Message,
        short_description: &str,
    ) -> Message {
        let mut message = Message::with_details(
            short_description,
            [Self::make_expected(expected_value), Self::make_actual(actual_value)],
        );
        message.add_details_from(additional_message);
        message
    }

    /// 不相等失败
    #[track_caller]
    pub fn fail_not_equal(
        expected: &str,
        actual: &str,
        additional_message: &Message,
        short_description: &str,
        known: bool,
    ) -> CheckResult {
        Self::fail(
            Self::make_not_equal_message(expected, actual, additional_message, short_description),
            known,
        )
    }

    /// 条件成立时报告不相等失败
    #[track_caller]
    pub fn fail_not_equal_if(
        should_fail: bool,
        expected: &str,
        actual: &str,
        additional_message: &Message,
        short_description: &str,
        known: bool,
    ) -> CheckResult {
        if should_fail {
            Self::fail_not_equal(expected, actual, additional_message, short_description, known)
        } else {
            Ok(())
        }
    }

    /// 相等断言
    #[track_caller]
    pub fn assert_equal<T>(expected: &T, actual: &T) -> CheckResult
    where
        T: PartialEq + fmt::Debug + ?Sized,
    {
        Self::fail_not_equal_if(
            expected != actual,
            &format!("{:?}", expected),
            &format!("{:?}", actual),
            &Message::default(),
            "equality assertion failed",
            false,
        )
    }
}
