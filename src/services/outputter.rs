//! 结果输出器
//!
//! 运行结束后把收集器中的结果写成文本、编译器风格或 XML 报告。

use super::result_collector::{TestResultCollector, TestStatus};
use crate::types::{FailureKind, TestFailure};
use crate::Result;
use std::io::Write;

/// 默认 XML 编码。报告总是以 UTF-8 字节写出，其他声明只在调用者自行转码时使用。
pub const DEFAULT_XML_ENCODING: &str = "UTF-8";

/// 结果输出器
pub trait Outputter {
    /// 写出完整报告
    fn write(&self, stream: &mut dyn Write) -> Result<()>;
}

fn failure_type(failure: &TestFailure) -> &'static str {
    match failure.kind {
        FailureKind::Error => "Error",
        FailureKind::AssertionFailure => "Assertion",
    }
}

/// 人类可读的文本报告
pub struct TextOutputter<'a> {
    collector: &'a TestResultCollector,
}

impl<'a> TextOutputter<'a> {
    pub fn new(collector: &'a TestResultCollector) -> Self {
        Self { collector }
    }

    fn write_failure(&self, stream: &mut dyn Write, index: usize, failure: &TestFailure) -> Result<()> {
        let tag = match failure.kind {
            FailureKind::Error => "E",
            FailureKind::AssertionFailure => "F",
        };
        write!(stream, "{}) test: {} ({})", index, failure.failed_test, tag)?;
        if let Some(location) = &failure.location {
            write!(stream, " line: {} {}", location.line_number, location.file_name)?;
        }
        writeln!(stream)?;
        writeln!(stream, "{}", failure.message)?;
        Ok(())
    }
}

impl Outputter for TextOutputter<'_> {
    fn write(&self, stream: &mut dyn Write) -> Result<()> {
        let collector = self.collector;
        if collector.was_successful() {
            writeln!(stream)?;
            writeln!(stream, "OK ({} tests)", collector.run_tests())?;
        } else {
            writeln!(stream)?;
            writeln!(stream, "!!!FAILURES!!!")?;
            writeln!(stream, "Test Results:")?;
            writeln!(
                stream,
                "Run:  {}   Failures: {}   Errors: {}",
                collector.run_tests(),
                collector.test_failures(),
                collector.test_errors()
            )?;
            writeln!(stream)?;

            for (index, failure) in collector.failures().iter().enumerate() {
                self.write_failure(stream, index + 1, failure)?;
            }
        }

        let known = collector.known_failures();
        if !known.is_empty() {
            writeln!(stream, "Known failures: {}", known.len())?;
            for failure in &known {
                writeln!(stream, "  {}", failure)?;
            }
        }
        Ok(())
    }
}

/// 编译器风格报告：每条失败以 `file:line:` 开头，便于 IDE 跳转
pub struct CompilerOutputter<'a> {
    collector: &'a TestResultCollector,
}

impl<'a> CompilerOutputter<'a> {
    pub fn new(collector: &'a TestResultCollector) -> Self {
        Self { collector }
    }
}

impl Outputter for CompilerOutputter<'_> {
    fn write(&self, stream: &mut dyn Write) -> Result<()> {
        let collector = self.collector;
        if collector.was_successful() {
            writeln!(stream, "OK ({})", collector.run_tests())?;
            return Ok(());
        }

        for failure in collector.failures() {
            match &failure.location {
                Some(location) => write!(stream, "{}:", location)?,
                None => write!(stream, "##Failure Location unknown##:")?,
            }
            writeln!(stream, " {}", failure_type(&failure))?;
            writeln!(stream, "Test name: {}", failure.failed_test)?;
            writeln!(stream, "{}", failure.message)?;
            writeln!(stream)?;
        }

        writeln!(
            stream,
            "Failures !!!\nRun: {}   Failure total: {}   Failures: {}   Errors: {}",
            collector.run_tests(),
            collector.test_failures_total(),
            collector.test_failures(),
            collector.test_errors()
        )?;
        Ok(())
    }
}

/// XML 报告
///
/// 结构为 `TestRun` → `FailedTests` / `SuccessfulTests` / `KnownFailures` /
/// `Statistics`，`KnownFailures` 只在存在已知失败时出现。
/// 可选的样式表以 `xml-stylesheet` 处理指令引用。
pub struct XmlOutputter<'a> {
    collector: &'a TestResultCollector,
    encoding: String,
    style_sheet: Option<String>,
}

impl<'a> XmlOutputter<'a> {
    pub fn new(collector: &'a TestResultCollector) -> Self {
        Self {
            collector,
            encoding: DEFAULT_XML_ENCODING.to_string(),
            style_sheet: None,
        }
    }

    pub fn with_encoding(mut self, encoding: &str) -> Self {
        self.encoding = encoding.to_string();
        self
    }

    pub fn with_style_sheet(mut self, style_sheet: &str) -> Self {
        self.style_sheet = Some(style_sheet.to_string());
        self
    }

    fn write_failed_tests(&self, stream: &mut dyn Write, failures: &[TestFailure]) -> Result<()> {
        writeln!(stream, "  <FailedTests>")?;
        for (index, failure) in failures.iter().enumerate() {
            writeln!(stream, "    <FailedTest id=\"{}\">", index + 1)?;
            writeln!(stream, "      <Name>{}</Name>", escape(&failure.failed_test))?;
            writeln!(stream, "      <FailureType>{}</FailureType>", failure_type(failure))?;
            if let Some(location) = &failure.location {
                writeln!(stream, "      <Location>")?;
                writeln!(stream, "        <File>{}</File>", escape(&location.file_name))?;
                writeln!(stream, "        <Line>{}</Line>", location.line_number)?;
                writeln!(stream, "      </Location>")?;
            }
            writeln!(stream, "      <Message>{}</Message>", escape(&failure.message.to_string()))?;
            writeln!(stream, "    </FailedTest>")?;
        }
        writeln!(stream, "  </FailedTests>")?;
        Ok(())
    }

    /// 没有任何失败的用例。编号接在失败记录之后连续递增。
    fn write_successful_tests(
        &self,
        stream: &mut dyn Write,
        results: &[(String, TestStatus)],
        first_id: usize,
    ) -> Result<usize> {
        let mut next_id = first_id;
        writeln!(stream, "  <SuccessfulTests>")?;
        for (name, _) in results.iter().filter(|(_, status)| *status == TestStatus::Passed) {
            writeln!(stream, "    <Test id=\"{}\">", next_id)?;
            writeln!(stream, "      <Name>{}</Name>", escape(name))?;
            writeln!(stream, "    </Test>")?;
            next_id += 1;
        }
        writeln!(stream, "  </SuccessfulTests>")?;
        Ok(next_id)
    }

    /// 只有已知失败的用例单独列出，既不算失败也不算成功
    fn write_known_failures(
        &self,
        stream: &mut dyn Write,
        known: &[TestFailure],
        first_id: usize,
    ) -> Result<()> {
        if known.is_empty() {
            return Ok(());
        }

        writeln!(stream, "  <KnownFailures>")?;
        for (offset, failure) in known.iter().enumerate() {
            writeln!(stream, "    <KnownFailure id=\"{}\">", first_id + offset)?;
            writeln!(stream, "      <Name>{}</Name>", escape(&failure.failed_test))?;
            writeln!(stream, "      <FailureType>{}</FailureType>", failure_type(failure))?;
            writeln!(stream, "      <Message>{}</Message>", escape(&failure.message.to_string()))?;
            writeln!(stream, "    </KnownFailure>")?;
        }
        writeln!(stream, "  </KnownFailures>")?;
        Ok(())
    }
}

impl Outputter for XmlOutputter<'_> {
    fn write(&self, stream: &mut dyn Write) -> Result<()> {
        let collector = self.collector;
        let failures = collector.failures();
        let results = collector.test_results();

        writeln!(
            stream,
            "<?xml version=\"1.0\" encoding='{}' standalone='yes' ?>",
            self.encoding
        )?;
        if let Some(style_sheet) = &self.style_sheet {
            writeln!(
                stream,
                "<?xml-stylesheet type=\"text/xsl\" href=\"{}\"?>",
                escape(style_sheet)
            )?;
        }
        writeln!(stream, "<TestRun>")?;
        self.write_failed_tests(stream, &failures)?;
        let next_id = self.write_successful_tests(stream, &results, failures.len() + 1)?;
        self.write_known_failures(stream, &collector.known_failures(), next_id)?;

        writeln!(stream, "  <Statistics>")?;
        writeln!(stream, "    <Tests>{}</Tests>", collector.run_tests())?;
        writeln!(stream, "    <FailuresTotal>{}</FailuresTotal>", collector.test_failures_total())?;
        writeln!(stream, "    <Errors>{}</Errors>", collector.test_errors())?;
        writeln!(stream, "    <Failures>{}</Failures>", collector.test_failures())?;
        writeln!(stream, "  </Statistics>")?;
        writeln!(stream, "</TestRun>")?;
        Ok(())
    }
}

/// XML 字符转义
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
