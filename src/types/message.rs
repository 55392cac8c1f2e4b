//! 诊断消息与源码位置

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// 源码位置
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLine {
    /// 文件名
    pub file_name: String,
    /// 行号（从1开始）
    pub line_number: u32,
}

impl SourceLine {
    pub fn new(file_name: &str, line_number: u32) -> Self {
        Self {
            file_name: file_name.to_string(),
            line_number,
        }
    }

    /// 调用者位置，配合 `#[track_caller]` 使用
    #[track_caller]
    pub fn caller() -> Self {
        let location = std::panic::Location::caller();
        Self::new(location.file(), location.line())
    }
}

impl Display for SourceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_name, self.line_number)
    }
}

/// 诊断消息
///
/// 一条简短描述加上有序的详细信息行，例如断言比较时的
/// "Expected: ..." / "Actual  : ..."。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// 简短描述
    pub short_description: String,
    /// 详细信息
    pub details: Vec<String>,
}

impl Message {
    pub fn new(short_description: &str) -> Self {
        Self {
            short_description: short_description.to_string(),
            details: Vec::new(),
        }
    }

    /// 带详细信息创建
    pub fn with_details<I, S>(short_description: &str, details: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            short_description: short_description.to_string(),
            details: details.into_iter().map(Into::into).collect(),
        }
    }

    /// 追加一行详细信息，空行忽略
    pub fn add_detail(&mut self, detail: &str) {
        if !detail.is_empty() {
            self.details.push(detail.to_string());
        }
    }

    /// 追加另一条消息的描述与详细信息
    pub fn add_details_from(&mut self, other: &Message) {
        self.add_detail(&other.short_description);
        for detail in &other.details {
            self.add_detail(detail);
        }
    }

    /// 所有详细信息以换行拼接
    pub fn details_text(&self) -> String {
        self.details
            .iter()
            .map(|detail| format!("- {}", detail))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_description)?;
        for detail in &self.details {
            write!(f, "\n- {}", detail)?;
        }
        Ok(())
    }
}
