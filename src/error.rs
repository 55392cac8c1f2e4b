//! rsunit 错误处理系统
//!
//! 统一的错误类型和错误处理机制。测试用例内部的失败不走这里，
//! 而是通过 [`crate::core::Fault`] 在用例边界被转换为结果记录。

use crate::plugins::dynamic_loader::DynamicLibraryError;
use thiserror::Error;

/// 框架统一错误类型
#[derive(Error, Debug)]
pub enum RsUnitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {message}")]
    Toml { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Test factory '{name}' is already registered in registry '{registry}'")]
    DuplicateFactory { registry: String, name: String },

    #[error("A test run is already in progress")]
    RunInProgress,

    #[error(transparent)]
    DynamicLibrary(#[from] DynamicLibraryError),

    #[error("Plugin error ({library}): {message}")]
    Plugin { library: String, message: String },

    #[error("Command line error: {message}")]
    CommandLine { message: String },
}

impl RsUnitError {
    /// 创建配置相关错误
    pub fn config(message: &str) -> Self {
        Self::Config {
            message: message.to_string(),
        }
    }

    /// 创建插件相关错误
    pub fn plugin(library: &str, message: &str) -> Self {
        Self::Plugin {
            library: library.to_string(),
            message: message.to_string(),
        }
    }

    /// 创建命令行相关错误
    pub fn command_line(message: &str) -> Self {
        Self::CommandLine {
            message: message.to_string(),
        }
    }

    /// 是否属于插件加载阶段的错误（宿主应当作为配置错误报告）
    pub fn is_plugin_failure(&self) -> bool {
        matches!(self, Self::DynamicLibrary(_) | Self::Plugin { .. })
    }
}

impl From<toml::de::Error> for RsUnitError {
    fn from(error: toml::de::Error) -> Self {
        Self::Toml {
            message: error.to_string(),
        }
    }
}

impl From<toml::ser::Error> for RsUnitError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Toml {
            message: error.to_string(),
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, RsUnitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = RsUnitError::config("missing output file");
        assert!(matches!(error, RsUnitError::Config { .. }));
        assert_eq!(error.to_string(), "Configuration error: missing output file");
    }

    #[test]
    fn test_duplicate_factory_message() {
        let error = RsUnitError::DuplicateFactory {
            registry: "All Tests".to_string(),
            name: "MathTest".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Test factory 'MathTest' is already registered in registry 'All Tests'"
        );
    }

    #[test]
    fn test_plugin_failures_are_flagged() {
        let loading = RsUnitError::from(DynamicLibraryError::LoadingFailed {
            library: "libmissing.so".to_string(),
            detail: "not found".to_string(),
        });
        assert!(loading.is_plugin_failure());
        assert!(RsUnitError::plugin("libx.so", "bad parameters").is_plugin_failure());
        assert!(!RsUnitError::RunInProgress.is_plugin_failure());
    }

    #[test]
    fn test_error_from_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error = RsUnitError::from(io_error);
        assert!(matches!(error, RsUnitError::Io(_)));
    }
}
