//! rsunit 配置管理系统
//!
//! 支持 YAML / TOML 配置文件驱动的测试运行。命令行参数在此基础上覆盖。

use crate::plugins::PluginInfo;
use crate::{Result, RsUnitError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 运行器配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// 进度显示方式
    pub progress: ProgressStyle,
    /// 只运行该路径下的测试
    pub test_path: Option<String>,
    /// 报告输出配置
    pub output: OutputConfig,
    /// 要加载的插件
    pub plugins: Vec<PluginInfo>,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 报告输出配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// 报告格式
    pub style: OutputStyle,
    /// XML 报告文件；为空时写到输出流
    pub file: Option<String>,
    /// XML 样式表
    pub xsl: Option<String>,
    /// XML 编码
    pub encoding: Option<String>,
    /// 输出流使用标准输出而不是标准错误
    pub use_cout: bool,
}

/// 报告格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    /// 文本报告
    #[default]
    Text,
    /// 编译器风格
    Compiler,
    /// XML 报告
    Xml,
}

/// 进度显示方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStyle {
    /// 点状进度
    #[default]
    Dots,
    /// 每个用例一行
    Brief,
    /// 不显示
    None,
}

/// 日志配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,
}

/// 日志级别
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// tracing 过滤字符串
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// 从字符串解析（不区分大小写）
    pub fn parse(level: &str) -> Result<Self> {
        match level.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(RsUnitError::config(&format!("Unknown log level: {}", other))),
        }
    }
}

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    config: RunnerConfig,
}

impl ConfigManager {
    /// 从文件加载配置，`.toml` 按 TOML 解析，其余按 YAML
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RsUnitError::config(&format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config: RunnerConfig = match ConfigFormat::from_path(path) {
            ConfigFormat::Toml => toml::from_str(&content)?,
            ConfigFormat::Yaml => serde_yaml::from_str(&content)?,
        };

        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(Self { config })
    }

    /// 创建默认配置
    pub fn new_default() -> Self {
        Self {
            config: RunnerConfig::default(),
        }
    }

    /// 由已有配置创建
    pub fn from_config(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// 保存配置到文件，格式由扩展名决定
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match ConfigFormat::from_path(path) {
            ConfigFormat::Toml => toml::to_string_pretty(&self.config)?,
            ConfigFormat::Yaml => serde_yaml::to_string(&self.config)?,
        };

        std::fs::write(path, content).map_err(|e| {
            RsUnitError::config(&format!("Failed to write config file {}: {}", path.display(), e))
        })?;
        Ok(())
    }

    /// 获取配置
    pub fn get_config(&self) -> &RunnerConfig {
        &self.config
    }

    /// 获取可变配置
    pub fn get_config_mut(&mut self) -> &mut RunnerConfig {
        &mut self.config
    }

    /// 取出配置
    pub fn into_config(self) -> RunnerConfig {
        self.config
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        let output = &self.config.output;
        if output.style != OutputStyle::Xml {
            if output.file.is_some() {
                return Err(RsUnitError::config("An output file requires the XML output style"));
            }
            if output.xsl.is_some() {
                return Err(RsUnitError::config("A stylesheet requires the XML output style"));
            }
            if output.encoding.is_some() {
                return Err(RsUnitError::config("An encoding requires the XML output style"));
            }
        }

        if matches!(&output.file, Some(file) if file.trim().is_empty()) {
            return Err(RsUnitError::config("XML output file name cannot be empty"));
        }

        if let Some(plugin) = self.config.plugins.iter().find(|p| p.library.trim().is_empty()) {
            return Err(RsUnitError::config(&format!(
                "Plug-in library path cannot be empty (parameters: {:?})",
                plugin.parameters
            )));
        }

        if matches!(&self.config.test_path, Some(path) if path.trim().is_empty()) {
            return Err(RsUnitError::config("Test path cannot be empty"));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }
}

/// 生成默认配置文件
pub fn generate_default_config_file<P: AsRef<Path>>(path: P) -> Result<()> {
    ConfigManager::new_default().save_to_file(path)
}
