//! rsunit_runner - 插件测试运行程序
//!
//! 加载命令行或配置文件中列出的测试插件，运行默认注册表中的测试并输出报告。
//!
//! 退出码：0 全部通过，1 有测试失败，2 配置或插件加载错误。

use anyhow::{Context, Result};
use clap::Parser;
use rsunit::config::{ConfigManager, LogLevel, OutputStyle, ProgressStyle, RunnerConfig};
use rsunit::runner::{progress_listener, TestRunner};
use rsunit::services::{CompilerOutputter, Outputter, TestResultCollector, TextOutputter, XmlOutputter};
use rsunit::{PluginInfo, PluginManager, TestFactoryRegistry};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};

/// Runs the tests contributed by test plug-ins
#[derive(Parser, Debug)]
#[command(name = "rsunit_runner", version, about, long_about = None)]
#[command(after_help = "TOKENS:\n    library[=\"parameters\"]    Load a test plug-in\n    :testpath                 Only run the tests under this path")]
struct Cli {
    /// Use the compiler-style outputter
    #[arg(short = 'c', long = "compiler", conflicts_with_all = ["xml", "text"])]
    compiler: bool,

    /// Write an XML report, to FILE if given
    #[arg(short = 'x', long = "xml", value_name = "FILE", num_args = 0..=1, default_missing_value = "")]
    xml: Option<String>,

    /// XML stylesheet referenced by the report
    #[arg(short = 's', long = "xsl", value_name = "SHEET")]
    xsl: Option<String>,

    /// XML report encoding
    #[arg(short = 'e', long = "encoding", value_name = "ENCODING")]
    encoding: Option<String>,

    /// Print one line per test
    #[arg(short = 'b', long = "brief-progress", conflicts_with = "no_progress")]
    brief_progress: bool,

    /// Do not print progress
    #[arg(short = 'n', long = "no-progress")]
    no_progress: bool,

    /// Use the text outputter
    #[arg(short = 't', long = "text", conflicts_with = "xml")]
    text: bool,

    /// Write output to stdout instead of stderr
    #[arg(short = 'o', long = "cout")]
    cout: bool,

    /// Configuration file (YAML or TOML)
    #[arg(long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long = "log-level", value_name = "LEVEL")]
    log_level: Option<String>,

    /// Write the effective configuration to FILE and exit
    #[arg(long = "write-config", value_name = "FILE")]
    write_config: Option<PathBuf>,

    /// Plug-in tokens `library[="parameters"]` and `:testpath`
    #[arg(value_name = "TOKEN")]
    tokens: Vec<String>,
}

/// 程序入口点
fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_main(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("rsunit_runner: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// 主要逻辑，返回测试是否全部通过
fn run_main(cli: Cli) -> Result<bool> {
    let config = build_config(&cli)?;

    if let Some(path) = &cli.write_config {
        ConfigManager::from_config(config)
            .save_to_file(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Configuration written to {}", path.display());
        return Ok(true);
    }

    rsunit::initialize_logging(config.logging.level.as_filter())?;
    debug!("Effective configuration: {:?}", config);

    let mut plugins = PluginManager::new();
    plugins
        .load_all(&config.plugins)
        .context("failed to load test plug-ins")?;

    let collector = {
        let runner = TestRunner::from_registry(&TestFactoryRegistry::get_registry().lock());
        plugins.add_listeners(runner.coordinator());
        let outcome = runner.run(
            config.test_path.as_deref(),
            progress_listener(config.progress, config.output.use_cout),
        );
        plugins.remove_listeners(runner.coordinator());
        // 测试树中的代码可能来自插件库，先于插件卸载销毁
        drop(runner);
        outcome.context("failed to run tests")?
    };

    write_report(&config, &collector)?;
    plugins.unload_all();

    info!("Test run complete, successful: {}", collector.was_successful());
    Ok(collector.was_successful())
}

/// 合并配置文件与命令行参数
fn build_config(cli: &Cli) -> Result<RunnerConfig> {
    let mut config_manager = match &cli.config {
        Some(path) => ConfigManager::load_from_file(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => ConfigManager::new_default(),
    };

    let config = config_manager.get_config_mut();
    if cli.compiler {
        config.output.style = OutputStyle::Compiler;
    }
    if cli.text {
        config.output.style = OutputStyle::Text;
    }
    if let Some(file) = &cli.xml {
        config.output.style = OutputStyle::Xml;
        config.output.file = if file.is_empty() { None } else { Some(file.clone()) };
    }
    if let Some(xsl) = &cli.xsl {
        config.output.xsl = Some(xsl.clone());
    }
    if let Some(encoding) = &cli.encoding {
        config.output.encoding = Some(encoding.clone());
    }
    if cli.cout {
        config.output.use_cout = true;
    }
    if cli.brief_progress {
        config.progress = ProgressStyle::Brief;
    }
    if cli.no_progress {
        config.progress = ProgressStyle::None;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = LogLevel::parse(level)?;
    }

    for token in &cli.tokens {
        match token.strip_prefix(':') {
            Some(path) => config.test_path = Some(path.to_string()),
            None => config.plugins.push(PluginInfo::parse_token(token)?),
        }
    }

    config_manager.validate()?;
    Ok(config_manager.into_config())
}

/// 按配置写出报告
fn write_report(config: &RunnerConfig, collector: &TestResultCollector) -> Result<()> {
    let output = &config.output;
    let mut stream: Box<dyn Write> = if output.use_cout {
        Box::new(io::stdout())
    } else {
        Box::new(io::stderr())
    };

    match output.style {
        OutputStyle::Text => TextOutputter::new(collector).write(&mut stream)?,
        OutputStyle::Compiler => CompilerOutputter::new(collector).write(&mut stream)?,
        OutputStyle::Xml => {
            let mut xml = XmlOutputter::new(collector);
            if let Some(encoding) = &output.encoding {
                xml = xml.with_encoding(encoding);
            }
            if let Some(xsl) = &output.xsl {
                xml = xml.with_style_sheet(xsl);
            }

            match &output.file {
                Some(file) => {
                    let mut writer = BufWriter::new(
                        File::create(file).with_context(|| format!("failed to create {}", file))?,
                    );
                    xml.write(&mut writer)?;
                    writer.flush()?;
                    info!("XML report written to {}", file);
                }
                None => xml.write(&mut stream)?,
            }
        }
    }

    stream.flush()?;
    Ok(())
}
