//! 测试插件协议
//!
//! 被加载的动态库通过 [`TestPlugin`] 向注册表贡献测试工厂，并在运行期间
//! 向协调器挂载监听器。库导出一个名为 [`PLUGIN_ENTRY_SYMBOL`] 的入口函数，
//! 通常由 [`export_test_plugin!`](crate::export_test_plugin) 生成。
//!
//! 入口函数使用 Rust 调用约定，宿主与插件必须由同一编译器和同一版本的
//! rsunit 构建。

use crate::core::{RunCoordinator, TestFactoryRegistry};
use crate::{Result, RsUnitError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// 插件入口符号名称
pub const PLUGIN_ENTRY_SYMBOL: &str = "rsunit_test_plugin";

/// 插件入口函数签名
pub type PluginEntry = fn() -> Box<dyn TestPlugin>;

/// 插件参数（已按空白拆分）
pub type PluginParameters = Vec<String>;

/// 测试插件
///
/// 宿主按 `initialize` → `add_listener` → 运行 → `remove_listener` →
/// `uninitialize` 的顺序调用，之后先销毁插件对象再释放动态库。
pub trait TestPlugin: Send {
    /// 向注册表注册测试工厂
    fn initialize(&mut self, registry: &mut TestFactoryRegistry, parameters: &[String]) -> Result<()>;

    /// 运行前挂载监听器
    fn add_listener(&mut self, _coordinator: &RunCoordinator) {}

    /// 运行后卸下监听器
    fn remove_listener(&mut self, _coordinator: &RunCoordinator) {}

    /// 注销 `initialize` 中注册的工厂
    fn uninitialize(&mut self, _registry: &mut TestFactoryRegistry) {}
}

/// 插件描述：库路径与参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    /// 动态库路径
    pub library: String,
    /// 插件参数
    #[serde(default)]
    pub parameters: PluginParameters,
}

impl PluginInfo {
    pub fn new(library: &str, parameters: PluginParameters) -> Self {
        Self {
            library: library.to_string(),
            parameters,
        }
    }

    /// 解析命令行记号 `library[="参数 ..."]`
    pub fn parse_token(token: &str) -> Result<Self> {
        let (library, raw_parameters) = match token.split_once('=') {
            Some((library, parameters)) => (library, parameters),
            None => (token, ""),
        };

        let library = library.trim();
        if library.is_empty() {
            return Err(RsUnitError::command_line(&format!(
                "plug-in token '{}' has no library name",
                token
            )));
        }

        let parameters = strip_quotes(raw_parameters.trim())
            .split_whitespace()
            .map(str::to_string)
            .collect();
        Ok(Self::new(library, parameters))
    }
}

fn strip_quotes(text: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = text.strip_prefix(quote).and_then(|rest| rest.strip_suffix(quote)) {
            return inner;
        }
    }
    text
}

/// 注册函数：向插件自己的注册表添加工厂
pub type RegistrationFn = fn(&mut TestFactoryRegistry) -> Result<()>;

/// 默认插件实现
///
/// 初始化时构建一个以插件名命名的本地注册表，并把它作为单个工厂注册到
/// 宿主注册表；反初始化时注销。
pub struct DefaultTestPlugin {
    name: String,
    register: RegistrationFn,
    registered: bool,
}

impl DefaultTestPlugin {
    pub fn new(name: &str, register: RegistrationFn) -> Self {
        Self {
            name: name.to_string(),
            register,
            registered: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl TestPlugin for DefaultTestPlugin {
    fn initialize(&mut self, registry: &mut TestFactoryRegistry, parameters: &[String]) -> Result<()> {
        let mut local = TestFactoryRegistry::new(&self.name);
        (self.register)(&mut local)?;
        debug!(
            "Plugin '{}' built {} factories (parameters: {:?})",
            self.name,
            local.len(),
            parameters
        );

        registry.register_factory(&self.name, Box::new(local))?;
        self.registered = true;
        info!("Plugin '{}' registered into '{}'", self.name, registry.name());
        Ok(())
    }

    fn uninitialize(&mut self, registry: &mut TestFactoryRegistry) {
        if self.registered {
            registry.unregister_factory(&self.name);
            self.registered = false;
            info!("Plugin '{}' unregistered from '{}'", self.name, registry.name());
        }
    }
}

/// 导出插件入口函数
///
/// ```ignore
/// // 插件类型实现 TestPlugin + Default
/// rsunit::export_test_plugin!(MyPlugin);
///
/// // 使用默认插件实现
/// rsunit::export_test_plugin!(name = "MyTests", register = register_tests);
/// ```
#[macro_export]
macro_rules! export_test_plugin {
    (name = $name:expr, register = $register:path) => {
        #[no_mangle]
        pub fn rsunit_test_plugin() -> ::std::boxed::Box<dyn $crate::plugins::TestPlugin> {
            ::std::boxed::Box::new($crate::plugins::DefaultTestPlugin::new($name, $register))
        }
    };
    ($plugin:ty) => {
        #[no_mangle]
        pub fn rsunit_test_plugin() -> ::std::boxed::Box<dyn $crate::plugins::TestPlugin> {
            ::std::boxed::Box::new(<$plugin as ::std::default::Default>::default())
        }
    };
}
