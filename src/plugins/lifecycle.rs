//! 插件生命周期管理
//!
//! 按固定顺序驱动多个插件：加载库 → 解析入口 → `initialize` →
//! `add_listener` → 运行 → `remove_listener` → `uninitialize` →
//! 销毁插件对象 → 释放库。卸载按加载的逆序进行。
//!
//! 插件产出的测试树持有插件库中的代码，必须在卸载插件之前销毁。

use super::core::{PluginEntry, PluginInfo, TestPlugin, PLUGIN_ENTRY_SYMBOL};
use super::dynamic_loader::DynamicLibraryManager;
use crate::core::registry::SharedRegistry;
use crate::core::{RunCoordinator, TestFactoryRegistry};
use crate::{Result, RsUnitError};
use std::ffi::c_void;
use tracing::{debug, info, warn};

/// 一个已加载的插件
struct LoadedPlugin {
    info: PluginInfo,
    plugin: Option<Box<dyn TestPlugin>>,
    /// 内置插件没有动态库
    library: Option<DynamicLibraryManager>,
}

impl LoadedPlugin {
    fn plugin_mut(&mut self) -> Option<&mut (dyn TestPlugin + 'static)> {
        self.plugin.as_deref_mut()
    }
}

impl Drop for LoadedPlugin {
    fn drop(&mut self) {
        // 插件对象的代码位于库中，先销毁对象再释放库
        drop(self.plugin.take());
        if let Some(mut library) = self.library.take() {
            library.release_library();
        }
    }
}

/// 插件管理器
pub struct PluginManager {
    registry: &'static SharedRegistry,
    plugins: Vec<LoadedPlugin>,
}

impl PluginManager {
    /// 插件注册到进程默认注册表
    pub fn new() -> Self {
        Self::with_registry(TestFactoryRegistry::get_registry())
    }

    /// 插件注册到指定的全局注册表
    pub fn with_registry(registry: &'static SharedRegistry) -> Self {
        Self {
            registry,
            plugins: Vec::new(),
        }
    }

    /// 加载动态库插件并初始化
    pub fn load(&mut self, info: &PluginInfo) -> Result<()> {
        info!("Loading test plug-in: {}", info.library);
        let library = DynamicLibraryManager::new(&info.library)?;
        let address = library.find_symbol(PLUGIN_ENTRY_SYMBOL)?;

        // SAFETY: 入口符号由 export_test_plugin! 生成，签名为 PluginEntry；
        // 库在 LoadedPlugin 中保持加载，直到插件对象销毁之后
        let entry = unsafe { std::mem::transmute::<*mut c_void, PluginEntry>(address.as_ptr()) };
        let plugin = entry();

        self.install(info.clone(), plugin, Some(library))
    }

    /// 加载多个插件，遇到第一个失败即返回
    pub fn load_all(&mut self, plugins: &[PluginInfo]) -> Result<()> {
        plugins.iter().try_for_each(|info| self.load(info))
    }

    /// 安装静态链接的插件，走同样的生命周期
    pub fn add_builtin(&mut self, name: &str, plugin: Box<dyn TestPlugin>, parameters: Vec<String>) -> Result<()> {
        debug!("Installing built-in test plug-in: {}", name);
        self.install(PluginInfo::new(name, parameters), plugin, None)
    }

    fn install(
        &mut self,
        info: PluginInfo,
        plugin: Box<dyn TestPlugin>,
        library: Option<DynamicLibraryManager>,
    ) -> Result<()> {
        let mut loaded = LoadedPlugin {
            info,
            plugin: Some(plugin),
            library,
        };

        let parameters = loaded.info.parameters.clone();
        let registered_before = self.registry.lock().factory_names();
        let initialized = match loaded.plugin_mut() {
            Some(plugin) => plugin.initialize(&mut self.registry.lock(), &parameters),
            None => Ok(()),
        };

        if let Err(e) = initialized {
            warn!("Test plug-in {} failed to initialize: {}", loaded.info.library, e);
            self.discard_partial_registration(&mut loaded, &registered_before);
            return Err(RsUnitError::plugin(&loaded.info.library, &e.to_string()));
        }

        info!("Test plug-in initialized: {}", loaded.info.library);
        self.plugins.push(loaded);
        Ok(())
    }

    /// 初始化失败后清理插件已注册的工厂，必须在释放库之前完成。
    /// 先让插件自己反初始化，再移除它遗留的工厂。
    fn discard_partial_registration(&self, loaded: &mut LoadedPlugin, registered_before: &[String]) {
        let mut registry = self.registry.lock();
        if let Some(plugin) = loaded.plugin_mut() {
            plugin.uninitialize(&mut registry);
        }

        let leftovers: Vec<String> = registry
            .factory_names()
            .into_iter()
            .filter(|name| !registered_before.contains(name))
            .collect();
        for name in &leftovers {
            registry.unregister_factory(name);
            warn!(
                "Removed factory '{}' left behind by test plug-in {}",
                name, loaded.info.library
            );
        }
    }

    /// 所有插件向协调器挂载监听器（加载顺序）
    pub fn add_listeners(&mut self, coordinator: &RunCoordinator) {
        for loaded in &mut self.plugins {
            if let Some(plugin) = loaded.plugin_mut() {
                plugin.add_listener(coordinator);
            }
        }
    }

    /// 所有插件卸下监听器（逆序）
    pub fn remove_listeners(&mut self, coordinator: &RunCoordinator) {
        for loaded in self.plugins.iter_mut().rev() {
            if let Some(plugin) = loaded.plugin_mut() {
                plugin.remove_listener(coordinator);
            }
        }
    }

    /// 逆序反初始化并卸载全部插件
    pub fn unload_all(&mut self) {
        while let Some(mut loaded) = self.plugins.pop() {
            if let Some(plugin) = loaded.plugin_mut() {
                plugin.uninitialize(&mut self.registry.lock());
            }
            info!("Unloading test plug-in: {}", loaded.info.library);
            drop(loaded);
        }
    }

    /// 已加载插件的库路径（加载顺序）
    pub fn loaded_libraries(&self) -> Vec<String> {
        self.plugins.iter().map(|loaded| loaded.info.library.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PluginManager {
    fn drop(&mut self) {
        self.unload_all();
    }
}
