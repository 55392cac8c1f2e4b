//! 测试工厂注册表
//!
//! 按名称保存测试工厂，并按注册顺序组装成可运行的套件。
//! 进程级注册表（默认注册表与具名注册表）是全局可变状态：
//! 静态自注册发生在任何入口函数之前，没有其他可以挂靠的位置。

use super::test::{Test, TestSuite};
use crate::{Result, RsUnitError};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// 默认注册表名称
pub const DEFAULT_REGISTRY_NAME: &str = "All Tests";

/// 测试工厂
pub trait TestFactory: Send + Sync {
    /// 创建一个新的测试，所有权交给调用者
    fn make_test(&self) -> Test<'static>;
}

impl<F> TestFactory for F
where
    F: Fn() -> Test<'static> + Send + Sync,
{
    fn make_test(&self) -> Test<'static> {
        self()
    }
}

/// 全局注册表句柄
pub type SharedRegistry = Mutex<TestFactoryRegistry>;

/// 默认注册表
static DEFAULT_REGISTRY: Lazy<SharedRegistry> =
    Lazy::new(|| Mutex::new(TestFactoryRegistry::new(DEFAULT_REGISTRY_NAME)));

/// 具名注册表。创建后永不销毁（有意泄漏），以便返回 `'static` 引用。
static NAMED_REGISTRIES: Lazy<Mutex<HashMap<String, &'static SharedRegistry>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// 匿名注册的序号，进程内单调递增
static SERIAL_NUMBER: AtomicUsize = AtomicUsize::new(1);

/// 测试工厂注册表
pub struct TestFactoryRegistry {
    /// 注册表名称（也是组装出的套件名称）
    name: String,
    /// 按注册顺序保存的工厂
    factories: Vec<(String, Box<dyn TestFactory>)>,
}

impl TestFactoryRegistry {
    /// 创建独立的注册表（不进入全局表）
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            factories: Vec::new(),
        }
    }

    /// 进程级默认注册表
    pub fn get_registry() -> &'static SharedRegistry {
        &DEFAULT_REGISTRY
    }

    /// 进程级具名注册表，首次访问时创建
    pub fn get_named_registry(name: &str) -> &'static SharedRegistry {
        let mut registries = NAMED_REGISTRIES.lock();
        if let Some(registry) = registries.get(name) {
            return registry;
        }

        let registry: &'static SharedRegistry = Box::leak(Box::new(Mutex::new(Self::new(name))));
        registries.insert(name.to_string(), registry);
        debug!("Created named test registry: {}", name);
        registry
    }

    /// 注册表名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 以指定名称注册工厂
    ///
    /// 同一名称重复注册会被拒绝，已注册的工厂保持不变。
    pub fn register_factory(&mut self, name: &str, factory: Box<dyn TestFactory>) -> Result<()> {
        if self.contains(name) {
            return Err(RsUnitError::DuplicateFactory {
                registry: self.name.clone(),
                name: name.to_string(),
            });
        }

        self.factories.push((name.to_string(), factory));
        debug!("Registered test factory '{}' in registry '{}'", name, self.name);
        Ok(())
    }

    /// 以自动生成的唯一名称注册工厂，返回生成的名称
    pub fn register_anonymous_factory(&mut self, factory: Box<dyn TestFactory>) -> Result<String> {
        let name = format!("@Dummy@{}", SERIAL_NUMBER.fetch_add(1, Ordering::Relaxed));
        self.register_factory(&name, factory)?;
        Ok(name)
    }

    /// 注册一个在组装时构建具名全局注册表套件的工厂
    pub fn register_registry(&mut self, registry_name: &str) -> Result<()> {
        let target = registry_name.to_string();
        self.register_factory(
            registry_name,
            Box::new(move || TestFactoryRegistry::get_named_registry(&target).lock().make_test()),
        )
    }

    /// 注销工厂，返回被移除的工厂
    pub fn unregister_factory(&mut self, name: &str) -> Option<Box<dyn TestFactory>> {
        let index = self.factories.iter().position(|(key, _)| key == name)?;
        let (_, factory) = self.factories.remove(index);
        debug!("Unregistered test factory '{}' from registry '{}'", name, self.name);
        Some(factory)
    }

    /// 是否已注册
    pub fn contains(&self, name: &str) -> bool {
        self.factories.iter().any(|(key, _)| key == name)
    }

    /// 已注册的工厂名称（注册顺序）
    pub fn factory_names(&self) -> Vec<String> {
        self.factories.iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// 组装套件：每个工厂产出的测试按注册顺序成为子节点
    pub fn make_test(&self) -> Test<'static> {
        let mut suite = TestSuite::new(&self.name);
        self.add_test_to_suite(&mut suite);
        info!(
            "Assembled suite '{}' from {} factories",
            self.name,
            self.factories.len()
        );
        Test::Suite(suite)
    }

    /// 把所有工厂产出的测试追加到已有套件
    pub fn add_test_to_suite(&self, suite: &mut TestSuite<'static>) {
        for (_, factory) in &self.factories {
            suite.add_test(factory.make_test());
        }
    }
}

impl TestFactory for TestFactoryRegistry {
    fn make_test(&self) -> Test<'static> {
        TestFactoryRegistry::make_test(self)
    }
}
