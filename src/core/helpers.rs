//! 夹具辅助工具
//!
//! 把夹具类型和它的测试方法组装成用例与套件，并注册到全局注册表。
//!
//! 没有加载期的静态自注册：宿主程序需要在构建 [`TestRunner`](crate::TestRunner)
//! 之前调用 [`AutoRegisterSuite::register`]（或 `register_in`），插件则在
//! `initialize` 中注册。

use super::fault::CheckResult;
use super::registry::{TestFactory, TestFactoryRegistry};
use super::test::{Fixture, FixtureInstance, Test, TestBody, TestCase, TestSuite};
use crate::Result;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// 夹具上的测试方法
pub type TestMethod<F> = fn(&mut F) -> CheckResult;

/// 夹具构造函数
pub type FixtureFactory<F> = Arc<dyn Fn() -> F + Send + Sync>;

/// 调用夹具上的单个测试方法，每次运行都构造新的夹具
pub struct TestCaller<F> {
    name: String,
    factory: FixtureFactory<F>,
    method: TestMethod<F>,
}

impl<F: Fixture + Default> TestCaller<F> {
    pub fn new(name: &str, method: TestMethod<F>) -> Self {
        Self::with_factory(name, Arc::new(F::default), method)
    }
}

impl<F: Fixture> TestCaller<F> {
    /// 使用自定义构造函数
    pub fn with_factory(name: &str, factory: FixtureFactory<F>, method: TestMethod<F>) -> Self {
        Self {
            name: name.to_string(),
            factory,
            method,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 转换为叶子用例
    pub fn into_case(self) -> TestCase {
        let name = self.name.clone();
        TestCase::new(&name, Box::new(self))
    }
}

impl<F: Fixture> From<TestCaller<F>> for Test<'_> {
    fn from(caller: TestCaller<F>) -> Self {
        Test::Case(caller.into_case())
    }
}

impl<F: Fixture> TestBody for TestCaller<F> {
    fn instantiate(&self) -> Box<dyn FixtureInstance + '_> {
        Box::new(CallerInstance {
            fixture: (self.factory)(),
            method: self.method,
        })
    }
}

struct CallerInstance<F> {
    fixture: F,
    method: TestMethod<F>,
}

impl<F: Fixture> FixtureInstance for CallerInstance<F> {
    fn set_up(&mut self) -> CheckResult {
        self.fixture.set_up()
    }

    fn run_test(&mut self) -> CheckResult {
        (self.method)(&mut self.fixture)
    }

    fn tear_down(&mut self) -> CheckResult {
        self.fixture.tear_down()
    }
}

/// 夹具套件构建器
///
/// 用例名称为 `夹具名::方法名`。
pub struct TestSuiteBuilder<F> {
    fixture_name: String,
    factory: FixtureFactory<F>,
    suite: TestSuite<'static>,
}

impl<F: Fixture + Default> TestSuiteBuilder<F> {
    pub fn new(fixture_name: &str) -> Self {
        Self::with_factory(fixture_name, Arc::new(F::default))
    }
}

impl<F: Fixture> TestSuiteBuilder<F> {
    pub fn with_factory(fixture_name: &str, factory: FixtureFactory<F>) -> Self {
        Self {
            fixture_name: fixture_name.to_string(),
            factory,
            suite: TestSuite::new(fixture_name),
        }
    }

    pub fn fixture_name(&self) -> &str {
        &self.fixture_name
    }

    /// 完整用例名称
    pub fn test_name_for(&self, method_name: &str) -> String {
        format!("{}::{}", self.fixture_name, method_name)
    }

    /// 追加一个夹具方法
    pub fn add_test(mut self, method_name: &str, method: TestMethod<F>) -> Self {
        let name = self.test_name_for(method_name);
        let caller = TestCaller::with_factory(&name, Arc::clone(&self.factory), method);
        self.suite.add_test(caller.into());
        self
    }

    /// 追加任意测试（例如子套件）
    pub fn add_custom(mut self, test: Test<'static>) -> Self {
        self.suite.add_test(test);
        self
    }

    pub fn build(self) -> Test<'static> {
        Test::Suite(self.suite)
    }
}

/// 自带测试方法表的夹具
pub trait FixtureSuite: Fixture + Default {
    /// 套件名称
    fn suite_name() -> &'static str;

    /// 列出测试方法
    fn add_tests(builder: TestSuiteBuilder<Self>) -> TestSuiteBuilder<Self>;

    /// 构建该夹具的套件
    fn suite() -> Test<'static> {
        Self::add_tests(TestSuiteBuilder::new(Self::suite_name())).build()
    }
}

/// 为 [`FixtureSuite`] 生成套件的工厂
pub struct TestSuiteFactory<S> {
    _suite: PhantomData<fn() -> S>,
}

impl<S: FixtureSuite> TestSuiteFactory<S> {
    pub fn new() -> Self {
        Self { _suite: PhantomData }
    }
}

impl<S: FixtureSuite> Default for TestSuiteFactory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: FixtureSuite> TestFactory for TestSuiteFactory<S> {
    fn make_test(&self) -> Test<'static> {
        S::suite()
    }
}

/// 一次调用完成套件到全局注册表的注册
///
/// 注册必须在从注册表组装测试树之前完成，之后注册的套件不会出现在
/// 已经组装好的树中。
pub struct AutoRegisterSuite;

impl AutoRegisterSuite {
    /// 注册到默认注册表
    pub fn register<S: FixtureSuite>() -> Result<()> {
        Self::register_into::<S>(TestFactoryRegistry::get_registry())
    }

    /// 注册到具名注册表
    pub fn register_in<S: FixtureSuite>(registry_name: &str) -> Result<()> {
        Self::register_into::<S>(TestFactoryRegistry::get_named_registry(registry_name))
    }

    /// 把具名注册表挂到另一个具名注册表下
    pub fn register_registry(parent: &str, child: &str) -> Result<()> {
        TestFactoryRegistry::get_named_registry(parent)
            .lock()
            .register_registry(child)
    }

    fn register_into<S: FixtureSuite>(registry: &parking_lot::Mutex<TestFactoryRegistry>) -> Result<()> {
        let mut registry = registry.lock();
        registry.register_factory(S::suite_name(), Box::new(TestSuiteFactory::<S>::new()))?;
        debug!("Auto-registered suite '{}' in '{}'", S::suite_name(), registry.name());
        Ok(())
    }
}
