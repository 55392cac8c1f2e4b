//! 测试树
//!
//! 测试节点是封闭的三种形态：叶子用例、组合套件和装饰器。
//! 套件独占其子节点；装饰器只借用被包装的测试，所有操作都转发给它。

use super::coordinator::{RunCoordinator, Stage};
use super::fault::CheckResult;
use std::fmt;

/// 测试夹具
///
/// 每次运行都会创建新的夹具实例，`set_up` → 测试方法 → `tear_down`。
pub trait Fixture: Send + 'static {
    /// 准备夹具
    fn set_up(&mut self) -> CheckResult {
        Ok(())
    }

    /// 清理夹具
    fn tear_down(&mut self) -> CheckResult {
        Ok(())
    }
}

/// 单次运行中的夹具实例
pub trait FixtureInstance {
    fn set_up(&mut self) -> CheckResult;
    fn run_test(&mut self) -> CheckResult;
    fn tear_down(&mut self) -> CheckResult;
}

/// 叶子用例的可执行体：每次运行产生一个新的夹具实例
pub trait TestBody: Send + Sync {
    fn instantiate(&self) -> Box<dyn FixtureInstance + '_>;
}

/// 闭包形式的测试体，没有夹具
struct FnBody<F> {
    body: F,
}

struct FnInstance<'a, F> {
    body: &'a F,
}

impl<F> TestBody for FnBody<F>
where
    F: Fn() -> CheckResult + Send + Sync,
{
    fn instantiate(&self) -> Box<dyn FixtureInstance + '_> {
        Box::new(FnInstance { body: &self.body })
    }
}

impl<F> FixtureInstance for FnInstance<'_, F>
where
    F: Fn() -> CheckResult,
{
    fn set_up(&mut self) -> CheckResult {
        Ok(())
    }

    fn run_test(&mut self) -> CheckResult {
        (self.body)()
    }

    fn tear_down(&mut self) -> CheckResult {
        Ok(())
    }
}

/// 叶子用例
pub struct TestCase {
    name: String,
    body: Box<dyn TestBody>,
}

impl TestCase {
    pub fn new(name: &str, body: Box<dyn TestBody>) -> Self {
        Self {
            name: name.to_string(),
            body,
        }
    }

    /// 以闭包创建用例
    pub fn from_fn<F>(name: &str, body: F) -> Self
    where
        F: Fn() -> CheckResult + Send + Sync + 'static,
    {
        Self::new(name, Box::new(FnBody { body }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 执行夹具生命周期。setUp 失败时跳过测试体，tearDown 总会执行。
    fn run_fixture(&self, test: &Test<'_>, coordinator: &RunCoordinator) {
        let instance = coordinator.protect(test, Stage::Construction, || Ok(self.body.instantiate()));
        let Some(mut instance) = instance else {
            return;
        };

        if coordinator
            .protect(test, Stage::SetUp, || instance.set_up())
            .is_some()
        {
            coordinator.protect(test, Stage::Body, || instance.run_test());
        }
        coordinator.protect(test, Stage::TearDown, || instance.tear_down());
    }
}

/// 组合套件
pub struct TestSuite<'a> {
    name: String,
    tests: Vec<Test<'a>>,
}

impl<'a> TestSuite<'a> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tests: Vec::new(),
        }
    }

    /// 追加子测试，子测试按追加顺序运行
    pub fn add_test(&mut self, test: Test<'a>) {
        self.tests.push(test);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tests(&self) -> &[Test<'a>] {
        &self.tests
    }

    /// 删除所有子测试
    pub fn delete_contents(&mut self) {
        self.tests.clear();
    }
}

/// 装饰器：借用被包装的测试并转发全部操作
pub struct TestDecorator<'a> {
    test: &'a Test<'a>,
}

impl<'a> TestDecorator<'a> {
    pub fn new(test: &'a Test<'a>) -> Self {
        Self { test }
    }

    pub fn inner(&self) -> &'a Test<'a> {
        self.test
    }
}

/// 测试节点
pub enum Test<'a> {
    /// 叶子用例
    Case(TestCase),
    /// 组合套件
    Suite(TestSuite<'a>),
    /// 装饰器
    Decorator(TestDecorator<'a>),
}

impl<'a> Test<'a> {
    /// 闭包用例的简写
    pub fn case<F>(name: &str, body: F) -> Self
    where
        F: Fn() -> CheckResult + Send + Sync + 'static,
    {
        Self::Case(TestCase::from_fn(name, body))
    }

    /// 由子测试构造套件
    pub fn suite<I>(name: &str, tests: I) -> Self
    where
        I: IntoIterator<Item = Test<'a>>,
    {
        let mut suite = TestSuite::new(name);
        for test in tests {
            suite.add_test(test);
        }
        Self::Suite(suite)
    }

    /// 包装一个已有测试
    pub fn decorate(test: &'a Test<'a>) -> Self {
        Self::Decorator(TestDecorator::new(test))
    }

    /// 测试名称
    pub fn name(&self) -> &str {
        match self {
            Self::Case(case) => case.name(),
            Self::Suite(suite) => suite.name(),
            Self::Decorator(decorator) => decorator.inner().name(),
        }
    }

    /// 叶子用例数量
    pub fn count_test_cases(&self) -> usize {
        match self {
            Self::Case(_) => 1,
            Self::Suite(suite) => suite.tests().iter().map(Test::count_test_cases).sum(),
            Self::Decorator(decorator) => decorator.inner().count_test_cases(),
        }
    }

    /// 直接子测试数量
    pub fn child_test_count(&self) -> usize {
        match self {
            Self::Case(_) => 0,
            Self::Suite(suite) => suite.tests().len(),
            Self::Decorator(decorator) => decorator.inner().child_test_count(),
        }
    }

    /// 第 `index` 个子测试
    pub fn child_test_at(&self, index: usize) -> Option<&Test<'a>> {
        match self {
            Self::Case(_) => None,
            Self::Suite(suite) => suite.tests().get(index),
            Self::Decorator(decorator) => decorator.inner().child_test_at(index),
        }
    }

    /// 按 `/` 分隔的名称路径查找子树。路径可以以根自身的名称开头。
    pub fn find_test_by_path(&self, path: &str) -> Option<&Test<'a>> {
        let mut components = path.split('/').filter(|part| !part.is_empty()).peekable();
        if components.peek() == Some(&self.name()) {
            components.next();
        }

        let mut current = self;
        for component in components {
            current = (0..current.child_test_count())
                .filter_map(move |index| current.child_test_at(index))
                .find(|child| child.name() == component)?;
        }
        Some(current)
    }

    /// 在协调器下运行本节点
    pub fn run(&self, coordinator: &RunCoordinator) {
        match self {
            Self::Case(case) => {
                if coordinator.should_stop() {
                    return;
                }
                coordinator.start_test(self);
                case.run_fixture(self, coordinator);
                coordinator.end_test(self);
            }
            Self::Suite(suite) => {
                coordinator.start_suite(self);
                for child in suite.tests() {
                    if coordinator.should_stop() {
                        break;
                    }
                    child.run(coordinator);
                }
                coordinator.end_suite(self);
            }
            Self::Decorator(decorator) => decorator.inner().run(coordinator),
        }
    }
}

impl fmt::Debug for Test<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Case(case) => f.debug_tuple("Case").field(&case.name()).finish(),
            Self::Suite(suite) => f
                .debug_struct("Suite")
                .field("name", &suite.name())
                .field("tests", &suite.tests())
                .finish(),
            Self::Decorator(decorator) => f.debug_tuple("Decorator").field(decorator.inner()).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passing(name: &str) -> Test<'static> {
        Test::case(name, || Ok(()))
    }

    fn sample_tree() -> Test<'static> {
        Test::suite(
            "All Tests",
            [
                Test::suite("MathTest", [passing("test_add"), passing("test_sub")]),
                Test::suite("StringTest", [passing("test_concat")]),
                passing("standalone"),
            ],
        )
    }

    #[test]
    fn test_composite_count_is_sum_of_children() {
        let tree = sample_tree();
        assert_eq!(tree.count_test_cases(), 4);
        assert_eq!(tree.child_test_count(), 3);
        assert_eq!(tree.child_test_at(1).unwrap().count_test_cases(), 1);
    }

    #[test]
    fn test_decorator_forwards_everything() {
        let tree = sample_tree();
        let decorator = Test::decorate(&tree);
        assert_eq!(decorator.name(), "All Tests");
        assert_eq!(decorator.count_test_cases(), 4);
        assert_eq!(decorator.child_test_at(0).unwrap().name(), "MathTest");
    }

    #[test]
    fn test_find_test_by_path() {
        let tree = sample_tree();
        assert_eq!(tree.find_test_by_path("MathTest/test_sub").unwrap().name(), "test_sub");
        assert_eq!(
            tree.find_test_by_path("All Tests/StringTest").unwrap().name(),
            "StringTest"
        );
        assert_eq!(tree.find_test_by_path("").unwrap().name(), "All Tests");
        assert!(tree.find_test_by_path("MathTest/test_mul").is_none());
    }

    #[test]
    fn test_suite_delete_contents() {
        let mut suite = TestSuite::new("empty");
        suite.add_test(passing("a"));
        suite.delete_contents();
        assert_eq!(Test::Suite(suite).count_test_cases(), 0);
    }
}
