//! 插件生命周期：安装 → 挂载监听器 → 运行 → 卸载

use parking_lot::Mutex;
use rsunit::{
    Asserter, CheckResult, DefaultTestPlugin, PluginInfo, PluginManager, Result, RsUnitError, RunCoordinator,
    Test, TestFactoryRegistry, TestListener, TestPlugin, TestRunner,
};
use std::sync::Arc;

fn register_arithmetic(registry: &mut TestFactoryRegistry) -> Result<()> {
    registry.register_factory(
        "Arithmetic",
        Box::new(|| {
            Test::suite(
                "Arithmetic",
                [
                    Test::case("Arithmetic::adds", || -> CheckResult { Asserter::assert_equal(&4, &(2 + 2)) }),
                    Test::case("Arithmetic::wraps", || -> CheckResult {
                        Asserter::assert_equal(&0u8, &255u8.wrapping_add(1))
                    }),
                ],
            )
        }),
    )
}

fn register_nothing(_: &mut TestFactoryRegistry) -> Result<()> {
    Ok(())
}

/// 统计用例数量的监听器
#[derive(Default)]
struct CaseCounter {
    cases: Mutex<usize>,
}

impl TestListener for CaseCounter {
    fn start_test(&self, _test: &Test<'_>) {
        *self.cases.lock() += 1;
    }
}

struct CountingPlugin {
    inner: DefaultTestPlugin,
    counter: Arc<CaseCounter>,
    events: Arc<Mutex<Vec<String>>>,
}

impl TestPlugin for CountingPlugin {
    fn initialize(&mut self, registry: &mut TestFactoryRegistry, parameters: &[String]) -> Result<()> {
        self.events.lock().push(format!("initialize {:?}", parameters));
        self.inner.initialize(registry, parameters)
    }

    fn add_listener(&mut self, coordinator: &RunCoordinator) {
        self.events.lock().push("add_listener".to_string());
        coordinator.add_listener(self.counter.clone());
    }

    fn remove_listener(&mut self, coordinator: &RunCoordinator) {
        self.events.lock().push("remove_listener".to_string());
        let listener: Arc<dyn TestListener> = self.counter.clone();
        coordinator.remove_listener(&listener);
    }

    fn uninitialize(&mut self, registry: &mut TestFactoryRegistry) {
        self.events.lock().push("uninitialize".to_string());
        self.inner.uninitialize(registry);
    }
}

#[test]
fn builtin_plugin_contributes_tests_and_listener() {
    let registry = TestFactoryRegistry::get_named_registry("plugin_flow.builtin");
    let counter = Arc::new(CaseCounter::default());
    let events = Arc::new(Mutex::new(Vec::new()));

    let mut plugins = PluginManager::with_registry(registry);
    plugins
        .add_builtin(
            "arithmetic",
            Box::new(CountingPlugin {
                inner: DefaultTestPlugin::new("ArithmeticPlugIn", register_arithmetic),
                counter: counter.clone(),
                events: events.clone(),
            }),
            vec!["verbose".to_string()],
        )
        .unwrap();
    assert_eq!(plugins.loaded_libraries(), vec!["arithmetic".to_string()]);
    assert!(registry.lock().contains("ArithmeticPlugIn"));

    let collector = {
        let runner = TestRunner::from_registry(&registry.lock());
        plugins.add_listeners(runner.coordinator());
        let collector = runner
            .run(Some("plugin_flow.builtin/ArithmeticPlugIn/Arithmetic"), None)
            .unwrap();
        plugins.remove_listeners(runner.coordinator());
        assert_eq!(runner.coordinator().listener_count(), 0);
        collector
    };

    assert_eq!(collector.run_tests(), 2);
    assert!(collector.was_successful());
    assert_eq!(*counter.cases.lock(), 2);

    plugins.unload_all();
    assert!(plugins.is_empty());
    assert!(registry.lock().is_empty());
    assert_eq!(
        *events.lock(),
        vec![
            "initialize [\"verbose\"]",
            "add_listener",
            "remove_listener",
            "uninitialize"
        ]
    );
}

#[test]
fn plugins_with_the_same_name_are_rejected() {
    let registry = TestFactoryRegistry::get_named_registry("plugin_flow.duplicate");
    let mut plugins = PluginManager::with_registry(registry);

    plugins
        .add_builtin("first", Box::new(DefaultTestPlugin::new("Twin", register_nothing)), Vec::new())
        .unwrap();
    let error = plugins
        .add_builtin("second", Box::new(DefaultTestPlugin::new("Twin", register_nothing)), Vec::new())
        .unwrap_err();

    assert!(matches!(&error, RsUnitError::Plugin { library, .. } if library == "second"));
    assert_eq!(plugins.len(), 1);

    drop(plugins);
    assert!(registry.lock().is_empty());
}

#[test]
fn missing_library_fails_to_load() {
    let registry = TestFactoryRegistry::get_named_registry("plugin_flow.missing");
    let mut plugins = PluginManager::with_registry(registry);

    let error = plugins
        .load_all(&[PluginInfo::new("/nonexistent/librsunit_missing_plugin.so", Vec::new())])
        .unwrap_err();

    assert!(matches!(error, RsUnitError::DynamicLibrary(_)));
    assert!(error.is_plugin_failure());
    assert!(plugins.is_empty());
}

#[test]
fn plugin_tokens_parse_parameters() {
    let info = PluginInfo::parse_token("libclocker_plugin.so=\"text\"").unwrap();
    assert_eq!(info, PluginInfo::new("libclocker_plugin.so", vec!["text".to_string()]));

    let bare = PluginInfo::parse_token("libclocker_plugin.so").unwrap();
    assert!(bare.parameters.is_empty());
}
