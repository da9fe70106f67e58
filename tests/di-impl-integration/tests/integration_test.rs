//! 组件注册表集成测试
use boot_common::{BootError, Configuration, RegistryError, ResolvedValue};
use boot_composition::BootBuilder;
use boot_di_abstractions::{ComponentDefinition, ComponentRegistry, RegistryOptions};
use boot_di::Registry;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// 数据库配置
#[derive(Debug, Clone, Deserialize, PartialEq)]
struct DbConfig {
    host: String,
}

/// 测试用数据库连接
#[derive(Debug)]
struct Connection {
    host: String,
}

fn connect(config: &DbConfig) -> Connection {
    Connection {
        host: config.host.clone(),
    }
}

#[test]
fn test_database_scenario() -> anyhow::Result<()> {
    let registry: Registry = Registry::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    let log = order.clone();
    registry.register("db.config", move |b| {
        b.resolve(move |_| {
            log.lock().push("db.config");
            Ok(DbConfig {
                host: "localhost".to_string(),
            })
        })
    });
    let log = order.clone();
    registry.register("db.connection", move |b| {
        b.requires(["db.config"]).resolve(move |ctx| {
            log.lock().push("db.connection");
            let config = ctx.lookup::<DbConfig>("db.config")?;
            Ok(connect(&config))
        })
    });

    registry.resolve(["db.connection"], &Configuration::new())?;

    assert_eq!(*order.lock(), ["db.config", "db.connection"]);
    assert_eq!(registry.lookup::<Connection>("db.connection")?.host, "localhost");
    assert!(registry.is_resolved("db.config"));
    Ok(())
}

#[test]
fn test_unknown_name_errors() {
    let registry: Registry = Registry::new();
    registry.register("known", |b| b);

    match registry.resolve(["unknown"], &Configuration::new()) {
        Err(RegistryError::DefinitionNotFound { name, registered }) => {
            assert_eq!(name, "unknown");
            assert_eq!(registered, ["known"]);
        }
        other => panic!("应为 DefinitionNotFound: {:?}", other),
    }

    match registry.lookup_value("unknown") {
        Err(RegistryError::ValueNotResolved { name, resolved }) => {
            assert_eq!(name, "unknown");
            assert!(resolved.is_empty());
        }
        other => panic!("应为 ValueNotResolved: {:?}", other),
    }
}

#[test]
fn test_run_only_component_executes_once() {
    let registry: Registry = Registry::new();
    let journal = Arc::new(Mutex::new(Vec::new()));

    let log = journal.clone();
    registry.register("audit", move |b| {
        b.run(move |_| {
            log.lock().push("booted".to_string());
            Ok(())
        })
    });

    let configuration = Configuration::new();
    registry.resolve(["audit"], &configuration).unwrap();
    registry.resolve(["audit"], &configuration).unwrap();

    assert_eq!(journal.lock().len(), 1);
    let value = registry.lookup_value("audit").unwrap();
    assert!(value.is_empty());
}

#[test]
fn test_run_suppresses_resolve() {
    let registry: Registry = Registry::new();
    let resolve_calls = Arc::new(AtomicUsize::new(0));

    let counter = resolve_calls.clone();
    registry.register("worker", move |b| {
        b.resolve(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok("never")
        })
        .run(|_| Ok(()))
    });

    let value = registry
        .resolve_one("worker", &Configuration::new())
        .unwrap();

    assert!(value.is_empty());
    assert_eq!(resolve_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_reset_re_executes_everything() {
    let registry: Registry = Registry::new();
    let executions = Arc::new(AtomicUsize::new(0));

    let counter = executions.clone();
    registry.register("base", move |b| {
        b.run(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    });
    let counter = executions.clone();
    registry.register("top", move |b| {
        b.requires(["base"]).run(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    });

    let configuration = Configuration::new();
    registry.resolve(["top"], &configuration).unwrap();
    assert_eq!(executions.load(Ordering::SeqCst), 2);

    registry.reset();
    assert!(registry.resolved_names().is_empty());
    assert!(registry.is_registered("top"));

    registry.resolve(["top"], &configuration).unwrap();
    assert_eq!(executions.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_concurrent_resolution_executes_once() {
    let registry: Arc<Registry> = Arc::new(Registry::new());
    let executions = Arc::new(AtomicUsize::new(0));

    let counter = executions.clone();
    registry.register("slow", move |b| {
        b.resolve(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(50));
            Ok(String::from("ready"))
        })
    });

    let configuration = Arc::new(Configuration::new());
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = registry.clone();
            let configuration = configuration.clone();
            tokio::task::spawn_blocking(move || {
                registry.resolve_one("slow", configuration.as_ref())
            })
        })
        .collect();

    let mut values = Vec::new();
    for handle in handles {
        values.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(executions.load(Ordering::SeqCst), 1);
    let first = &values[0];
    assert!(values.iter().all(|value| value.ptr_eq(first)));
    assert_eq!(registry.stats().executions, 1);
}

#[test]
fn test_failure_leaves_no_entry_and_aborts() {
    let registry: Registry = Registry::new();
    let attempts = Arc::new(AtomicUsize::new(0));
    let later = Arc::new(AtomicUsize::new(0));

    let counter = attempts.clone();
    registry.register("flaky", move |b| {
        b.resolve(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("首次连接失败".into())
            } else {
                Ok(7_u32)
            }
        })
    });
    let counter = later.clone();
    registry.register("later", move |b| {
        b.run(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    });

    let configuration = Configuration::new();
    let result = registry.resolve(["flaky", "later"], &configuration);
    assert!(matches!(result, Err(RegistryError::HookFailed { .. })));
    assert!(!registry.is_resolved("flaky"));
    assert_eq!(later.load(Ordering::SeqCst), 0);

    registry.resolve(["flaky", "later"], &configuration).unwrap();
    assert_eq!(*registry.lookup::<u32>("flaky").unwrap(), 7);
    assert_eq!(later.load(Ordering::SeqCst), 1);
    assert_eq!(registry.stats().resolution_errors, 1);
}

#[test]
fn test_mark_resolved_preempts_definition() {
    let registry: Registry = Registry::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = calls.clone();
    registry.register("clock", move |b| {
        b.resolve(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(0_u64)
        })
    });

    registry
        .mark_resolved("clock", ResolvedValue::new(1_700_000_000_u64))
        .unwrap();
    registry
        .resolve(["clock"], &Configuration::new())
        .unwrap();

    assert_eq!(*registry.lookup::<u64>("clock").unwrap(), 1_700_000_000);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cycle_is_reported() {
    let registry: Registry = Registry::new();
    registry.register("a", |b| b.requires(["b"]));
    registry.register("b", |b| b.requires(["a"]));

    match registry.resolve(["a"], &Configuration::new()) {
        Err(RegistryError::CircularDependency { chain }) => assert_eq!(chain, "a -> b -> a"),
        other => panic!("应检测到循环依赖: {:?}", other),
    }
    assert!(registry.validate().is_err());
}

#[test]
fn test_registry_as_trait_object() {
    let registry: Arc<dyn ComponentRegistry<Configuration>> =
        Arc::new(Registry::with_options(RegistryOptions::default()));

    registry.register_definition(
        ComponentDefinition::builder("greeting")
            .resolve(|_| Ok(String::from("hello")))
            .build(),
    );

    let value = registry
        .resolve_in_chain("greeting", &Configuration::new(), &Default::default())
        .unwrap();
    assert_eq!(value.downcast::<String>().unwrap().as_str(), "hello");
    assert_eq!(registry.resolved_names(), ["greeting"]);
}

#[tokio::test]
async fn test_boot_with_layered_configuration() -> anyhow::Result<()> {
    let builder = BootBuilder::new()
        .add_config_value(json!({ "db": { "host": "db.internal" } }))
        .boot_component("db.connection");

    builder.registry().register("db.config", |b| {
        b.resolve(|ctx| Ok(ctx.configuration().bind::<DbConfig>("db")?))
    });
    builder.registry().register("db.connection", |b| {
        b.requires(["db.config"]).resolve(|ctx| {
            let config = ctx.lookup::<DbConfig>("db.config")?;
            Ok(connect(&config))
        })
    });

    let bootstrapper = builder.build()?;
    bootstrapper.boot_async().await?;

    assert_eq!(
        bootstrapper.lookup::<Connection>("db.connection")?.host,
        "db.internal"
    );
    Ok(())
}

#[test]
fn test_boot_reports_missing_configuration() {
    let builder = BootBuilder::new().boot_component("db.config");
    builder.registry().register("db.config", |b| {
        b.resolve(|ctx| Ok(ctx.configuration().bind::<DbConfig>("db")?))
    });

    let bootstrapper = builder.build().unwrap();
    match bootstrapper.boot() {
        Err(BootError::Registry {
            source: RegistryError::HookFailed { component, .. },
        }) => {
            assert_eq!(component, "db.config")
        }
        other => panic!("应为 HookFailed: {:?}", other),
    }
}
