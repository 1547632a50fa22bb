use modrouter::hot_reload::{reload_config, watch_config};
use modrouter::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;

mod common;
use common::engine::get;
use common::fixtures;

struct Wired {
    source: Arc<FileConfigSource>,
    resolver: RouteResolver,
}

fn wire(root: &std::path::Path) -> Wired {
    let config = Arc::new(FrameworkConfig::load_from_dir(root).unwrap());
    let source = Arc::new(FileConfigSource::new(root));
    let modules = Arc::new(ModuleResolver::from_source(source.as_ref(), &config).unwrap());
    let catalog = Arc::new(RouteCatalog::new(
        Arc::clone(&source) as Arc<dyn ConfigSource>,
        Arc::clone(&config),
    ));
    Wired {
        source,
        resolver: RouteResolver::new(config, modules, catalog),
    }
}

fn handler_for(resolver: &RouteResolver, url: &str) -> Option<String> {
    let request = get(url);
    let module = resolver.modules().resolve(&request.host, &request.path);
    resolver.resolve(&module, &request, false).ok().map(|r| r.handler_id)
}

#[test]
fn test_reload_publishes_new_tables() {
    let dir = fixtures::config_dir();
    let w = wire(dir.path());
    assert_eq!(handler_for(&w.resolver, "http://admin.example.com/users/7").as_deref(), Some("users.ShowLoad"));

    fixtures::write(
        dir.path(),
        "admin/routes.yaml",
        "users:\n  - route: \"[:id]\"\n    action: loads.users.detail\n",
    );
    // cached until reloaded
    assert_eq!(handler_for(&w.resolver, "http://admin.example.com/users/7").as_deref(), Some("users.ShowLoad"));

    let names = reload_config(w.source.as_ref(), w.resolver.modules(), w.resolver.catalog()).unwrap();
    assert!(names.contains(&"admin".to_string()));
    assert_eq!(handler_for(&w.resolver, "http://admin.example.com/users/7").as_deref(), Some("users.DetailLoad"));
}

#[test]
fn test_reload_picks_up_new_module() {
    let dir = fixtures::config_dir();
    let w = wire(dir.path());
    assert_eq!(w.resolver.modules().resolve("blog.example.com", "/").name, "shop");

    let modules = fixtures::MODULES_YAML.replace("\ndomain:", "\n  blog:\n    dir: blog\ndomain:");
    fixtures::write(dir.path(), "modules.yaml", &modules);
    reload_config(w.source.as_ref(), w.resolver.modules(), w.resolver.catalog()).unwrap();
    assert_eq!(w.resolver.modules().resolve("blog.example.com", "/").name, "blog");
}

#[test]
fn test_broken_table_is_rejected() {
    let dir = fixtures::config_dir();
    let w = wire(dir.path());
    assert!(handler_for(&w.resolver, "http://admin.example.com/users/7").is_some());

    fixtures::write(
        dir.path(),
        "admin/routes.yaml",
        "users:\n  - route: list\n    constraints:\n      id: \"[0-9]+\"\n    action: loads.users.list\n",
    );
    let err = reload_config(w.source.as_ref(), w.resolver.modules(), w.resolver.catalog()).unwrap_err();
    assert!(format!("{err:#}").contains("routes:admin"));
    assert_eq!(handler_for(&w.resolver, "http://admin.example.com/users/7").as_deref(), Some("users.ShowLoad"));
}

#[test]
fn test_watch_config_reload() {
    let dir = fixtures::config_dir();
    let w = wire(dir.path());
    let outcomes: Arc<Mutex<Vec<Result<Vec<String>, String>>>> = Arc::new(Mutex::new(Vec::new()));
    let outcomes_clone = Arc::clone(&outcomes);

    let watcher = watch_config(
        Arc::clone(&w.source) as Arc<dyn ConfigSource>,
        Arc::clone(w.resolver.modules()),
        Arc::clone(w.resolver.catalog()),
        move |outcome| {
            let recorded = match outcome {
                Ok(names) => Ok(names.clone()),
                Err(e) => Err(format!("{e:#}")),
            };
            outcomes_clone.lock().unwrap().push(recorded);
        },
    )
    .expect("watch_config");

    // allow watcher thread to start
    std::thread::sleep(Duration::from_millis(100));

    fixtures::write(
        dir.path(),
        "admin/routes.yaml",
        "users:\n  - route: \"[:id]\"\n    action: loads.users.detail\n",
    );

    for _ in 0..40 {
        let reloaded = outcomes.lock().unwrap().iter().any(Result::is_ok);
        if reloaded && handler_for(&w.resolver, "http://admin.example.com/users/7").as_deref() == Some("users.DetailLoad") {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    assert_eq!(handler_for(&w.resolver, "http://admin.example.com/users/7").as_deref(), Some("users.DetailLoad"));
    assert!(outcomes.lock().unwrap().iter().any(Result::is_ok));
    drop(watcher);
}
