#![allow(dead_code)]

pub mod fixtures {
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    pub const FRAMEWORK_YAML: &str = r#"
access:
  redirect_to: /login
"#;

    pub const MODULES_YAML: &str = r#"
default:
  dir: main
subdomain:
  admin:
    dir: admin
  app:
    dir: app
domain:
  example.com:
    dir: shop
path:
  api:
    dir: api
"#;

    pub const MAIN_ROUTES_JSON: &str = r#"{
  "account": [
    {"route": "profile", "action": "loads.account.profile"},
    {"route": "profile", "action": "loads.account.shadowed"},
    {"route": "update[/:id]", "constraints": {"id": "[0-9]+"}, "method": "POST", "action": "actions.account.do_update"}
  ],
  "dashboard": [
    {"route": "", "action": "loads.dashboard.index",
     "nested": [
       {"slot": "sidebar", "action": "loads.widgets.sidebar"},
       {"slot": "news", "action": "admin.loads.widgets.news"}
     ]}
  ],
  "user": [{"default": "dyn"}],
  "catalog": [
    {"route": "items[/:page]", "constraints": {"page": "[0-9]+"}, "action": "api.loads.catalog.items",
     "request_validators": ["paging"], "response_validators": ["items"]},
    {"route": "sync", "action": "api.actions.catalog.do_sync"}
  ],
  "secret": [{"route": "", "action": "loads.secret.index"}],
  "boom": [{"route": "", "action": "loads.boom.index"}],
  "bank": [{"route": "withdraw", "action": "actions.bank.do_withdraw"}],
  "moved": [{"route": "", "action": "loads.moved.index"}],
  "gone": [{"route": "", "action": "loads.gone.index"}],
  "404": [{"route": "", "action": "loads.errors.not_found"}]
}"#;

    pub const ADMIN_ROUTES_YAML: &str = r#"
users:
  - route: "[:id]"
    constraints:
      id: "[0-9]+"
    action: loads.users.show
"#;

    pub fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// A complete configuration root: three routed modules plus static assets
    pub fn config_dir() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "framework.yaml", FRAMEWORK_YAML);
        write(root, "modules.yaml", MODULES_YAML);
        write(root, "main/routes.json", MAIN_ROUTES_JSON);
        write(root, "admin/routes.yaml", ADMIN_ROUTES_YAML);
        write(root, "admin/public/css/site.css", "body { color: red; }");
        write(root, "main/public/robots.txt", "User-agent: *\n");
        dir
    }
}

pub mod engine {
    use modrouter::prelude::*;
    use std::path::Path;
    use std::sync::Arc;

    pub fn resolver(root: &Path, environment: Environment) -> Arc<RouteResolver> {
        let config = Arc::new(
            FrameworkConfig::load_from_dir(root)
                .unwrap()
                .with_environment(environment),
        );
        let source = FileConfigSource::new(root);
        let modules = Arc::new(ModuleResolver::from_source(&source, &config).unwrap());
        let catalog = Arc::new(RouteCatalog::new(Arc::new(source), Arc::clone(&config)));
        Arc::new(RouteResolver::new(config, modules, catalog))
    }

    pub fn get(url: &str) -> RequestContext {
        RequestContext::from_url(http::Method::GET, url).unwrap()
    }

    pub fn post(url: &str) -> RequestContext {
        RequestContext::from_url(http::Method::POST, url).unwrap()
    }

    /// Resolve module and route the way the engine does
    pub fn resolve(resolver: &RouteResolver, request: &RequestContext) -> Result<ResolvedRoute, RouteError> {
        let module = resolver.modules().resolve(&request.host, &request.path);
        resolver.resolve(&module, request, false)
    }
}
