use modrouter::config::{FileConfigSource, FrameworkConfig};
use modrouter::module::{ModuleConfig, ModuleResolver, ResolutionType};
use std::path::PathBuf;

mod common;
use common::fixtures;

fn resolver() -> ModuleResolver {
    let config = ModuleConfig::with_default("main")
        .subdomain("admin", "admin")
        .domain("example.com", "shop")
        .path("api", "api");
    ModuleResolver::new(config, "/srv/sites", "dyn").unwrap()
}

#[test]
fn test_path_outranks_subdomain() {
    let m = resolver().resolve("admin.example.com", "/api/orders");
    assert_eq!(m.name, "api");
    assert_eq!(m.resolution_type, ResolutionType::Path);
    assert_eq!(m.parent.as_deref().map(|p| p.name.as_str()), Some("admin"));
}

#[test]
fn test_subdomain_outranks_domain() {
    let m = resolver().resolve("admin.example.com", "/orders");
    assert_eq!(m.name, "admin");
    assert_eq!(m.resolution_type, ResolutionType::Subdomain);
    assert!(m.parent.is_none());
}

#[test]
fn test_domain_outranks_default() {
    let r = resolver();
    let m = r.resolve("example.com", "/orders");
    assert_eq!((m.name.as_str(), m.resolution_type), ("shop", ResolutionType::Domain));

    // unmapped subdomain falls through to the main domain
    let m = r.resolve("www.example.com", "/orders");
    assert_eq!((m.name.as_str(), m.resolution_type), ("shop", ResolutionType::Domain));
}

#[test]
fn test_default_when_nothing_matches() {
    let m = resolver().resolve("other.org", "/orders");
    assert_eq!(m.name, "main");
    assert_eq!(m.resolution_type, ResolutionType::Default);
    assert_eq!(m.root_dir, PathBuf::from("/srv/sites/main"));
}

#[test]
fn test_default_namespace_segment_selects_by_path() {
    let m = resolver().resolve("admin.example.com", "/main/orders?page=2");
    assert_eq!(m.name, "main");
    assert_eq!(m.resolution_type, ResolutionType::Path);
    assert_eq!(m.path_prefix.as_deref(), Some("main"));
    assert_eq!(m.parent.as_deref().map(|p| p.name.as_str()), Some("admin"));
}

#[test]
fn test_resolution_is_deterministic() {
    let r = resolver();
    for (host, path) in [
        ("admin.example.com", "/api/x"),
        ("example.com", "/"),
        ("localhost:8080", ""),
        ("ADMIN.Example.com.", "/dyn/x"),
    ] {
        assert_eq!(r.resolve(host, path), r.resolve(host, path));
    }
}

#[test]
fn test_from_file_source() {
    let dir = fixtures::config_dir();
    let source = FileConfigSource::new(dir.path());
    let r = ModuleResolver::from_source(&source, &FrameworkConfig::default()).unwrap();
    assert_eq!(r.module_names(), vec!["admin", "api", "app", "main", "shop"]);
    let m = r.resolve("app.example.com", "/css/site.css");
    assert_eq!(m.name, "app");
    assert_eq!(m.root_dir, dir.path().join("app"));
}

#[test]
fn test_missing_default_fails_at_startup() {
    let dir = tempfile::tempdir().unwrap();
    fixtures::write(dir.path(), "modules.yaml", "subdomain:\n  admin:\n    dir: admin\n");
    let source = FileConfigSource::new(dir.path());
    let err = ModuleResolver::from_source(&source, &FrameworkConfig::default())
        .err()
        .unwrap();
    assert!(format!("{err:#}").contains("no default module"));
}
