use modrouter::dispatcher::AssetStreamer;
use modrouter::module::{ModuleConfig, ModuleResolver};
use modrouter::request::path_segments;
use modrouter::response::ResponseBody;
use modrouter::static_files::{resolve_static, FsAssetStreamer};
use modrouter::DispatchError;

mod common;
use common::fixtures;

fn modules() -> ModuleResolver {
    ModuleResolver::new(
        ModuleConfig::with_default("main")
            .subdomain("admin", "admin")
            .path("api", "api"),
        "/srv",
        "dyn",
    )
    .unwrap()
}

#[test]
fn test_single_segment_belongs_to_current_module() {
    let m = modules();
    let current = m.resolve("localhost", "/robots.txt");
    let route = resolve_static(&path_segments("/robots.txt"), &current, &m).unwrap();
    assert_eq!(route.namespace, "main");
    let info = route.file_info.unwrap();
    assert_eq!((info.file_type.as_str(), info.file_url.as_str()), ("txt", "robots.txt"));
}

#[test]
fn test_unknown_owner_guess_is_still_consumed() {
    let m = modules();
    let current = m.resolve("localhost", "/assets/js/app.js");
    let route = resolve_static(&path_segments("/assets/js/app.js"), &current, &m).unwrap();
    assert_eq!(route.namespace, "main");
    assert_eq!(route.file_info.unwrap().file_url, "js/app.js");
}

#[test]
fn test_file_url_is_decoded_after_split() {
    let m = modules();
    let current = m.resolve("localhost", "/assets/my%20app.js");
    let route = resolve_static(&path_segments("/assets/my%20app.js"), &current, &m).unwrap();
    assert_eq!(route.file_info.unwrap().file_url, "my app.js");
}

#[test]
fn test_path_resolved_module_keeps_ownership() {
    let m = modules();
    let current = m.resolve("localhost", "/api/admin/logo.png");
    assert_eq!(current.name, "api");
    let route = resolve_static(&path_segments("/admin/logo.png"), &current, &m).unwrap();
    assert_eq!(route.namespace, "api");
    assert_eq!(route.file_info.unwrap().file_type, "png");
}

#[test]
fn test_no_extension_is_not_static() {
    let m = modules();
    let current = m.resolve("localhost", "/admin/users");
    assert!(resolve_static(&path_segments("/admin/users"), &current, &m).is_none());
    assert!(resolve_static(&path_segments("/admin/users."), &current, &m).is_none());
}

#[test]
fn test_streams_public_files() {
    let dir = fixtures::config_dir();
    let streamer = FsAssetStreamer::new(dir.path(), "public");

    let response = streamer.stream("main", "txt", "robots.txt").unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.get_header("Content-Type"), Some("text/plain"));
    assert_eq!(response.body, ResponseBody::Bytes(b"User-agent: *\n".to_vec()));

    // wrong owner
    assert_eq!(streamer.stream("admin", "txt", "robots.txt").unwrap().status, 404);
}

#[test]
fn test_traversal_prevented() {
    let dir = fixtures::config_dir();
    let streamer = FsAssetStreamer::new(dir.path(), "public");
    assert_eq!(streamer.stream("main", "yaml", "../routes.json").unwrap().status, 404);
    assert_eq!(streamer.stream("admin", "yaml", "/../../modules.yaml").unwrap().status, 404);
}

#[test]
fn test_preprocessor_sources_need_their_own_streamer() {
    let dir = fixtures::config_dir();
    let streamer = FsAssetStreamer::new(dir.path(), "public");
    assert!(matches!(
        streamer.stream("admin", "less", "css/less/site.css"),
        Err(DispatchError::Debug { .. })
    ));
}
