use cra_api::{kinds, Endpoint, RestApi};
use cra_cache::{CacheConfig, CacheKey};
use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;

const LOGO: &[u8] = b"\x89PNG\r\n\x1a\nlogo";

fn serve_image_paths(server: &MockServer) {
    serve_image_paths_with(
        server,
        json!([{ "clientID": "JavaDesktop", "imagePath": "/images/desktop/" }]),
    );
}

fn serve_image_paths_with(server: &MockServer, entries: serde_json::Value) {
    let api_ver = json!({ "apiName": "image-paths", "apiVersion": "1.0", "apiDataVersion": "7" });
    server.mock(|when, then| {
        when.method(GET).path("/versions/");
        then.status(200).json_body(json!({
            "dbgObj": { "parseOK": true },
            "apiVer": { "apiName": "versions", "apiVersion": "1.0", "apiDataVersion": "1" },
            "apiObj": { "versions": [api_ver.clone()] }
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/image-paths/");
        then.status(200).json_body(json!({
            "dbgObj": { "parseOK": true },
            "apiVer": api_ver,
            "apiObj": { "imagePaths": entries }
        }));
    });
}

fn open_api(server: &MockServer, cache_root: &std::path::Path, timeout: Duration) -> RestApi {
    let config = CacheConfig {
        cache_root_override: Some(cache_root.to_path_buf()),
    };
    RestApi::open(Endpoint::new(server.base_url(), timeout), &config).unwrap()
}

#[test]
fn images_download_once_into_the_client_scoped_cache() {
    let tmp = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    serve_image_paths(&server);
    let logo = server.mock(|when, then| {
        when.method(GET).path("/images/desktop/logo.png");
        then.status(200).body(LOGO);
    });

    let config = CacheConfig {
        cache_root_override: Some(tmp.path().to_path_buf()),
    };
    let api = RestApi::open(Endpoint::new(server.base_url(), Duration::from_secs(5)), &config).unwrap();

    let first = api.materialize_image("JavaDesktop", "logo.png").unwrap();
    let second = api.materialize_image("JavaDesktop", "logo.png").unwrap();
    assert_eq!(first, second);
    logo.assert_hits(1);

    let expected_dir = tmp
        .path()
        .join("images")
        .join("JavaDesktop")
        .join(kinds::IMAGE_PATHS);
    assert_eq!(first.parent().unwrap(), expected_dir.canonicalize().unwrap());
    assert_eq!(std::fs::read(&first).unwrap(), LOGO);

    let cache = api.image_cache("JavaDesktop").unwrap();
    assert!(cache.evict(&CacheKey::new("logo.png").unwrap()));
    api.materialize_image("JavaDesktop", "logo.png").unwrap();
    logo.assert_hits(2);
}

#[test]
fn unknown_clients_and_missing_images_yield_none() {
    let tmp = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    serve_image_paths(&server);
    server.mock(|when, then| {
        when.method(GET).path("/images/desktop/missing.png");
        then.status(404);
    });

    let config = CacheConfig {
        cache_root_override: Some(tmp.path().to_path_buf()),
    };
    let api = RestApi::open(Endpoint::new(server.base_url(), Duration::from_secs(5)), &config).unwrap();

    assert!(api.materialize_image("JavaAndroid", "logo.png").is_none());
    assert!(api.materialize_image("JavaDesktop", "missing.png").is_none());
    assert!(api.materialize_image("JavaDesktop", "../escape.png").is_none());

    let cache = api.image_cache("JavaDesktop").unwrap();
    assert!(cache.directory().keys().unwrap().is_empty());
}

#[test]
fn client_scoped_image_paths_are_cached_under_their_own_key() {
    let tmp = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    serve_image_paths(&server);
    let scoped = server.mock(|when, then| {
        when.method(GET).path("/image-paths/iOS/");
        then.status(200).json_body(json!({
            "dbgObj": { "parseOK": true },
            "apiVer": { "apiName": "image-paths", "apiVersion": "1.0", "apiDataVersion": "7" },
            "apiObj": {
                "imagePaths": [
                    { "clientID": "iOS", "imagePath": "https://cdn.example.com/ios" }
                ]
            }
        }));
    });

    let config = CacheConfig {
        cache_root_override: Some(tmp.path().to_path_buf()),
    };
    let api = RestApi::open(Endpoint::new(server.base_url(), Duration::from_secs(5)), &config).unwrap();

    let first = api.client_image_paths("iOS").unwrap();
    assert!(first.is_from_network());
    let paths = first.into_inner().api_obj;
    assert_eq!(
        api.image_url(&paths, "iOS", "logo.png").as_deref(),
        Some("https://cdn.example.com/ios/logo.png")
    );

    assert!(api.client_image_paths("iOS").unwrap().is_from_cache());
    scoped.assert_hits(1);

    let keys = api.object_cache().keys().unwrap();
    let names: Vec<&str> = keys.iter().map(|key| key.as_str()).collect();
    assert_eq!(names, vec!["image-paths-iOS"]);
}

#[test]
fn image_downloads_honor_the_endpoint_timeout() {
    let tmp = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    serve_image_paths(&server);
    server.mock(|when, then| {
        when.method(GET).path("/images/desktop/slow.png");
        then.status(200)
            .body(LOGO)
            .delay(Duration::from_millis(1500));
    });

    let api = open_api(&server, tmp.path(), Duration::from_millis(300));
    assert_eq!(api.endpoint().timeout(), Duration::from_millis(300));

    assert!(api.materialize_image("JavaDesktop", "slow.png").is_none());

    let cache = api.image_cache("JavaDesktop").unwrap();
    assert!(!cache
        .cache_path_for(&CacheKey::new("slow.png").unwrap())
        .exists());
}

#[test]
fn server_published_file_paths_are_not_read() {
    let tmp = tempfile::tempdir().unwrap();
    let private = tempfile::tempdir().unwrap();
    std::fs::write(private.path().join("secret.txt"), b"do not copy").unwrap();

    let server = MockServer::start();
    serve_image_paths_with(
        &server,
        json!([{
            "clientID": "JavaDesktop",
            "imagePath": format!("file://{}", private.path().display())
        }]),
    );

    let api = open_api(&server, tmp.path(), Duration::from_secs(5));
    let paths = api.image_paths().unwrap().into_inner().api_obj;

    assert_eq!(api.image_url(&paths, "JavaDesktop", "secret.txt"), None);
    assert!(api.materialize_image("JavaDesktop", "secret.txt").is_none());
    let cache = api.image_cache("JavaDesktop").unwrap();
    assert!(cache.directory().keys().unwrap().is_empty());
}
