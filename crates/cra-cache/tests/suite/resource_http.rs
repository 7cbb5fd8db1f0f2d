use cra_cache::{CacheKey, HttpStore, ResourceCache};
use httpmock::prelude::*;
use std::time::Duration;

fn name(n: &str) -> CacheKey {
    CacheKey::new(n).unwrap()
}

#[test]
fn http_resource_is_downloaded_exactly_once() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/images/JavaDesktop/logo.png");
        then.status(200).body(b"\x89PNG\r\n\x1a\n");
    });

    let tmp = tempfile::tempdir().unwrap();
    let cache = ResourceCache::new(tmp.path(), "JavaDesktop", "image-paths").unwrap();
    let store = HttpStore::new(Duration::from_secs(5));
    let url = server.url("/images/JavaDesktop/logo.png");

    let first = cache.materialize(&name("logo.png"), &url, &store).unwrap();
    let second = cache.materialize(&name("logo.png"), &url, &store).unwrap();

    mock.assert_hits(1);
    assert_eq!(first, second);
    assert_eq!(std::fs::read(first).unwrap(), b"\x89PNG\r\n\x1a\n");
}

#[test]
fn http_error_status_leaves_no_file() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/images/iOS/missing.png");
        then.status(404);
    });

    let tmp = tempfile::tempdir().unwrap();
    let cache = ResourceCache::new(tmp.path(), "iOS", "image-paths").unwrap();
    let store = HttpStore::new(Duration::from_secs(5));

    let result = cache.materialize(
        &name("missing.png"),
        &server.url("/images/iOS/missing.png"),
        &store,
    );

    mock.assert_hits(1);
    assert!(result.is_none());
    assert!(!cache.cache_path_for(&name("missing.png")).exists());
}

#[test]
fn default_store_handles_local_files() {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("source.png");
    std::fs::write(&source, b"local").unwrap();
    let cache = ResourceCache::new(tmp.path().join("images"), "iOS", "image-paths").unwrap();

    let path = cache
        .materialize_with_default_store(&name("source.png"), &format!("file://{}", source.display()))
        .unwrap();

    assert_eq!(std::fs::read(path).unwrap(), b"local");
}

#[test]
fn slow_download_past_the_timeout_leaves_no_file() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/images/iOS/slow.png");
        then.status(200)
            .body(b"late")
            .delay(Duration::from_millis(1500));
    });

    let tmp = tempfile::tempdir().unwrap();
    let cache = ResourceCache::new(tmp.path(), "iOS", "image-paths").unwrap();

    let result = cache.materialize_with_timeout(
        &name("slow.png"),
        &server.url("/images/iOS/slow.png"),
        Duration::from_millis(300),
    );

    assert!(result.is_none());
    assert!(!cache.cache_path_for(&name("slow.png")).exists());
}
