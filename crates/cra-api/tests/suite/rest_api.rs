use cra_api::{kinds, ApiError, Endpoint, JsonPayload, Provenance, RestApi, VersionRegistry};
use cra_cache::CacheConfig;
use httpmock::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct AboutUs {
    title: String,
    body: String,
}

fn fingerprint(kind: &str, data_version: &str) -> Value {
    json!({ "apiName": kind, "apiVersion": "1.0", "apiDataVersion": data_version })
}

fn envelope(kind: &str, data_version: &str, api_obj: Value) -> Value {
    json!({
        "dbgObj": {
            "parseOK": true,
            "traceMsgQ": [],
            "restAPIkeys": [kind],
            "request_uri": format!("/{kind}/"),
            "query_string": null
        },
        "apiVer": fingerprint(kind, data_version),
        "apiObj": api_obj
    })
}

fn versions_body(entries: &[(&str, &str)]) -> Value {
    let versions: Vec<Value> = entries
        .iter()
        .map(|(kind, data_version)| fingerprint(kind, data_version))
        .collect();
    envelope(kinds::VERSIONS, "1", json!({ "versions": versions }))
}

fn about_body(data_version: &str, title: &str) -> Value {
    envelope(
        kinds::ABOUT_US,
        data_version,
        json!({ "title": title, "body": "We make films." }),
    )
}

fn open_api(server: &MockServer, cache_root: &Path) -> RestApi {
    let config = CacheConfig {
        cache_root_override: Some(cache_root.to_path_buf()),
    };
    RestApi::open(Endpoint::new(server.base_url(), Duration::from_secs(5)), &config).unwrap()
}

#[test]
fn first_load_fetches_then_cache_serves_until_the_version_moves() {
    let tmp = tempfile::tempdir().unwrap();

    let server = MockServer::start();
    let versions = server.mock(|when, then| {
        when.method(GET).path("/versions/");
        then.status(200).json_body(versions_body(&[("about-us", "3")]));
    });
    let about = server.mock(|when, then| {
        when.method(GET).path("/about-us/");
        then.status(200).json_body(about_body("3", "About"));
    });

    let api = open_api(&server, tmp.path());
    versions.assert_hits(1);
    assert!(api.registry().is_available());

    let first = api.load::<AboutUs>(kinds::ABOUT_US).unwrap();
    assert_eq!(first.provenance, Provenance::FromNetwork);
    assert_eq!(first.value.api_obj.title, "About");
    assert!(tmp.path().join("objects").join("about-us").is_file());

    let second = api.load::<AboutUs>(kinds::ABOUT_US).unwrap();
    assert_eq!(second.provenance, Provenance::FromCache);
    assert_eq!(second.value, first.value);
    about.assert_hits(1);

    // A new process sees the persisted copy.
    let reopened = open_api(&server, tmp.path());
    assert!(reopened.load::<AboutUs>(kinds::ABOUT_US).unwrap().is_from_cache());
    about.assert_hits(1);
    versions.assert_hits(2);

    // The server publishes a new data version.
    let updated = MockServer::start();
    updated.mock(|when, then| {
        when.method(GET).path("/versions/");
        then.status(200).json_body(versions_body(&[("about-us", "4")]));
    });
    let updated_about = updated.mock(|when, then| {
        when.method(GET).path("/about-us/");
        then.status(200).json_body(about_body("4", "About (new)"));
    });

    let api = open_api(&updated, tmp.path());
    let refreshed = api.load::<AboutUs>(kinds::ABOUT_US).unwrap();
    assert!(refreshed.is_from_network());
    assert_eq!(refreshed.value.api_obj.title, "About (new)");
    assert_eq!(refreshed.value.api_ver.api_data_version, "4");

    assert!(api.load::<AboutUs>(kinds::ABOUT_US).unwrap().is_from_cache());
    updated_about.assert_hits(1);
}

#[test]
fn unreachable_version_registry_trusts_the_cache() {
    let tmp = tempfile::tempdir().unwrap();

    let online = MockServer::start();
    online.mock(|when, then| {
        when.method(GET).path("/versions/");
        then.status(200).json_body(versions_body(&[("about-us", "1")]));
    });
    online.mock(|when, then| {
        when.method(GET).path("/about-us/");
        then.status(200).json_body(about_body("1", "About"));
    });
    assert!(open_api(&online, tmp.path())
        .load::<AboutUs>(kinds::ABOUT_US)
        .unwrap()
        .is_from_network());

    let degraded = MockServer::start();
    degraded.mock(|when, then| {
        when.method(GET).path("/versions/");
        then.status(503);
    });
    let about = degraded.mock(|when, then| {
        when.method(GET).path("/about-us/");
        then.status(200).json_body(about_body("2", "About (new)"));
    });

    let api = open_api(&degraded, tmp.path());
    assert_eq!(api.registry(), &VersionRegistry::Unavailable);

    let loaded = api.load::<AboutUs>(kinds::ABOUT_US).unwrap();
    assert!(loaded.is_from_cache());
    assert_eq!(loaded.value.api_obj.title, "About");
    about.assert_hits(0);
}

#[test]
fn kind_missing_from_registry_is_refetched() {
    let tmp = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/versions/");
        then.status(200).json_body(versions_body(&[("reels", "1")]));
    });
    let about = server.mock(|when, then| {
        when.method(GET).path("/about-us/");
        then.status(200).json_body(about_body("1", "About"));
    });

    let api = open_api(&server, tmp.path());
    assert!(api.load::<AboutUs>(kinds::ABOUT_US).unwrap().is_from_network());
    assert!(api.load::<AboutUs>(kinds::ABOUT_US).unwrap().is_from_network());
    about.assert_hits(2);
}

#[test]
fn server_parse_failure_is_reported_and_not_cached() {
    let tmp = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/versions/");
        then.status(200).json_body(versions_body(&[("about-us", "1")]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/about-us/");
        then.status(200).json_body(json!({
            "dbgObj": { "parseOK": false, "traceMsgQ": ["unknown api name"] },
            "apiVer": fingerprint("about-us", "1"),
            "apiObj": { "title": "", "body": "" }
        }));
    });

    let api = open_api(&server, tmp.path());
    let err = api.try_load::<AboutUs>(kinds::ABOUT_US).unwrap_err();

    match err {
        ApiError::ServerParse { api, trace } => {
            assert_eq!(api, "about-us");
            assert_eq!(trace, vec!["unknown api name".to_string()]);
        }
        other => panic!("expected ServerParse, got {other:?}"),
    }
    assert!(api.load::<AboutUs>(kinds::ABOUT_US).is_none());
    assert!(!tmp.path().join("objects").join("about-us").exists());
}

#[test]
fn malformed_and_failed_responses_yield_no_object() {
    let tmp = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/versions/");
        then.status(200).json_body(versions_body(&[]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/about-us/");
        then.status(200).body("<html>maintenance</html>");
    });
    server.mock(|when, then| {
        when.method(GET).path("/reels/");
        then.status(500);
    });

    let api = open_api(&server, tmp.path());

    assert!(matches!(
        api.try_load::<AboutUs>(kinds::ABOUT_US),
        Err(ApiError::Decode { .. })
    ));
    assert!(matches!(
        api.try_load::<Value>(kinds::REELS),
        Err(ApiError::Network { .. })
    ));
    assert!(api.object_cache().keys().unwrap().is_empty());
}

#[test]
fn versions_object_is_itself_cacheable() {
    let tmp = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    let versions = server.mock(|when, then| {
        when.method(GET).path("/versions/");
        then.status(200)
            .json_body(versions_body(&[("about-us", "1"), ("versions", "1")]));
    });

    let api = open_api(&server, tmp.path());
    let loaded = api.versions().unwrap();
    assert!(loaded.is_from_network());
    assert_eq!(
        loaded
            .value
            .api_obj
            .api_version("about-us")
            .map(|v| v.api_data_version.as_str()),
        Some("1")
    );

    assert!(api.versions().unwrap().is_from_cache());
    versions.assert_hits(2);
}

#[test]
fn injected_registry_decides_staleness() {
    let tmp = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    let about = server.mock(|when, then| {
        when.method(GET).path("/about-us/");
        then.status(200).json_body(about_body("9", "About"));
    });

    let objects = cra_cache::DirectoryCache::open(tmp.path().join("objects")).unwrap();
    let registry = VersionRegistry::from_versions(&cra_api::Versions {
        versions: vec![cra_api::ApiVersion::new("about-us", "1.0", "9")],
    });
    let api = RestApi::with_parts(
        Endpoint::new(server.base_url(), Duration::from_secs(5)),
        objects,
        tmp.path().join("images"),
        registry,
    );

    assert!(api.load::<AboutUs>(kinds::ABOUT_US).unwrap().is_from_network());
    assert!(api.load::<AboutUs>(kinds::ABOUT_US).unwrap().is_from_cache());
    about.assert_hits(1);
    assert_eq!(api.images_root(), tmp.path().join("images"));
}

#[test]
fn payloads_bincode_cannot_read_back_are_served_but_never_cached() {
    let tmp = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/versions/");
        then.status(200).json_body(versions_body(&[("reels", "3")]));
    });
    let reels = server.mock(|when, then| {
        when.method(GET).path("/reels/");
        then.status(200).json_body(envelope(
            kinds::REELS,
            "3",
            json!({ "reels": [{ "name": "Demo reel", "year": 2017 }] }),
        ));
    });

    let api = open_api(&server, tmp.path());
    for _ in 0..2 {
        let loaded = api.load::<Value>(kinds::REELS).unwrap();
        assert_eq!(loaded.provenance, Provenance::FromNetwork);
        assert_eq!(loaded.value.api_obj["reels"][0]["name"], "Demo reel");
    }
    reels.assert_hits(2);
    assert!(api.object_cache().keys().unwrap().is_empty());

    let first = api.load::<JsonPayload>(kinds::REELS).unwrap();
    let second = api.load::<JsonPayload>(kinds::REELS).unwrap();
    assert!(first.is_from_network());
    assert!(second.is_from_cache());
    assert_eq!(second.value.api_obj.0["reels"][0]["year"], 2017);
    reels.assert_hits(3);
}
