//! Catalog refresh, suggestions and profile import against a mock registry.

#![allow(clippy::unwrap_used, clippy::panic)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::{Cursor, Write};
use std::sync::Arc;
use std::time::Duration;
use tscache_core::{
    Config, Error, ImportPipeline, ProfileStrategy, RefreshOutcome, RegistryClient,
    RegistryConfig, RetryPolicy, SnapshotCache, stats,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;

fn catalog() -> serde_json::Value {
    json!([
        {
            "owner": "Azumatt",
            "name": "AzuCraftyBoxes",
            "full_name": "Azumatt-AzuCraftyBoxes",
            "package_url": "https://thunderstore.io/c/valheim/p/Azumatt/AzuCraftyBoxes/",
            "categories": ["Mods", "Crafting"],
            "is_pinned": false,
            "is_deprecated": false,
            "date_created": "2023-01-01T00:00:00.000000Z",
            "versions": [
                {
                    "version_number": "1.6.1",
                    "downloads": 700,
                    "date_created": "2024-02-01T00:00:00.000000Z",
                    "icon": "https://gcdn.example/icons/crafty-1.6.1.png",
                    "description": "Craft from containers",
                    "dependencies": ["denikson-BepInExPack_Valheim-5.4.2202"]
                },
                {
                    "version_number": "1.6.0",
                    "downloads": 500,
                    "date_created": "2024-01-01T00:00:00.000000Z",
                    "icon": "https://gcdn.example/icons/crafty-1.6.0.png",
                    "description": "Craft from containers"
                }
            ]
        },
        {
            "owner": "denikson",
            "name": "BepInExPack_Valheim",
            "full_name": "denikson-BepInExPack_Valheim",
            "categories": ["Libraries"],
            "is_pinned": true,
            "date_created": "2021-02-01T00:00:00Z",
            "versions": [
                {"version_number": "5.4.2202", "downloads": 9000, "date_created": "2023-03-01T00:00:00Z"}
            ]
        },
        {
            "owner": "",
            "name": "Broken",
            "versions": []
        }
    ])
}

fn profile_code_body(entries: &[(&str, &str)]) -> String {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    let bytes = writer.finish().unwrap().into_inner();
    format!("#r2modman{}", STANDARD.encode(bytes))
}

fn config_for(server: &MockServer) -> Config {
    Config {
        registry: RegistryConfig {
            base_url: server.uri(),
            ..RegistryConfig::default()
        },
        profile: RetryPolicy {
            initial_backoff_ms: 5,
            max_backoff_ms: 20,
            max_retry_after_secs: 0,
            ..RetryPolicy::default()
        },
        ..Config::default()
    }
}

async fn mount_catalog(server: &MockServer, community: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/c/{community}/api/v1/package/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn refresh_then_suggest() {
    let server = MockServer::start().await;
    mount_catalog(&server, "valheim").await;

    let client = RegistryClient::new(&config_for(&server)).unwrap();
    let cache = SnapshotCache::new(Arc::new(client));

    let outcome = cache.refresh_now().await;
    assert!(matches!(outcome, RefreshOutcome::Published { packages: 2, .. }));

    assert_eq!(cache.suggest_authors("", 10), vec!["denikson", "Azumatt"]);
    assert_eq!(cache.suggest_mods(Some("azumatt"), "crafty", 10), vec!["AzuCraftyBoxes"]);
    assert_eq!(
        cache.suggest_versions("Azumatt", "AzuCraftyBoxes", "", 10),
        vec!["1.6.1", "1.6.0"]
    );
    assert_eq!(cache.suggest_categories("", false, 10), vec!["Libraries", "Mods", "Crafting"]);

    let snapshot = cache.snapshot();
    let azumatt = stats::author_stats(&snapshot, "azumatt").unwrap();
    assert_eq!(azumatt.total_downloads, 1200);
    assert_eq!(azumatt.top_mods.len(), 1);
}

#[tokio::test]
async fn refresh_failure_keeps_last_good_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/c/valheim/api/v1/package/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/c/valheim/api/v1/package/"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let cache = SnapshotCache::new(Arc::new(RegistryClient::new(&config_for(&server)).unwrap()));
    assert!(cache.refresh_now().await.is_published());
    let published = cache.snapshot();

    match cache.refresh_now().await {
        RefreshOutcome::Retained { error } => {
            assert!(matches!(error, Error::Transport { status: 502, .. }));
        },
        RefreshOutcome::Published { .. } => panic!("a 502 must not publish"),
    }
    assert!(Arc::ptr_eq(&published, &cache.snapshot()));
}

#[tokio::test]
async fn import_export_profile_uses_declared_community() {
    let server = MockServer::start().await;
    mount_catalog(&server, "lethal-company").await;

    let export = "\
profileName: Crafting
community: lethal-company
mods:
  - name: Azumatt-AzuCraftyBoxes
    version:
      major: 1
      minor: 6
      patch: 0
    enabled: true
  - name: Someone-Vanished
    version:
      major: 0
      minor: 1
      patch: 0
    enabled: true
";
    Mock::given(method("GET"))
        .and(path("/api/experimental/legacyprofile/get/0190-abcd/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(profile_code_body(&[("export.r2x", export)])),
        )
        .mount(&server)
        .await;

    let pipeline = ImportPipeline::new(&config_for(&server)).unwrap();
    let imported = pipeline.import("0190-abcd", None).await.unwrap();

    assert_eq!(imported.community, "lethal-company");
    assert_eq!(imported.profile_name.as_deref(), Some("Crafting"));
    assert_eq!(imported.strategy, Some(ProfileStrategy::Export));

    let rendered: Vec<String> = imported.mods.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        vec!["Azumatt-AzuCraftyBoxes-1.6.0", "Someone-Vanished-0.1.0"]
    );
    assert_eq!(
        imported.mods[0].icon_url.as_deref(),
        Some("https://gcdn.example/icons/crafty-1.6.0.png")
    );
    assert!(imported.mods[1].icon_url.is_none());
}

#[tokio::test]
async fn import_manifest_profile_falls_back_to_default_community() {
    let server = MockServer::start().await;
    mount_catalog(&server, "valheim").await;

    let manifest = r#"{"dependencies": ["Azumatt-AzuCraftyBoxes-9.9.9"]}"#;
    Mock::given(method("GET"))
        .and(path("/api/experimental/legacyprofile/get/legacy/"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/experimental/legacyprofile/get/legacy/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(profile_code_body(&[("manifest.json", manifest)])),
        )
        .mount(&server)
        .await;

    let pipeline = ImportPipeline::new(&config_for(&server)).unwrap();
    let imported = pipeline.import("legacy", None).await.unwrap();

    assert_eq!(imported.community, "valheim");
    assert_eq!(imported.strategy, Some(ProfileStrategy::Manifest));
    // Unknown exact version falls back to the newest known one.
    assert_eq!(imported.mods[0].version, "1.6.1");
}

#[tokio::test]
async fn import_of_missing_profile_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = ImportPipeline::new(&config_for(&server)).unwrap();
    let result = pipeline.import("nope", None).await;
    assert!(matches!(result, Err(Error::KeyNotFound(_))));
}

#[tokio::test]
async fn import_respects_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let pipeline = ImportPipeline::new(&config_for(&server)).unwrap();
    let deadline = tokio::time::Instant::now() + Duration::from_millis(200);
    let result = pipeline.import("slow", Some(deadline)).await;

    let error = result.unwrap_err();
    assert!(matches!(error, Error::Timeout(_)));
    assert!(error.is_recoverable());
}
