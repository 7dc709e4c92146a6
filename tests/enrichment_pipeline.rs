//! End-to-end tests: schedule files on disk, a local registry endpoint, and
//! the files the service writes.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{http::StatusCode, routing::get, Json, Router};
use link_enricher::config::Config;
use link_enricher::engine::{ChannelTable, Resolver};
use link_enricher::health::{self, HealthState};
use link_enricher::model::{parse_matches, Channel, ChannelSnapshot, Match};
use link_enricher::pipeline::{
    enrich_batch, EnrichmentService, RunSummary, ALL_MATCHES_FILE, UPDATED_CHANNELS_FILE,
    UPDATED_MATCHES_FILE,
};
use link_enricher::registry::RegistryClient;
use serde_json::{json, Value};

fn match_json(day: &str, hour: &str, channels: &[&str]) -> Value {
    json!({
        "sport": "futbol",
        "date": {"hour": hour, "day": day, "zone": "CET"},
        "details": {"competition": "LaLiga", "round": "Jornada 9"},
        "teams": {
            "local": {"name": "Real Betis", "image": null},
            "visitor": {"name": "Sevilla FC", "image": null}
        },
        "channels": channels,
        "event": {"name": "Real Betis - Sevilla FC", "duration": "PT2H"}
    })
}

fn matches(values: Vec<Value>) -> Vec<Match> {
    parse_matches(Value::Array(values)).unwrap()
}

fn registry_json() -> Value {
    json!({
        "channels": [
            {"name": "DAZN 2", "logo": null, "links": {"4k": [], "1080p": ["acestream://dazn2"], "720p": [], "sd": [], "unknown": []}},
            {"name": "DAZN 1", "logo": null, "links": {"4k": [], "1080p": ["http://a"], "720p": [], "sd": [], "unknown": []}},
            {"name": "Movistar Plus LaLiga", "links": {"4k": ["acestream://ll4k"], "1080p": ["acestream://ll"], "720p": [], "sd": [], "unknown": []}},
            {"name": "Teledeporte", "links": {"4k": [], "1080p": [], "720p": [], "sd": ["acestream://tdp"], "unknown": []}}
        ],
        "totalChannels": 4,
        "lastUpdated": "2026-10-18T06:00:00.000Z"
    })
}

fn registry() -> Vec<Channel> {
    ChannelSnapshot::from_value(registry_json()).unwrap().channels
}

async fn serve_registry(status: StatusCode, body: Value) -> String {
    let app = Router::new().route("/api/channels", get(move || async move { (status, Json(body)) }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/channels", addr)
}

/// Registry that answers `failures` times with `failure` before serving the
/// real document. Returns the URL and the request counter.
async fn serve_flaky_registry(failure: StatusCode, failures: usize) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().route(
        "/api/channels",
        get(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < failures {
                    (failure, Json(json!({"error": "busy"})))
                } else {
                    (StatusCode::OK, Json(registry_json()))
                }
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/api/channels", addr), hits)
}

fn test_config(root: &Path, registry_url: String) -> Config {
    Config {
        registry_url,
        pre_data_dir: root.join("preData"),
        data_dir: root.join("data"),
        poll_interval_seconds: 1,
        health_port: 0,
        run_once: true,
        registry_max_retries: 1,
        registry_requests_per_minute: 60,
    }
}

fn write_pre_data(root: &Path, file: &str, doc: Value) {
    let dir = root.join("preData");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(file), serde_json::to_string_pretty(&doc).unwrap()).unwrap();
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_label_with_suffix_resolves_to_registry_entry() {
    let output = enrich_batch(
        matches(vec![match_json("18/10/2026", "21:00", &["DAZN 1 Bar"])]),
        &registry(),
    );
    let written = serde_json::to_value(&output.matches[0]).unwrap();
    assert_eq!(
        written["links"],
        json!({"4k": [], "1080p": ["http://a"], "720p": [], "sd": [], "unknown": []})
    );
}

#[test]
fn test_unknown_label_leaves_no_links_field() {
    let output = enrich_batch(
        matches(vec![match_json("18/10/2026", "21:00", &["Some Totally Unknown Channel"])]),
        &registry(),
    );
    let written = serde_json::to_value(&output.matches[0]).unwrap();
    assert!(written.get("links").is_none(), "{written}");
    assert!(output.channels.channels.is_empty());
}

#[test]
fn test_two_labels_same_candidate_no_duplicates() {
    let output = enrich_batch(
        matches(vec![match_json("18/10/2026", "21:00", &["M+ LaLiga", "Movistar LaLiga TV"])]),
        &registry(),
    );
    let links = output.matches[0].links.as_ref().unwrap();
    assert_eq!(links.uhd.len(), 1);
    assert_eq!(links.full_hd.len(), 1);
    assert_eq!(links.total_links(), 2);
}

#[test]
fn test_matches_sharing_a_channel_aggregate_into_one_entry() {
    let registry = registry();
    let resolver = Resolver::new(&registry);
    let enriched = resolver.enrich_all(matches(vec![
        match_json("18/10/2026", "16:00", &["DAZN 1"]),
        match_json("18/10/2026", "18:30", &["DAZN 1 Bar", "Teledeporte"]),
    ]));

    let table = ChannelTable::from_enriched(&enriched);
    assert_eq!(table.len(), 2);
    let dazn = table.get("DAZN 1").unwrap();
    assert_eq!(dazn.full_hd.iter().collect::<Vec<_>>(), vec!["http://a"]);
    // The second match also carried Teledeporte's link
    assert!(dazn.sd.contains("acestream://tdp"));
}

#[test]
fn test_numbered_labels_do_not_cross() {
    let output = enrich_batch(
        matches(vec![match_json("18/10/2026", "21:00", &["DAZN 2"])]),
        &registry(),
    );
    let links = output.matches[0].links.as_ref().unwrap();
    assert_eq!(links.full_hd.iter().collect::<Vec<_>>(), vec!["acestream://dazn2"]);
}

#[tokio::test]
async fn test_service_run_writes_all_outputs() {
    let root = tempfile::tempdir().unwrap();
    write_pre_data(
        root.path(),
        "futbol.json",
        json!({"matches": [
            match_json("19/10/2026", "21:00", &["DAZN 1 Bar"]),
            match_json("18/10/2026", "16:15", &["M+ LaLiga", "Teledeporte"]),
        ]}),
    );
    write_pre_data(
        root.path(),
        "padel.json",
        json!({"matches": [match_json("19/10/2026", "09:00", &["Canal Padel Unknown"])]}),
    );

    let url = serve_registry(StatusCode::OK, registry_json()).await;
    let service = EnrichmentService::new(test_config(root.path(), url)).unwrap();
    let summary = service.run_once().await.unwrap();

    assert_eq!(
        summary,
        RunSummary {
            matches: 3,
            linked_matches: 2,
            channels: 3,
            links: 3 + 3 + 1,
        }
    );

    let data = root.path().join("data");
    let all = read_json(&data.join(ALL_MATCHES_FILE));
    let days: Vec<&str> = all["matches"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["date"]["hour"].as_str().unwrap())
        .collect();
    assert_eq!(days, vec!["16:15", "09:00", "21:00"]);

    let updated = read_json(&data.join(UPDATED_MATCHES_FILE));
    let updated = updated.as_array().unwrap();
    assert_eq!(updated.len(), 3);
    assert_eq!(updated[0]["links"]["sd"], json!(["acestream://tdp"]));
    assert!(updated[1].get("links").is_none());
    assert_eq!(updated[2]["links"]["1080p"], json!(["http://a"]));
    assert_eq!(updated[0]["event"]["duration"], json!("PT2H"));

    let channels = read_json(&data.join(UPDATED_CHANNELS_FILE));
    let names: Vec<&str> = channels["channels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["DAZN 1", "Movistar Plus LaLiga", "Teledeporte"]);
    assert_eq!(channels["totalChannels"], json!(3));
    assert!(channels["lastUpdated"].is_string());
    assert_eq!(
        channels["channels"][1]["links"]["1080p"],
        json!(["acestream://ll"])
    );
}

#[tokio::test]
async fn test_registry_error_writes_nothing() {
    let root = tempfile::tempdir().unwrap();
    write_pre_data(
        root.path(),
        "futbol.json",
        json!({"matches": [match_json("19/10/2026", "21:00", &["DAZN 1"])]}),
    );

    let url = serve_registry(StatusCode::NOT_FOUND, json!({"error": "gone"})).await;
    let service = EnrichmentService::new(test_config(root.path(), url)).unwrap();
    let err = service.run_once().await.unwrap_err();

    assert!(format!("{err:#}").contains("404"), "{err:#}");
    assert!(!root.path().join("data").exists());
}

#[tokio::test]
async fn test_registry_server_error_is_retried() {
    let (url, hits) = serve_flaky_registry(StatusCode::SERVICE_UNAVAILABLE, 1).await;
    let client = RegistryClient::new(url, 600, 2).unwrap();

    let snapshot = client.fetch().await.unwrap();
    assert_eq!(snapshot.channels.len(), 4);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_registry_rate_limited_is_retried() {
    let (url, hits) = serve_flaky_registry(StatusCode::TOO_MANY_REQUESTS, 1).await;
    let client = RegistryClient::new(url, 600, 2).unwrap();

    assert!(client.fetch().await.is_ok());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_registry_retries_are_bounded() {
    let (url, hits) = serve_flaky_registry(StatusCode::BAD_GATEWAY, usize::MAX).await;
    let client = RegistryClient::new(url, 600, 2).unwrap();

    let err = client.fetch().await.unwrap_err();
    assert!(format!("{err:#}").contains("after 2 attempts"), "{err:#}");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_registry_client_error_is_not_retried() {
    let (url, hits) = serve_flaky_registry(StatusCode::FORBIDDEN, 1).await;
    let client = RegistryClient::new(url, 600, 2).unwrap();

    let err = client.fetch().await.unwrap_err();
    assert!(format!("{err:#}").contains("403"), "{err:#}");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_malformed_registry_writes_nothing() {
    let root = tempfile::tempdir().unwrap();
    write_pre_data(
        root.path(),
        "futbol.json",
        json!({"matches": [match_json("19/10/2026", "21:00", &["DAZN 1"])]}),
    );

    let body = json!({"channels": [{"name": "DAZN 1", "links": ["http://a"]}], "totalChannels": 1});
    let url = serve_registry(StatusCode::OK, body).await;
    let service = EnrichmentService::new(test_config(root.path(), url)).unwrap();
    let err = service.run_once().await.unwrap_err();

    assert!(format!("{err:#}").contains("index 0"), "{err:#}");
    assert!(!root.path().join("data").exists());
}

#[tokio::test]
async fn test_malformed_schedule_fails_whole_batch() {
    let root = tempfile::tempdir().unwrap();
    let mut bad = match_json("19/10/2026", "21:00", &["DAZN 1"]);
    bad["channels"] = json!("DAZN 1");
    write_pre_data(
        root.path(),
        "futbol.json",
        json!({"matches": [match_json("19/10/2026", "18:00", &["DAZN 1"]), bad]}),
    );

    let url = serve_registry(StatusCode::OK, registry_json()).await;
    let service = EnrichmentService::new(test_config(root.path(), url)).unwrap();
    let err = service.run_once().await.unwrap_err();

    assert!(format!("{err:#}").contains("index 1"), "{err:#}");
    assert!(!root.path().join("data").exists());
}

#[tokio::test]
async fn test_health_endpoint_reports_errors() {
    let state = HealthState::new();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = health::router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let url = format!("http://{}/health", addr);

    let ok = reqwest::get(&url).await.unwrap();
    assert_eq!(ok.status().as_u16(), 200);
    let body: Value = ok.json().await.unwrap();
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["last_run"], Value::Null);

    for _ in 0..6 {
        state.record_error().await;
    }
    let failing = reqwest::get(&url).await.unwrap();
    assert_eq!(failing.status().as_u16(), 503);
    let body: Value = failing.json().await.unwrap();
    assert_eq!(body["status"], json!("degraded"));
    assert_eq!(body["consecutive_errors"], json!(6));

    state
        .record_success(RunSummary {
            matches: 4,
            linked_matches: 3,
            channels: 2,
            links: 5,
        })
        .await;
    let body: Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["last_run_summary"]["linked_matches"], json!(3));
}
