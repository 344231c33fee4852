//! End-to-end harvest tests against wiremock servers and a CSV store.

use crate::integration::common::{extractor, record_page, settings, NOT_FOUND_PAGE};
use seq_harvest::config::{CredentialEntry, FetchConfig, LoginConfig, StrategyKind};
use seq_harvest::fetch::{
    build_http_client, AuthenticatedFetcher, CredentialProvider, DirectFetcher,
};
use seq_harvest::harvester::{Harvester, Phase};
use seq_harvest::record::padded_id;
use seq_harvest::storage::{CsvStore, PersistMode, RecordStore};
use seq_harvest::HarvestError;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serves a record page for each `(id, name)` and a not-found page otherwise
async fn mount_records(server: &MockServer, records: &[(u64, &str)]) {
    for (id, name) in records {
        Mock::given(method("GET"))
            .and(path("/view.php"))
            .and(query_param("editid1", padded_id(*id).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string(record_page(name, "Test")))
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/view.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(NOT_FOUND_PAGE))
        .mount(server)
        .await;
}

fn direct_fetcher(server_uri: &str) -> DirectFetcher {
    let client = build_http_client(&FetchConfig::default(), true).unwrap();
    DirectFetcher::new(client, Url::parse(&format!("{}/view.php", server_uri)).unwrap())
}

fn csv_store(dir: &TempDir) -> CsvStore {
    CsvStore::new(dir.path().join("results.csv"))
}

#[tokio::test]
async fn test_direct_harvest_end_to_end() {
    let server = MockServer::start().await;
    mount_records(
        &server,
        &[(1, "Ana"), (2, "Ben"), (3, "Cruz"), (4, "Dana"), (5, "Eli")],
    )
    .await;

    let dir = TempDir::new().unwrap();
    let mut h = Harvester::new(
        settings(1, 4, 2),
        direct_fetcher(&server.uri()),
        csv_store(&dir),
        extractor(),
    )
    .unwrap();

    // 1-4 and 5-8 hold data, 9-12 and 13-16 are empty, then the probe on id 1
    let mut phases = Vec::new();
    for _ in 0..5 {
        phases.push(h.step().await.unwrap());
    }
    assert_eq!(
        phases,
        vec![
            Phase::Advancing,
            Phase::Advancing,
            Phase::Advancing,
            Phase::ProbingLiveness,
            Phase::Advancing,
        ]
    );
    assert_eq!(h.cursor(), 17);

    let stored = csv_store(&dir).load().unwrap();
    let ids: Vec<u64> = stored.iter().map(|r| r.id).collect();
    assert_eq!(ids, (1..=8).collect::<Vec<u64>>());
    assert_eq!(stored[0].first_name, "Ana");
    assert_eq!(stored[0].category, "General");
    assert_eq!(stored[4].first_name, "Eli");
    assert!(stored[5].is_empty());

    // A second run resumes after the last stored ID
    let resumed = Harvester::new(
        settings(1, 4, 2),
        direct_fetcher(&server.uri()),
        csv_store(&dir),
        extractor(),
    )
    .unwrap();
    assert_eq!(resumed.cursor(), 9);
}

#[tokio::test]
async fn test_slow_id_degrades_to_empty_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("editid1", padded_id(5).as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(record_page("Late", "Test"))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&server)
        .await;
    mount_records(&server, &[(6, "Fay")]).await;

    let dir = TempDir::new().unwrap();
    let mut h = Harvester::new(
        settings(5, 2, 4),
        direct_fetcher(&server.uri()),
        csv_store(&dir),
        extractor(),
    )
    .unwrap();

    assert_eq!(h.step().await.unwrap(), Phase::Advancing);

    let stored = csv_store(&dir).load().unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].id, 5);
    assert!(stored[0].is_empty());
    assert_eq!(stored[1].first_name, "Fay");
}

#[tokio::test]
async fn test_server_error_terminates_harvest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut h = Harvester::new(
        settings(1, 4, 4),
        direct_fetcher(&server.uri()),
        csv_store(&dir),
        extractor(),
    )
    .unwrap();

    let result = h.run().await;
    assert!(matches!(result, Err(HarvestError::Fetch(_))));
    assert_eq!(h.phase(), Phase::Terminated);
    assert!(!dir.path().join("results.csv").exists());
}

#[tokio::test]
async fn test_append_mode_across_runs() {
    let server = MockServer::start().await;
    mount_records(&server, &[(1, "Ana"), (3, "Cruz")]).await;

    let dir = TempDir::new().unwrap();
    let mut s = settings(1, 2, 4);
    s.persist_mode = PersistMode::Append;
    s.keep_empty = false;

    let mut first = Harvester::new(
        s.clone(),
        direct_fetcher(&server.uri()),
        csv_store(&dir),
        extractor(),
    )
    .unwrap();
    first.step().await.unwrap();

    let mut second = Harvester::new(
        s,
        direct_fetcher(&server.uri()),
        csv_store(&dir),
        extractor(),
    )
    .unwrap();
    assert_eq!(second.cursor(), 2);
    second.step().await.unwrap();

    let content = std::fs::read_to_string(dir.path().join("results.csv")).unwrap();
    assert_eq!(content.lines().count(), 3);
    let ids: Vec<u64> = csv_store(&dir).load().unwrap().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 3]);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let server = MockServer::start().await;
    mount_records(&server, &[(1, "Ana")]).await;

    let dir = TempDir::new().unwrap();
    let store = csv_store(&dir).with_dry_run(true);
    let mut h = Harvester::new(
        settings(1, 4, 4),
        direct_fetcher(&server.uri()),
        store,
        extractor(),
    )
    .unwrap();

    h.step().await.unwrap();
    assert_eq!(h.cursor(), 5);
    assert_eq!(h.records().len(), 4);
    assert!(!dir.path().join("results.csv").exists());
}

#[tokio::test]
async fn test_authenticated_harvest() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login.php"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("set-cookie", "PHPSESSID=s3ss10n; path=/")
                .insert_header("location", "/index.php"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/view.php"))
        .and(query_param("editid1", padded_id(1).as_str()))
        .and(header("cookie", "PHPSESSID=s3ss10n"))
        .respond_with(ResponseTemplate::new(200).set_body_string(record_page("Ana", "Cruz")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/view.php"))
        .and(header("cookie", "PHPSESSID=s3ss10n"))
        .respond_with(ResponseTemplate::new(200).set_body_string(NOT_FOUND_PAGE))
        .mount(&server)
        .await;

    let credentials = CredentialProvider::from_entries(
        &[CredentialEntry {
            username: "operator".to_string(),
            password: "secret".to_string(),
        }],
        StrategyKind::Authenticated,
    )
    .unwrap();
    let fetcher = AuthenticatedFetcher::new(
        build_http_client(&FetchConfig::default(), true).unwrap(),
        build_http_client(&FetchConfig::default(), false).unwrap(),
        Url::parse(&format!("{}/view.php", server.uri())).unwrap(),
        Url::parse(&format!("{}/login.php", server.uri())).unwrap(),
        "PHPSESSID".to_string(),
        LoginConfig::default(),
        credentials,
    );

    let dir = TempDir::new().unwrap();
    let mut h = Harvester::new(settings(1, 3, 4), fetcher, csv_store(&dir), extractor()).unwrap();
    h.step().await.unwrap();

    let stored = csv_store(&dir).load().unwrap();
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[0].first_name, "Ana");
    assert_eq!(stored[0].last_name, "Cruz");
}
