use anyhow::Result;
use chrono::NaiveDate;
use epias_energy::config::settings::{Secret, Settings};
use epias_energy::domain::model::Period;
use epias_energy::domain::request::DateRange;
use epias_energy::{
    DataFetcher, Dataset, DatasetPipeline, DatasetQuery, EpiasClient, EpiasError, EtlEngine,
    LocalStorage,
};
use httpmock::prelude::*;
use serde_json::json;
use std::io::Read;
use tempfile::TempDir;

fn fetcher_for(server: &MockServer) -> Result<DataFetcher> {
    let mut settings = Settings::default();
    settings.api_base_url = server.url("/electricity-service/v1");
    settings.auth_base_url = server.base_url();
    settings.username = Some("analyst@example.com".to_string());
    settings.password = Some(Secret::new("pw"));
    settings.api_max_retries = 0;
    settings.api_retry_delay_secs = 0;
    settings.cache.enabled = false;

    server.mock(|when, then| {
        when.method(POST).path("/cas/v1/tickets");
        then.status(201).body("TGT-test");
    });

    Ok(DataFetcher::new(EpiasClient::from_settings(&settings)?))
}

fn march(first: u32, last: u32) -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2024, 3, first).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, last).unwrap(),
    )
    .unwrap()
}

fn zip_entries(path: &std::path::Path) -> Result<Vec<String>> {
    let archive = zip::ZipArchive::new(std::fs::File::open(path)?)?;
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    Ok(names)
}

#[tokio::test]
async fn test_ptf_pipeline_writes_bundle() -> Result<()> {
    let server = MockServer::start();
    let fetcher = fetcher_for(&server)?;
    let mcp = server.mock(|when, then| {
        when.method(POST)
            .path("/electricity-service/v1/markets/dam/data/mcp")
            .body_contains("\"startDate\":\"2024-03-01T00:00:00+03:00\"")
            .body_contains("\"endDate\":\"2024-03-02T23:59:59+03:00\"");
        then.status(200).json_body(json!({
            "items": [
                {"date": "2024-03-02T00:00:00+03:00", "hour": "00:00", "price": 1800},
                {"date": "2024-03-01T00:00:00+03:00", "hour": "00:00", "price": 2000},
                {"date": "2024-03-01T01:00:00+03:00", "hour": "01:00", "price": 2200}
            ]
        }));
    });

    let output = TempDir::new()?;
    let mut query = DatasetQuery::new(march(1, 2));
    query.period = Some(Period::Daily);

    let pipeline = DatasetPipeline::new(
        fetcher,
        LocalStorage::new(output.path()),
        Dataset::Ptf,
        query,
        vec!["csv".to_string(), "json".to_string()],
    );
    let location = EtlEngine::new(pipeline).run().await?;

    mcp.assert_hits(1);
    let archive_path = output.path().join("ptf_20240301_20240302.zip");
    assert_eq!(location, archive_path.display().to_string());
    assert_eq!(
        zip_entries(&archive_path)?,
        vec!["ptf.csv", "ptf.json", "ptf_daily.csv", "ptf_daily.json"]
    );

    let mut archive = zip::ZipArchive::new(std::fs::File::open(&archive_path)?)?;
    let mut csv = String::new();
    archive.by_name("ptf.csv")?.read_to_string(&mut csv)?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("2024-03-01 00:00:00"));

    let mut daily = String::new();
    archive.by_name("ptf_daily.csv")?.read_to_string(&mut daily)?;
    assert_eq!(daily.lines().count(), 3);
    Ok(())
}

#[tokio::test]
async fn test_generation_pipeline_requires_organization() -> Result<()> {
    let server = MockServer::start();
    let fetcher = fetcher_for(&server)?;
    let output = TempDir::new()?;

    let pipeline = DatasetPipeline::new(
        fetcher,
        LocalStorage::new(output.path()),
        Dataset::Generation,
        DatasetQuery::new(march(1, 1)),
        vec!["csv".to_string()],
    );
    let err = EtlEngine::new(pipeline).run().await.unwrap_err();

    assert!(matches!(err, EpiasError::ValidationError { .. }));
    assert!(std::fs::read_dir(output.path())?.next().is_none());
    Ok(())
}

#[tokio::test]
async fn test_bilateral_pipeline_pivots_both_sides() -> Result<()> {
    let server = MockServer::start();
    let fetcher = fetcher_for(&server)?;
    server.mock(|when, then| {
        when.method(POST)
            .path("/electricity-service/v1/markets/bilateral-contracts/data/bilateral-contracts-bid-quantity");
        then.status(200).json_body(json!({
            "items": [{"date": "2024-03-01T00:00:00+03:00", "quantity": 100.0}]
        }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/electricity-service/v1/markets/bilateral-contracts/data/bilateral-contracts-offer-quantity");
        then.status(200).json_body(json!({
            "items": [{"date": "2024-03-01T00:00:00+03:00", "quantity": 80.0}]
        }));
    });

    let output = TempDir::new()?;
    let pipeline = DatasetPipeline::new(
        fetcher,
        LocalStorage::new(output.path()),
        Dataset::Bilateral,
        DatasetQuery::new(march(1, 1)),
        vec!["csv".to_string()],
    );
    EtlEngine::new(pipeline).run().await?;

    let archive_path = output.path().join("bilateral_20240301_20240301.zip");
    assert_eq!(zip_entries(&archive_path)?, vec!["bilateral.csv"]);
    Ok(())
}

#[tokio::test]
async fn test_dashboard_failures_become_empty_entries() -> Result<()> {
    let server = MockServer::start();
    let fetcher = fetcher_for(&server)?;
    server.mock(|when, then| {
        when.method(GET)
            .path("/electricity-service/v1/dashboard/day-ahead-market");
        then.status(200).json_body(json!({
            "body": {"data": [
                {"name": "PTF", "value": 2450.5, "change": 1.2, "date": "2024-03-01T00:00:00+03:00"},
                {"name": "Volume", "value": 850000, "change": -0.4}
            ]}
        }));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/electricity-service/v1/dashboard/balancing-power-market");
        then.status(500).body("down");
    });

    let dashboards = fetcher.fetch_dashboard().await;

    assert_eq!(dashboards.len(), 6);
    assert_eq!(dashboards["dam"].len(), 2);
    assert_eq!(dashboards["dam"][0].metric, "PTF");
    assert!(dashboards["bpm"].is_empty());
    assert!(dashboards["weighted_price"].is_empty());
    Ok(())
}

#[tokio::test]
async fn test_overview_tolerates_missing_sections() -> Result<()> {
    let server = MockServer::start();
    let fetcher = fetcher_for(&server)?;
    server.mock(|when, then| {
        when.method(POST)
            .path("/electricity-service/v1/generation/data/uevcb-list")
            .body_contains("\"organizationId\":195");
        then.status(200).json_body(json!({
            "body": {"uevcbList": [{"id": 3205, "name": "SANTRAL-1", "eic": "40W000000000123", "organizationId": 195}]}
        }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/electricity-service/v1/markets/dam/data/mcp");
        then.status(200).json_body(json!({
            "items": [{"date": "2024-03-01T00:00:00+03:00", "hour": "00:00", "price": 2000}]
        }));
    });

    let overview = fetcher.fetch_organization_overview(195, &march(1, 1)).await;

    assert_eq!(overview.uevcb_list.len(), 1);
    assert_eq!(overview.uevcb_list[0].id, 3205);
    assert_eq!(overview.ptf.len(), 1);
    assert!(overview.generation.is_empty());
    assert!(overview.kgup.is_empty());
    assert!(overview.smf.is_empty());
    Ok(())
}
