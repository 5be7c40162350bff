//! Database initialization and filing table tests against a real SQLite file

use bw_common::db::{init_database, FilingRepository, FilingStore};
use bw_common::CanonicalFiling;
use chrono::Utc;

fn sample(accession: &str) -> CanonicalFiling {
    CanonicalFiling {
        accession_number: accession.to_string(),
        form_type: "8-K".to_string(),
        filed_at: Utc::now(),
        ticker: None,
        cik: "1001".to_string(),
        company_name: "Sample Inc".to_string(),
        filing_link: "https://www.sec.gov/".to_string(),
        summary: Some("A ransomware incident.".to_string()),
        imported_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("sec_filings_db.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_filings_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sec_filings_db.db");

    let pool = init_database(&db_path).await.unwrap();
    let repo = FilingRepository::open(pool.clone(), "item_1_05_breaches")
        .await
        .unwrap();
    repo.upsert(&sample("0000000001-24-000001")).await.unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.unwrap();
    let repo = FilingRepository::open(pool, "item_1_05_breaches")
        .await
        .unwrap();

    assert_eq!(repo.count().await.unwrap(), 1);
    let stored = repo.get("0000000001-24-000001").await.unwrap().unwrap();
    assert_eq!(stored.summary.as_deref(), Some("A ransomware incident."));
}

#[tokio::test]
async fn test_collections_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("db.db")).await.unwrap();

    let breaches = FilingRepository::open(pool.clone(), "breaches").await.unwrap();
    let archive = FilingRepository::open(pool, "archive").await.unwrap();
    breaches.upsert(&sample("x")).await.unwrap();

    assert_eq!(breaches.count().await.unwrap(), 1);
    assert_eq!(archive.count().await.unwrap(), 0);
}
