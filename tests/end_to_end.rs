//! Two devices sharing one watchlist through a real server

use std::sync::Arc;
use std::time::Duration;
use watchlist_sync::config::SyncClientConfig;
use watchlist_sync::db::{LocalStore, MemoryLocalStore, SqliteDb};
use watchlist_sync::error::SyncErrorKind;
use watchlist_sync::kv::MemoryKvStore;
use watchlist_sync::server::SyncServer;
use watchlist_sync::state::AppState;
use watchlist_sync::sync::{SyncClient, SyncStatus};
use watchlist_sync::watchlist::{RowField, WatchlistRow, WatchlistStore};

async fn start_server(store: Option<Arc<MemoryKvStore>>) -> (SyncServer, String) {
    let store = store.map(|s| s as Arc<dyn watchlist_sync::kv::KvStore>);
    let state = Arc::new(AppState::new(store, false));
    let mut server = SyncServer::new();
    let addr = server
        .start_with_state("127.0.0.1", 0, state)
        .await
        .unwrap();
    (server, format!("http://{}", addr))
}

fn client_config(base_url: &str) -> SyncClientConfig {
    SyncClientConfig {
        poll_interval: Duration::from_millis(200),
        debounce: Duration::from_millis(50),
        request_timeout: Duration::from_secs(5),
        ..SyncClientConfig::new(base_url).unwrap()
    }
}

fn device(base_url: &str, rows: Vec<WatchlistRow>) -> SyncClient {
    let local = Arc::new(MemoryLocalStore::with_rows(rows));
    let watchlist = Arc::new(WatchlistStore::open(local).unwrap());
    SyncClient::new(&client_config(base_url), watchlist).unwrap()
}

fn tickers(client: &SyncClient) -> Vec<String> {
    client.watchlist().rows().into_iter().map(|r| r.ticker).collect()
}

async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}

#[tokio::test]
async fn test_two_devices_converge() {
    let (mut server, base_url) = start_server(Some(Arc::new(MemoryKvStore::new()))).await;

    let laptop = device(
        &base_url,
        vec![
            WatchlistRow::new("NVDA").with_sector("Semis"),
            WatchlistRow::new("AAPL"),
        ],
    );
    let phone = device(&base_url, vec![WatchlistRow::new("IBM")]);

    let code = laptop.create().await.unwrap();
    assert_eq!(laptop.status(), SyncStatus::On);

    assert_eq!(phone.join(code.as_str()).await.unwrap(), SyncStatus::On);
    assert_eq!(tickers(&phone), vec!["NVDA", "AAPL"]);
    assert_eq!(phone.watchlist().get("NVDA").unwrap().sector, "Semis");

    // Edit on the phone reaches the laptop through push and poll
    phone.watchlist().add(WatchlistRow::new("tsla")).unwrap();
    phone
        .watchlist()
        .update_field("AAPL", RowField::Catalyst, "WWDC")
        .unwrap();

    assert!(wait_for(|| tickers(&laptop) == vec!["TSLA", "NVDA", "AAPL"]).await);
    assert_eq!(laptop.watchlist().get("AAPL").unwrap().catalyst, "WWDC");

    // After leaving, the laptop keeps its list and stops following
    laptop.leave().unwrap();
    phone.watchlist().remove("NVDA").unwrap();
    assert_eq!(phone.flush().await, SyncStatus::On);
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(tickers(&laptop), vec!["TSLA", "NVDA", "AAPL"]);
    assert_eq!(laptop.status(), SyncStatus::Off);

    phone.shutdown();
    server.shutdown().await;
}

#[tokio::test]
async fn test_unconfigured_server() {
    let (mut server, base_url) = start_server(None).await;
    let client = device(&base_url, vec![WatchlistRow::new("AAPL")]);

    assert_eq!(client.join("ABCDEF12").await.unwrap(), SyncStatus::Error);
    assert_eq!(client.snapshot().last_error, Some(SyncErrorKind::NotConfigured));
    assert_eq!(tickers(&client), vec!["AAPL"]);

    assert!(client.join("bad code!").await.is_err());

    client.shutdown();
    server.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_server_then_recovery() {
    let (mut server, base_url) = start_server(Some(Arc::new(MemoryKvStore::new()))).await;
    let port = base_url.rsplit(':').next().unwrap().parse::<u16>().unwrap();
    server.shutdown().await;

    let client = device(&base_url, vec![WatchlistRow::new("AAPL")]);
    assert_eq!(client.join("ABCDEF12").await.unwrap(), SyncStatus::Error);
    assert_eq!(client.snapshot().last_error, Some(SyncErrorKind::Transient));
    assert_eq!(tickers(&client), vec!["AAPL"]);

    // Same port comes back; the next poll completes the join
    let state = Arc::new(AppState::new(Some(Arc::new(MemoryKvStore::new())), false));
    let mut server = SyncServer::new();
    if server.start_with_state("127.0.0.1", port, state).await.is_err() {
        // Port taken by someone else meanwhile
        client.shutdown();
        return;
    }

    assert!(wait_for(|| client.status() == SyncStatus::On).await);
    assert!(tickers(&client).is_empty());

    client.shutdown();
    server.shutdown().await;
}

#[tokio::test]
async fn test_resume_from_sqlite_persistence() {
    let (mut server, base_url) = start_server(Some(Arc::new(MemoryKvStore::new()))).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("device.db");

    let code = {
        let local = Arc::new(SqliteDb::new(&path).unwrap());
        let watchlist = Arc::new(WatchlistStore::open(local).unwrap());
        watchlist.add(WatchlistRow::new("MSFT")).unwrap();
        let client = SyncClient::new(&client_config(&base_url), watchlist).unwrap();
        let code = client.create().await.unwrap();
        client.shutdown();
        code
    };

    let local = Arc::new(SqliteDb::new(&path).unwrap());
    assert_eq!(local.load_sync_id().unwrap().as_deref(), Some(code.as_str()));

    let watchlist = Arc::new(WatchlistStore::open(local).unwrap());
    let client = SyncClient::new(&client_config(&base_url), watchlist).unwrap();
    assert_eq!(client.resume().await.unwrap(), Some(SyncStatus::On));
    assert_eq!(tickers(&client), vec!["MSFT"]);

    client.shutdown();
    server.shutdown().await;
}

#[tokio::test]
async fn test_join_record_written_by_loose_client() {
    let (mut server, base_url) = start_server(Some(Arc::new(MemoryKvStore::new()))).await;

    let response = reqwest::Client::new()
        .put(format!("{}/sync?id=ABCDEF12", base_url))
        .json(&serde_json::json!({
            "rows": [{"ticker": "NVDA", "name": null, "sector": 42}]
        }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let client = device(&base_url, vec![WatchlistRow::new("IBM")]);
    assert_eq!(client.join("ABCDEF12").await.unwrap(), SyncStatus::On);
    assert_eq!(tickers(&client), vec!["NVDA"]);
    let row = client.watchlist().get("NVDA").unwrap();
    assert_eq!(row.name, "");
    assert_eq!(row.sector, "42");

    // Later polls keep succeeding
    assert_eq!(client.poll_once().await, SyncStatus::On);

    client.shutdown();
    server.shutdown().await;
}
