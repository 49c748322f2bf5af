//! StateStore end to end: local persistence, debounced uploads to a real
//! key/value server and hydration from share links.

mod common;

use instances_link::{
    EventHandlers, FilePageStorage, KvClient, LinkConfig, Location, MemoryLocation,
    MemoryPageStorage, PageStorage, StateField, StateStore, SyncErrorKind,
};
use instances_link::models::{ColumnFilter, SortRule};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn config(server: &common::RunningKvServer) -> LinkConfig {
    LinkConfig::builder()
        .kv_url(server.kv_url())
        .asset_base_url(server.asset_base_url())
        .write_debounce_ms(50)
        .build()
        .unwrap()
}

fn store(
    config: &LinkConfig,
    storage: Arc<dyn PageStorage>,
    location: Arc<MemoryLocation>,
    handlers: EventHandlers,
) -> StateStore {
    StateStore::builder()
        .config(config.clone())
        .storage(storage)
        .remote(Arc::new(KvClient::from_config(config).unwrap()))
        .location(location)
        .event_handlers(handlers)
        .build()
        .unwrap()
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..250 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not met within 5s");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_share_link_round_trip_between_sessions() {
    let server = common::run_kv_server().await.expect("start kv server");
    let config = config(&server);

    // Session A edits the Azure page.
    let location_a = Arc::new(MemoryLocation::new("https://instances.vantage.sh/azure").unwrap());
    let a = store(
        &config,
        Arc::new(MemoryPageStorage::new()),
        location_a.clone(),
        EventHandlers::new(),
    );
    a.wait_for_hydration("/azure").await;
    let page = a.path("/azure");
    page.set_currency("EUR");
    page.set_region("westeurope").unwrap();
    page.set_column_filter("GPU", ">=1").unwrap();
    page.set_sort(vec![SortRule::ascending("cost-ondemand")]).unwrap();
    page.set_compare_on(true).unwrap();
    page.set_selected(vec!["Standard_NC6".to_string()]).unwrap();

    wait_until(|| location_a.share_id().is_some()).await;
    assert_eq!(server.state.write_count(), 1);
    let shared = location_a.href();

    // Session B opens the shared link with empty storage.
    let location_b = Arc::new(MemoryLocation::from_url(shared));
    let b = store(
        &config,
        Arc::new(MemoryPageStorage::new()),
        location_b,
        EventHandlers::new(),
    );
    b.wait_for_hydration("/azure").await;

    let page_b = b.path("/azure");
    assert_eq!(page_b.region(), "westeurope");
    assert_eq!(page_b.columns(), vec![ColumnFilter::new("GPU", ">=1")]);
    assert_eq!(page_b.sort(), vec![SortRule::ascending("cost-ondemand")]);
    assert!(page_b.compare_on());
    assert_eq!(page_b.selected(), vec!["Standard_NC6".to_string()]);
    assert_eq!(b.currency(), "EUR");
    let mut expected = a.snapshot("/azure");
    expected.currency = None;
    assert_eq!(b.snapshot("/azure"), expected);

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_burst_of_edits_uploads_once() {
    let server = common::run_kv_server().await.expect("start kv server");
    let config = config(&server);
    let location = Arc::new(MemoryLocation::new("https://instances.vantage.sh/redshift").unwrap());
    let share_ids = Arc::new(Mutex::new(Vec::new()));
    let handlers = {
        let share_ids = share_ids.clone();
        EventHandlers::new().on_share_id(move |path, id| {
            share_ids.lock().push((path.to_string(), id.to_string()))
        })
    };
    let s = store(&config, Arc::new(MemoryPageStorage::new()), location.clone(), handlers);
    s.wait_for_hydration("/redshift").await;

    for filter in ["r", "ra", "ra3", "ra3.", "ra3.x"] {
        s.set("/redshift", StateField::Filter, json!(filter)).unwrap();
    }
    wait_until(|| !share_ids.lock().is_empty()).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(server.state.write_count(), 1);
    let id = location.share_id().unwrap();
    assert_eq!(*share_ids.lock(), vec![("/redshift".to_string(), id.clone())]);
    let record: serde_json::Value =
        serde_json::from_str(&server.state.record(&id).unwrap()).unwrap();
    assert_eq!(record["filter"], "ra3.x");
    assert_eq!(record["currency"], "USD");

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_upload_keeps_local_copy() {
    let server = common::run_kv_server().await.expect("start kv server");
    server.state.set_fail_writes(true);
    let config = config(&server);
    let location = Arc::new(MemoryLocation::new("https://instances.vantage.sh/").unwrap());
    let errors = Arc::new(Mutex::new(Vec::new()));
    let handlers = {
        let errors = errors.clone();
        EventHandlers::new().on_error(move |e| errors.lock().push(e))
    };
    let storage = Arc::new(MemoryPageStorage::new());
    let s = store(&config, storage.clone(), location.clone(), handlers);

    s.path("/").set_filter("m7i").unwrap();
    wait_until(|| !errors.lock().is_empty()).await;

    assert_eq!(errors.lock()[0].kind, SyncErrorKind::RemoteWrite);
    assert!(errors.lock()[0].message.contains("503"));
    assert!(location.share_id().is_none());
    assert!(storage.get_item("gstate-/").unwrap().unwrap().contains("m7i"));

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_legacy_url_replaced_by_share_id() {
    let server = common::run_kv_server().await.expect("start kv server");
    let config = config(&server);
    let location = Arc::new(
        MemoryLocation::new(
            "https://instances.vantage.sh/azure?region=westus&savings_plan_term=yrTerm3Savings.hybridBenefit&ref=blog",
        )
        .unwrap(),
    );
    let s = store(&config, Arc::new(MemoryPageStorage::new()), location.clone(), EventHandlers::new());

    s.wait_for_hydration("/azure").await;

    let page = s.path("/azure");
    assert_eq!(page.region(), "westus");
    assert_eq!(page.reserved_term(), "yrTerm3Standard.hybridBenefit");
    let id = location.share_id().expect("share id after migration");
    assert_eq!(
        location.href().as_str(),
        format!("https://instances.vantage.sh/azure?ref=blog&id={}", id)
    );
    let record: serde_json::Value =
        serde_json::from_str(&server.state.record(&id).unwrap()).unwrap();
    assert_eq!(record["region"], "westus");

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_file_storage_survives_restart() {
    let server = common::run_kv_server().await.expect("start kv server");
    let config = config(&server);
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("page-storage.toml");

    {
        let storage = Arc::new(FilePageStorage::with_path(&file).unwrap());
        let location = Arc::new(MemoryLocation::new("https://instances.vantage.sh/cache").unwrap());
        let s = store(&config, storage, location, EventHandlers::new());
        s.path("/cache").set_cost_duration("monthly").unwrap();
        s.set_currency("INR");
    }

    let storage = Arc::new(FilePageStorage::with_path(&file).unwrap());
    let location = Arc::new(MemoryLocation::new("https://instances.vantage.sh/cache").unwrap());
    let s = store(&config, storage, location, EventHandlers::new());

    assert_eq!(s.path("/cache").cost_duration(), "monthly");
    assert_eq!(s.currency(), "INR");

    server.shutdown().await;
}
