//! 設定ファイル変更の反映

use std::time::Duration;

use sentinel::config::load_sites;
use sentinel::registry::ConfigWatcher;
use sentinel::types::Endpoint;

use crate::support::sentinel::{app_state, fast_settings, refused_url};

fn write_sites(path: &std::path::Path, sites: &[(&str, &str)]) {
    let sites: Vec<serde_json::Value> = sites
        .iter()
        .map(|(name, url)| serde_json::json!({ "name": name, "url": url }))
        .collect();
    std::fs::write(path, serde_json::json!({ "sites": sites }).to_string()).unwrap();
}

#[tokio::test]
async fn reload_adds_sites_without_losing_history() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let down = refused_url();
    write_sites(&path, &[("Main Site", &down)]);

    let state = app_state(load_sites(&path).unwrap(), fast_settings()).await;
    let monitor = state.monitor().unwrap();
    monitor.run_cycle(1).await;

    let watcher = ConfigWatcher::new(
        &path,
        state.registry.clone(),
        Duration::from_millis(50),
        state.shutdown.clone(),
    )
    .start()
    .expect("config watch should start");

    write_sites(&path, &[("Main Site", &down), ("Docs", &down)]);
    tokio::time::timeout(Duration::from_secs(5), async {
        while state.registry.get("docs").await.is_none() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("config change should be picked up");

    monitor.run_cycle(2).await;

    assert_eq!(state.store.recent("main-site", 60).await.unwrap().len(), 2);
    assert_eq!(state.store.recent("docs", 60).await.unwrap().len(), 1);
    assert_eq!(
        state.registry.list().await,
        vec![
            Endpoint::new("main-site", "Main Site", down.clone()),
            Endpoint::new("docs", "Docs", down),
        ]
    );

    state.shutdown.request_shutdown();
    watcher.await.unwrap();
}
