//! プローブ → 永続化 → アップタイム → 配信 の一連の流れ

use std::time::Duration;

use chrono::Utc;
use sentinel::config::MonitorSettings;
use sentinel::events::HubEvent;
use sentinel::types::{Endpoint, Snapshot};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::sentinel::{app_state, fast_settings, refused_url};

#[tokio::test]
async fn every_endpoint_gets_one_record_per_cycle() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let state = app_state(
        vec![
            Endpoint::new("up", "Up", server.uri()),
            Endpoint::new("down", "Down", refused_url()),
        ],
        fast_settings(),
    )
    .await;
    let monitor = state.monitor().unwrap();

    for cycle in 1..=3 {
        let report = monitor.run_cycle(cycle).await;
        assert_eq!(report.recorded, 2);
    }

    for id in ["up", "down"] {
        let records = state.store.recent(id, 60).await.unwrap();
        assert_eq!(records.len(), 3, "{} should have one record per cycle", id);
    }
    let since = Utc::now() - chrono::Duration::hours(1);
    assert_eq!(state.store.count_since("up", since, Some(true)).await.unwrap(), 3);
    assert_eq!(state.store.count_since("down", since, Some(false)).await.unwrap(), 3);
}

#[tokio::test]
async fn uptime_in_snapshot_follows_check_interval() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    // 1時間ウィンドウ・10分間隔 → 想定6サンプル
    let settings = MonitorSettings {
        check_interval: Duration::from_secs(600),
        uptime_window: Duration::from_secs(3600),
        ..fast_settings()
    };
    let state = app_state(vec![Endpoint::new("up", "Up", server.uri())], settings).await;
    let monitor = state.monitor().unwrap();

    monitor.run_cycle(1).await;
    monitor.run_cycle(2).await;
    monitor.run_cycle(3).await;

    let snapshot: Snapshot = serde_json::from_str(&state.hub.latest().unwrap()).unwrap();
    assert!((snapshot.sites["up"].uptime - 50.0).abs() < 1e-9);
}

#[tokio::test]
async fn status_transition_is_visible_in_next_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let state = app_state(vec![Endpoint::new("api", "API", server.uri())], fast_settings()).await;
    let monitor = state.monitor().unwrap();
    let mut sub = state.hub.subscribe();

    monitor.run_cycle(1).await;
    monitor.run_cycle(2).await;

    let mut snapshots = Vec::new();
    for _ in 0..2 {
        match sub.recv().await.unwrap() {
            HubEvent::Snapshot { payload, .. } => {
                snapshots.push(serde_json::from_str::<Snapshot>(&payload).unwrap())
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    assert!(snapshots[0].sites["api"].recent_records[0].reachable);
    let latest = &snapshots[1].sites["api"].recent_records;
    assert_eq!(latest.len(), 2);
    assert!(!latest[0].reachable);
    assert_eq!(latest[0].message, "503 Service Unavailable");
    assert!(latest[1].reachable);
}
