//! `/status` SSE ストリームの統合テスト

use std::future::Future;
use std::time::Duration;

use sentinel::api::create_app;
use sentinel::types::{Endpoint, Snapshot};
use sentinel::AppState;

use crate::support::http::{spawn_router, TestServer};
use crate::support::sentinel::{app_state, fast_settings, refused_url, SseClient};

const WAIT: Duration = Duration::from_secs(5);
const TEST_TIMEOUT: Duration = Duration::from_secs(30);

// 停止処理も含めてテスト全体に上限を設ける（ハングを失敗として報告するため）
async fn bounded(body: impl Future<Output = ()>) {
    tokio::time::timeout(TEST_TIMEOUT, body)
        .await
        .expect("test did not finish in time");
}

async fn down_site_state() -> AppState {
    app_state(vec![Endpoint::new("down", "Down", refused_url())], fast_settings()).await
}

// 開いているSSEセッションはハブを閉じるまで終わらないので、閉じてから停止する
async fn shut_down(state: &AppState, server: TestServer) {
    state.hub.close();
    server.stop().await;
}

#[tokio::test]
async fn sse_stream_delivers_cycle_snapshots() {
    bounded(async {
        let state = down_site_state().await;
        let monitor = state.monitor().unwrap();
        let server = spawn_router(create_app(state.clone())).await;

        let mut client = SseClient::connect(&server.url("/status")).await;
        assert_eq!(client.headers()["content-type"], "text/event-stream");
        assert_eq!(client.headers()["cache-control"], "no-cache");
        assert_eq!(client.headers()["x-accel-buffering"], "no");

        monitor.run_cycle(1).await;
        let frame = client.next_frame(WAIT).await.expect("first snapshot");
        assert_eq!(frame.event, None);

        let snapshot: Snapshot = serde_json::from_str(&frame.data).unwrap();
        assert_eq!(snapshot.cycle, 1);
        let site = &snapshot.sites["down"];
        assert_eq!(site.recent_records.len(), 1);
        assert!(!site.recent_records[0].reachable);
        assert_eq!(site.recent_records[0].latency_ms, 0);

        monitor.run_cycle(2).await;
        let frame = client.next_frame(WAIT).await.expect("second snapshot");
        let snapshot: Snapshot = serde_json::from_str(&frame.data).unwrap();
        assert_eq!(snapshot.cycle, 2);
        assert_eq!(snapshot.sites["down"].recent_records.len(), 2);

        shut_down(&state, server).await;
        assert!(client.next_frame(WAIT).await.is_none());
    })
    .await;
}

#[tokio::test]
async fn late_observer_is_seeded_with_latest_snapshot() {
    bounded(async {
        let state = down_site_state().await;
        let monitor = state.monitor().unwrap();
        let server = spawn_router(create_app(state.clone())).await;

        monitor.run_cycle(1).await;
        monitor.run_cycle(2).await;

        let mut client = SseClient::connect(&server.url("/sse")).await;
        let frame = client.next_frame(WAIT).await.expect("seeded snapshot");
        let snapshot: Snapshot = serde_json::from_str(&frame.data).unwrap();
        assert_eq!(snapshot.cycle, 2);

        shut_down(&state, server).await;
    })
    .await;
}

#[tokio::test]
async fn remaining_observers_receive_after_one_disconnects() {
    bounded(async {
        let state = down_site_state().await;
        let monitor = state.monitor().unwrap();
        let server = spawn_router(create_app(state.clone())).await;

        let mut first = SseClient::connect(&server.url("/status")).await;
        let second = SseClient::connect(&server.url("/status")).await;
        let mut third = SseClient::connect(&server.url("/status")).await;
        assert_eq!(state.hub.subscriber_count(), 3);

        drop(second);
        // サーバー側が切断に気づいてセッションを破棄するまで待つ
        tokio::time::timeout(WAIT, async {
            while state.hub.subscriber_count() > 2 {
                monitor.run_cycle(0).await;
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("disconnected observer should be unregistered");
        // 待機中に流れたイベントは読み捨てる
        while first.next_frame(Duration::from_millis(100)).await.is_some() {}
        while third.next_frame(Duration::from_millis(100)).await.is_some() {}

        let report = monitor.run_cycle(1).await;
        let delivery = report.delivery.expect("snapshot should be published");
        assert_eq!(delivery.attempted(), 2);
        assert_eq!(delivery.delivered, 2);

        for client in [&mut first, &mut third] {
            let frame = client.next_frame(WAIT).await.expect("snapshot");
            let snapshot: Snapshot = serde_json::from_str(&frame.data).unwrap();
            assert_eq!(snapshot.cycle, 1);
        }

        drop(first);
        drop(third);
        shut_down(&state, server).await;
    })
    .await;
}

#[tokio::test]
async fn hub_close_ends_open_streams() {
    bounded(async {
        let state = app_state(vec![], fast_settings()).await;
        let server = spawn_router(create_app(state.clone())).await;

        let mut client = SseClient::connect(&server.url("/status")).await;
        state.hub.close();

        assert!(client.next_frame(WAIT).await.is_none());
        server.stop().await;
    })
    .await;
}
