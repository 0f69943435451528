//! ブロードキャストハブ
//!
//! サイクルごとのスナップショットを接続中の全購読者へ配信する。
//!
//! 購読者ごとに有界バッファを持ち、配信は `try_send` のみで行う。
//! 詰まった購読者が `publish` や次のプローブサイクルを止めることはない。
//! 購読者集合のロックは集合の変更と送信先の複製にだけ使い、配信中は保持しない。

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// 購読者ごとの配信バッファのデフォルト容量
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 16;

/// 購読者ID
pub type SubscriberId = u64;

/// バッファが満杯の購読者への対応方針
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackpressurePolicy {
    /// その購読者にはこのイベントを配信しない（次のイベントで追いつく）
    #[default]
    DropLatest,
    /// その購読者を切断する
    Disconnect,
}

impl BackpressurePolicy {
    /// 文字列表現
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DropLatest => "drop",
            Self::Disconnect => "disconnect",
        }
    }
}

impl FromStr for BackpressurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" | "drop_latest" | "drop-latest" => Ok(Self::DropLatest),
            "disconnect" | "close" => Ok(Self::Disconnect),
            other => Err(format!(
                "unknown slow subscriber policy '{}' (expected 'drop' or 'disconnect')",
                other
            )),
        }
    }
}

impl std::fmt::Display for BackpressurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// ハブが配信するイベント
///
/// スナップショットは発行時に一度だけJSON化され、全購読者で共有される。
#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent {
    /// サイクルのスナップショット（JSON）
    Snapshot {
        /// サイクル番号
        cycle: u64,
        /// シリアライズ済みペイロード
        payload: Arc<str>,
    },
    /// サイクル全体でデータを取得できなかった
    CycleFailed {
        /// サイクル番号
        cycle: u64,
        /// 失敗内容
        message: String,
    },
}

impl HubEvent {
    /// 発生元サイクル番号
    pub fn cycle(&self) -> u64 {
        match self {
            Self::Snapshot { cycle, .. } | Self::CycleFailed { cycle, .. } => *cycle,
        }
    }
}

/// 購読者1件への配信結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// バッファに積んだ
    Delivered,
    /// バッファ満杯のため破棄した
    Dropped,
    /// 購読者が切断済み、または切断した
    SubscriberClosed,
}

/// `publish` 1回分の配信結果集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// 配信済み
    pub delivered: usize,
    /// 破棄
    pub dropped: usize,
    /// 切断（集合から除去）
    pub closed: usize,
}

impl PublishReport {
    fn record(&mut self, outcome: DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Delivered => self.delivered += 1,
            DeliveryOutcome::Dropped => self.dropped += 1,
            DeliveryOutcome::SubscriberClosed => self.closed += 1,
        }
    }

    /// 配信を試みた購読者数
    pub fn attempted(&self) -> usize {
        self.delivered + self.dropped + self.closed
    }
}

#[derive(Default)]
struct HubState {
    subscribers: HashMap<SubscriberId, mpsc::Sender<HubEvent>>,
    latest: Option<HubEvent>,
    closed: bool,
}

struct HubInner {
    state: Mutex<HubState>,
    next_id: AtomicU64,
    buffer: usize,
    policy: BackpressurePolicy,
}

impl HubInner {
    // パニックしたスレッドがあっても集合自体は整合しているため、毒化は無視する
    fn state(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: SubscriberId) -> bool {
        self.state().subscribers.remove(&id).is_some()
    }
}

/// ブロードキャストハブ
///
/// クローンは同じ購読者集合を共有する。
#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastHub {
    /// デフォルト設定でハブを作成
    pub fn new() -> Self {
        Self::with_config(DEFAULT_SUBSCRIBER_BUFFER, BackpressurePolicy::default())
    }

    /// バッファ容量とバックプレッシャー方針を指定してハブを作成
    pub fn with_config(buffer: usize, policy: BackpressurePolicy) -> Self {
        Self {
            inner: Arc::new(HubInner {
                state: Mutex::new(HubState::default()),
                next_id: AtomicU64::new(1),
                buffer: buffer.max(1),
                policy,
            }),
        }
    }

    /// 購読を開始
    ///
    /// 直近のスナップショットがあれば最初のイベントとして積まれる。
    /// 発行と同じロック内で行うため、同じスナップショットが二重に届くことはない。
    /// クローズ済みのハブでは、最初から閉じた購読が返る。
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let mut state = self.inner.state();
        if !state.closed {
            if let Some(latest) = &state.latest {
                let _ = tx.try_send(latest.clone());
            }
            state.subscribers.insert(id, tx);
            debug!(
                subscriber_id = id,
                subscribers = state.subscribers.len(),
                "Subscriber registered"
            );
        }
        drop(state);

        Subscription {
            id,
            receiver: rx,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// 購読を解除
    ///
    /// 既に解除済みなら `false`。
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.inner.remove(id)
    }

    /// イベントを全購読者へ配信
    ///
    /// 送信先の複製後にロックを解放してから配信する。ブロックしない。
    pub fn publish(&self, event: HubEvent) -> PublishReport {
        let targets: Vec<(SubscriberId, mpsc::Sender<HubEvent>)> = {
            let mut state = self.inner.state();
            if state.closed {
                return PublishReport::default();
            }
            if matches!(event, HubEvent::Snapshot { .. }) {
                state.latest = Some(event.clone());
            }
            state
                .subscribers
                .iter()
                .map(|(id, tx)| (*id, tx.clone()))
                .collect()
        };

        let mut report = PublishReport::default();
        let mut evicted = Vec::new();

        for (id, tx) in targets {
            let outcome = match tx.try_send(event.clone()) {
                Ok(()) => DeliveryOutcome::Delivered,
                Err(TrySendError::Full(_)) => match self.inner.policy {
                    BackpressurePolicy::DropLatest => {
                        debug!(
                            subscriber_id = id,
                            cycle = event.cycle(),
                            "Subscriber lagging, event dropped"
                        );
                        DeliveryOutcome::Dropped
                    }
                    BackpressurePolicy::Disconnect => {
                        warn!(subscriber_id = id, "Subscriber lagging, disconnecting");
                        evicted.push(id);
                        DeliveryOutcome::SubscriberClosed
                    }
                },
                Err(TrySendError::Closed(_)) => {
                    evicted.push(id);
                    DeliveryOutcome::SubscriberClosed
                }
            };
            report.record(outcome);
        }

        if !evicted.is_empty() {
            let mut state = self.inner.state();
            for id in &evicted {
                state.subscribers.remove(id);
            }
        }

        report
    }

    /// ハブを閉じる（プロセス終了時）
    ///
    /// 全購読者の送信側を破棄するため、各セッションはバッファを読み切った後に終了する。
    pub fn close(&self) {
        let mut state = self.inner.state();
        state.closed = true;
        let count = state.subscribers.len();
        state.subscribers.clear();
        debug!(subscribers = count, "Broadcast hub closed");
    }

    /// クローズ済みか
    pub fn is_closed(&self) -> bool {
        self.inner.state().closed
    }

    /// 現在の購読者数
    pub fn subscriber_count(&self) -> usize {
        self.inner.state().subscribers.len()
    }

    /// 直近に発行したスナップショットのペイロード
    pub fn latest(&self) -> Option<Arc<str>> {
        match &self.inner.state().latest {
            Some(HubEvent::Snapshot { payload, .. }) => Some(payload.clone()),
            _ => None,
        }
    }
}

/// 購読ハンドル
///
/// ドロップ時にハブから自身を除去する。セッションがどの経路で終了しても
/// 購読枠が残らない。
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<HubEvent>,
    hub: Weak<HubInner>,
}

impl Subscription {
    /// 購読者ID
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// 次のイベントを待つ
    ///
    /// ハブが閉じられた、または切断された場合は `None`。
    pub async fn recv(&mut self) -> Option<HubEvent> {
        self.receiver.recv().await
    }

    /// 待たずに取り出す
    pub fn try_recv(&mut self) -> Option<HubEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.hub.upgrade() {
            if inner.remove(self.id) {
                debug!(subscriber_id = self.id, "Subscriber released");
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
