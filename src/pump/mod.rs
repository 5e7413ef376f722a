//! The update pump: drives the engine from the two upstream channels.
//!
//! A push WebSocket delivers change notifications; while it is down, a
//! polling timer stands in. Either way every trigger is the same thing
//! — one full snapshot fetch run through the engine, published on a
//! watch channel. Reconnects use a fixed backoff; polling keeps running
//! through the backoff window so the board never goes stale quietly.

pub mod state;

mod push;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::client::models::Snapshot;
use crate::client::{DetailsCache, DetailsSource, SnapshotSource};
use crate::config::Config;
use crate::engine::view::{assemble, build_jobs, QueueView};
use crate::observability::Metrics as RuntimeMetrics;

use state::{classify_message, ChannelState, PumpAction, PumpMachine};

pub use state::PushKind;

pub struct UpdatePump<S> {
    config: Config,
    ws_url: String,
    source: Arc<S>,
    cache: DetailsCache,
    metrics: Arc<RuntimeMetrics>,
    machine: PumpMachine,
    seen: HashSet<String>,
    had_connection: bool,
    view_tx: watch::Sender<Arc<QueueView>>,
}

impl<S> UpdatePump<S>
where
    S: SnapshotSource + DetailsSource,
{
    pub fn new(
        config: &Config,
        source: S,
        metrics: Arc<RuntimeMetrics>,
    ) -> (Self, watch::Receiver<Arc<QueueView>>) {
        let (view_tx, view_rx) = watch::channel(Arc::new(QueueView::default()));
        let pump = Self {
            ws_url: config.upstream.effective_ws_url(),
            config: config.clone(),
            source: Arc::new(source),
            cache: DetailsCache::new(),
            metrics,
            machine: PumpMachine::new(),
            seen: HashSet::new(),
            had_connection: false,
            view_tx,
        };
        (pump, view_rx)
    }

    /// Run until every view receiver is gone.
    pub async fn run(mut self) {
        info!(ws_url = %self.ws_url, "update pump starting");
        self.refresh().await;

        let mut poll = interval(self.config.pump.poll_interval());
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        poll.tick().await; // the immediate first tick; the initial refresh covered it

        loop {
            if self.view_tx.is_closed() {
                info!("all view receivers dropped, update pump stopping");
                return;
            }

            self.machine.on_connect_attempt();
            match push::connect(&self.ws_url).await {
                Ok(stream) => {
                    if self.had_connection {
                        self.metrics.reconnect();
                    }
                    self.had_connection = true;
                    let actions = self.machine.on_connected();
                    self.apply(&actions).await;
                    self.drive_connected(stream).await;
                }
                Err(error) => {
                    warn!(%error, "push channel unavailable");
                }
            }

            let actions = self.machine.on_disconnected();
            self.apply(&actions).await;

            // backoff window: polling continues while we wait
            let delay = sleep(self.config.pump.reconnect_delay());
            tokio::pin!(delay);
            loop {
                tokio::select! {
                    _ = &mut delay => {
                        self.machine.on_reconnect_due();
                        break;
                    }
                    _ = poll.tick() => {
                        let actions = self.machine.on_poll_tick();
                        self.apply(&actions).await;
                    }
                }
            }
        }
    }

    /// Pump the socket until it closes or errors.
    async fn drive_connected(&mut self, mut stream: push::WsStream) {
        let mut heartbeat = interval(self.config.pump.heartbeat_interval());
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Skip);
        heartbeat.tick().await;

        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        match classify_message(&text) {
                            Some(kind) => {
                                self.metrics.push_message();
                                debug!(?kind, "push notification");
                                let actions = self.machine.on_message(kind);
                                self.apply(&actions).await;
                            }
                            None => debug!("ignoring unrecognised push frame"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("push channel closed by upstream");
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        warn!(%error, "push channel read failed");
                        return;
                    }
                },
                _ = heartbeat.tick() => {
                    if let Err(error) = stream.send(Message::Ping(Vec::new())).await {
                        warn!(%error, "push channel ping failed");
                        return;
                    }
                }
            }
        }
    }

    async fn apply(&mut self, actions: &[PumpAction]) {
        for action in actions {
            match action {
                PumpAction::Refresh => self.refresh().await,
                // polling and reconnect timers live in `run`; the machine
                // only gates them through `on_poll_tick`/`on_reconnect_due`
                PumpAction::StartPolling
                | PumpAction::StopPolling
                | PumpAction::ScheduleReconnect => {
                    debug!(?action, state = ?self.machine.state(), "pump transition");
                }
            }
        }
    }

    /// One full pipeline run: fetch, build, enrich, assemble, publish.
    async fn refresh(&mut self) {
        let now = Utc::now();
        match self.source.fetch_snapshot().await {
            Ok(snapshot) => {
                if matches!(snapshot, Snapshot::Aggregated(_)) {
                    self.metrics.legacy_fallback();
                }
                let mut built = build_jobs(&snapshot, now);
                self.cache.hydrate(self.source.as_ref(), &mut built.jobs).await;

                let view = assemble(built, &self.seen, now);
                self.seen
                    .extend(view.queue.iter().map(|j| j.key.to_string()));
                self.seen
                    .extend(view.completed.iter().map(|j| j.key.to_string()));

                self.metrics.refresh_completed();
                debug!(
                    queue = view.queue.len(),
                    live = view.live.len(),
                    completed = view.completed.len(),
                    "view published"
                );
                self.view_tx.send_replace(Arc::new(view));
            }
            Err(error) => {
                self.metrics.refresh_failed();
                error!(%error, "snapshot refresh failed");
                self.view_tx
                    .send_replace(Arc::new(QueueView::failed(error.to_string(), now)));
            }
        }
    }

    pub fn channel_state(&self) -> ChannelState {
        self.machine.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::models::EventSnapshot;
    use crate::client::ClientError;
    use crate::engine::model::OsDetails;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedSource {
        snapshots: Mutex<Vec<Result<Snapshot, ClientError>>>,
    }

    impl ScriptedSource {
        fn new(snapshots: Vec<Result<Snapshot, ClientError>>) -> Self {
            Self {
                snapshots: Mutex::new(snapshots),
            }
        }
    }

    #[async_trait]
    impl SnapshotSource for ScriptedSource {
        async fn fetch_snapshot(&self) -> Result<Snapshot, ClientError> {
            let mut snapshots = self.snapshots.lock().unwrap();
            if snapshots.is_empty() {
                Ok(Snapshot::Events(EventSnapshot::default()))
            } else {
                snapshots.remove(0)
            }
        }
    }

    #[async_trait]
    impl DetailsSource for ScriptedSource {
        async fn fetch_details(
            &self,
            _nr_os: &str,
            _ano: &str,
        ) -> Result<Option<OsDetails>, ClientError> {
            Ok(None)
        }
    }

    fn events_snapshot(value: serde_json::Value) -> Snapshot {
        Snapshot::Events(EventSnapshot::from_value(&value).unwrap())
    }

    #[tokio::test]
    async fn test_refresh_publishes_view() {
        let source = ScriptedSource::new(vec![Ok(events_snapshot(json!({
            "tickets": [{"name": "T1", "status": "Printing", "nr_os": "1", "ano": "2024"}],
            "paths": []
        })))]);
        let (mut pump, view_rx) =
            UpdatePump::new(&Config::default(), source, Arc::new(RuntimeMetrics::new()));

        pump.refresh().await;

        let view = view_rx.borrow().clone();
        assert_eq!(view.queue.len(), 1);
        assert_eq!(view.live.len(), 1);
        assert!(view.last_error.is_none());
    }

    #[tokio::test]
    async fn test_failed_refresh_publishes_error_view() {
        let source = ScriptedSource::new(vec![Err(ClientError::AllEndpointsFailed {
            primary: "timeout".to_string(),
            fallback: "refused".to_string(),
        })]);
        let metrics = Arc::new(RuntimeMetrics::new());
        let (mut pump, view_rx) = UpdatePump::new(&Config::default(), source, metrics.clone());

        pump.refresh().await;

        let view = view_rx.borrow().clone();
        assert!(view.last_error.is_some());
        assert_eq!(metrics.snapshot().refreshes_failed, 1);
    }

    #[tokio::test]
    async fn test_is_new_cleared_on_second_sight() {
        let payload = json!({
            "tickets": [{"name": "T1", "status": "Ready", "nr_os": "1", "ano": "2024"}],
            "paths": []
        });
        let source = ScriptedSource::new(vec![
            Ok(events_snapshot(payload.clone())),
            Ok(events_snapshot(payload)),
        ]);
        let (mut pump, view_rx) =
            UpdatePump::new(&Config::default(), source, Arc::new(RuntimeMetrics::new()));

        pump.refresh().await;
        assert!(view_rx.borrow().queue[0].is_new);

        pump.refresh().await;
        assert!(!view_rx.borrow().queue[0].is_new);
    }

    #[tokio::test]
    async fn test_fallback_counted() {
        let source = ScriptedSource::new(vec![Ok(Snapshot::Aggregated(
            serde_json::from_value(json!({"queue": [], "printed": []})).unwrap(),
        ))]);
        let metrics = Arc::new(RuntimeMetrics::new());
        let (mut pump, _view_rx) = UpdatePump::new(&Config::default(), source, metrics.clone());

        pump.refresh().await;

        let snap = metrics.snapshot();
        assert_eq!(snap.legacy_fallbacks, 1);
        assert_eq!(snap.refreshes_completed, 1);
    }
}
