//! Push-channel state machine.
//!
//! Pure transition logic: every event returns the list of actions the
//! driver must perform, so timer discipline (polling stops exactly once
//! per connect, one reconnect pending at a time) is testable without a
//! socket.

use serde::Deserialize;

/// Connection lifecycle of the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Connected,
    Disconnected,
    Reconnecting,
}

/// Side effects the driver performs in response to a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpAction {
    StartPolling,
    StopPolling,
    ScheduleReconnect,
    Refresh,
}

/// Push message types that trigger a refresh. Anything else on the
/// socket is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushKind {
    SystemUpdate,
    QueueUpdate,
}

const MESSAGE_KINDS: &[(&str, PushKind)] = &[
    ("system_update", PushKind::SystemUpdate),
    ("pcp_queue_update", PushKind::QueueUpdate),
];

#[derive(Debug, Deserialize)]
struct PushEnvelope {
    #[serde(rename = "type")]
    kind: String,
}

/// Classify one text frame. `None` for unparseable frames and unknown
/// message types alike.
pub fn classify_message(text: &str) -> Option<PushKind> {
    let envelope: PushEnvelope = serde_json::from_str(text).ok()?;
    MESSAGE_KINDS
        .iter()
        .find(|(name, _)| *name == envelope.kind)
        .map(|(_, kind)| *kind)
}

#[derive(Debug)]
pub struct PumpMachine {
    state: ChannelState,
    polling: bool,
    reconnect_pending: bool,
}

impl PumpMachine {
    /// Starts disconnected with polling active, so the board has data
    /// even if the socket never comes up.
    pub fn new() -> Self {
        Self {
            state: ChannelState::Disconnected,
            polling: true,
            reconnect_pending: false,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn on_connect_attempt(&mut self) {
        self.state = ChannelState::Connecting;
    }

    /// Socket established: stop the polling fallback, drop any pending
    /// reconnect, and refresh immediately to catch up on missed pushes.
    pub fn on_connected(&mut self) -> Vec<PumpAction> {
        self.state = ChannelState::Connected;
        let mut actions = Vec::new();
        if self.polling {
            self.polling = false;
            actions.push(PumpAction::StopPolling);
        }
        self.reconnect_pending = false;
        actions.push(PumpAction::Refresh);
        actions
    }

    /// Socket lost (or the connect attempt failed): resume polling and
    /// schedule one reconnect. Repeated disconnect events while already
    /// down change nothing.
    pub fn on_disconnected(&mut self) -> Vec<PumpAction> {
        self.state = ChannelState::Disconnected;
        let mut actions = Vec::new();
        if !self.polling {
            self.polling = true;
            actions.push(PumpAction::StartPolling);
        }
        if !self.reconnect_pending {
            self.reconnect_pending = true;
            actions.push(PumpAction::ScheduleReconnect);
        }
        actions
    }

    /// The reconnect backoff elapsed; the driver should attempt a
    /// connect next.
    pub fn on_reconnect_due(&mut self) {
        self.reconnect_pending = false;
        self.state = ChannelState::Reconnecting;
    }

    /// Any recognised push message means state changed upstream; the
    /// payload itself is never trusted, only used as a refresh trigger.
    pub fn on_message(&mut self, _kind: PushKind) -> Vec<PumpAction> {
        vec![PumpAction::Refresh]
    }

    /// Poll ticks only refresh while the fallback is active; a stray
    /// tick after the socket came up is dropped.
    pub fn on_poll_tick(&self) -> Vec<PumpAction> {
        if self.polling {
            vec![PumpAction::Refresh]
        } else {
            Vec::new()
        }
    }
}

impl Default for PumpMachine {
    fn default() -> Self {
        Self::new()
    }
}
