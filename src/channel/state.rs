use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No session, or torn down locally
    Idle,
    Connecting,
    Connected,
    /// Lost the connection; a reconnect is scheduled
    Disconnected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
        };
        f.write_str(label)
    }
}

/// Delay before reconnecting after a connection the client did not close
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Same delay after every close, no cap on attempts
    Fixed(Duration),
    /// Doubling delay from `initial` up to `max`, with jitter
    Backoff { initial: Duration, max: Duration },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::Fixed(Duration::from_secs(5))
    }
}

impl ReconnectPolicy {
    /// Upper bound of the delay after `failures` consecutive failed attempts
    pub fn base_delay(&self, failures: u32) -> Duration {
        match *self {
            ReconnectPolicy::Fixed(delay) => delay,
            ReconnectPolicy::Backoff { initial, max } => {
                let factor = 1_u32.checked_shl(failures.min(16)).unwrap_or(u32::MAX);
                initial.saturating_mul(factor).min(max)
            }
        }
    }

    pub fn delay(&self, failures: u32) -> Duration {
        let base = self.base_delay(failures);
        match self {
            ReconnectPolicy::Fixed(_) => base,
            ReconnectPolicy::Backoff { .. } => {
                // Equal jitter: half fixed, half random
                let half = base / 2;
                let spread = (base - half).as_millis() as u64;
                let extra = if spread == 0 { 0 } else { rand::thread_rng().gen_range(0..=spread) };
                half + Duration::from_millis(extra)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A session became authenticated
    Start,
    HandshakeSucceeded,
    /// Close, error or failed handshake the client did not initiate
    ConnectionLost,
    ReconnectTimerFired,
    /// No credential was available for an attempt
    CredentialMissing,
    /// Session ended or the consumer shut the channel down
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAction {
    Connect,
    ScheduleReconnect(Duration),
    /// Cancel any pending timer and close the socket with code 1000
    Shutdown,
    Nothing,
}

/// Pure transition table of the live channel; the driver performs the actions.
#[derive(Debug)]
pub struct ChannelStateMachine {
    state: ConnectionState,
    policy: ReconnectPolicy,
    failures: u32,
}

impl ChannelStateMachine {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Idle,
            policy,
            failures: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn handle(&mut self, event: ChannelEvent) -> ChannelAction {
        use ConnectionState::*;

        match (self.state, event) {
            (Idle, ChannelEvent::Start) => {
                self.state = Connecting;
                ChannelAction::Connect
            }
            (Connecting, ChannelEvent::HandshakeSucceeded) => {
                self.state = Connected;
                self.failures = 0;
                ChannelAction::Nothing
            }
            (Connecting | Connected, ChannelEvent::ConnectionLost) => {
                self.state = Disconnected;
                let delay = self.policy.delay(self.failures);
                self.failures = self.failures.saturating_add(1);
                ChannelAction::ScheduleReconnect(delay)
            }
            (Disconnected, ChannelEvent::ReconnectTimerFired) => {
                self.state = Connecting;
                ChannelAction::Connect
            }
            (Idle, ChannelEvent::Teardown) => ChannelAction::Nothing,
            (_, ChannelEvent::Teardown) | (_, ChannelEvent::CredentialMissing) => {
                self.state = Idle;
                self.failures = 0;
                ChannelAction::Shutdown
            }
            // Duplicate or late events change nothing
            _ => ChannelAction::Nothing,
        }
    }
}
