//! Connection state machine.
//!
//! ```text
//! DISCONNECTED ──connect()──▶ CONNECTING ──opened──▶ CONNECTED
//!      ▲                        │    ▲                  │
//!      │                 failed │    │ backoff          │ clean close → DISCONNECTED
//!      │                        ▼    │ elapsed          │ abnormal close
//!      └──retries exhausted── RECONNECTING ◀────────────┘
//! ```
//!
//! The machine is pure: it decides, the driver task performs the returned
//! [`Action`]. Every transition therefore happens on one logical context.

use std::{fmt, time::Duration};

/// Default delay between reconnect attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(3);

/// Default number of reconnect attempts before giving up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Reconnecting => "RECONNECTING",
        };
        f.write_str(name)
    }
}

/// Fixed-interval reconnect policy with an attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RECONNECT_INTERVAL,
            max_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    /// Open the underlying connection
    Open,
    /// Arm the single reconnect timer
    ScheduleReconnect { attempt: u32, delay: Duration },
    /// Cancel any pending open or timer and close the live connection cleanly
    Close,
    /// Retry budget exhausted; surface a terminal failure
    GiveUp { attempts: u32 },
}

#[derive(Debug)]
pub struct ConnectionStateMachine {
    state: ConnectionState,
    attempts: u32,
    policy: ReconnectPolicy,
}

impl ConnectionStateMachine {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
            policy,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Reconnect attempts made since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// `connect()`: idempotent while CONNECTING or CONNECTED.
    ///
    /// From RECONNECTING the remaining backoff is skipped.
    pub fn connect(&mut self) -> Action {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => Action::None,
            ConnectionState::Disconnected | ConnectionState::Reconnecting => {
                self.attempts = 0;
                self.state = ConnectionState::Connecting;
                Action::Open
            }
        }
    }

    /// The underlying connection finished its handshake.
    pub fn opened(&mut self) -> Action {
        if self.state == ConnectionState::Connecting {
            self.state = ConnectionState::Connected;
            self.attempts = 0;
        }
        Action::None
    }

    /// The connection closed (or failed to open).
    ///
    /// A clean close is terminal; anything else enters the reconnect cycle.
    pub fn closed(&mut self, clean: bool) -> Action {
        match self.state {
            ConnectionState::Connected | ConnectionState::Connecting => {
                if clean {
                    self.state = ConnectionState::Disconnected;
                    self.attempts = 0;
                    Action::None
                } else {
                    self.schedule_reconnect()
                }
            }
            ConnectionState::Disconnected | ConnectionState::Reconnecting => Action::None,
        }
    }

    /// The reconnect timer fired.
    pub fn backoff_elapsed(&mut self) -> Action {
        if self.state == ConnectionState::Reconnecting {
            self.state = ConnectionState::Connecting;
            Action::Open
        } else {
            Action::None
        }
    }

    /// `disconnect()`: deliberate shutdown, never followed by a reconnect.
    pub fn disconnect(&mut self) -> Action {
        let previous = self.state;
        self.state = ConnectionState::Disconnected;
        self.attempts = 0;
        match previous {
            ConnectionState::Disconnected => Action::None,
            _ => Action::Close,
        }
    }

    fn schedule_reconnect(&mut self) -> Action {
        if self.attempts >= self.policy.max_attempts {
            let attempts = self.attempts;
            self.state = ConnectionState::Disconnected;
            self.attempts = 0;
            return Action::GiveUp { attempts };
        }
        self.attempts += 1;
        self.state = ConnectionState::Reconnecting;
        Action::ScheduleReconnect {
            attempt: self.attempts,
            delay: self.policy.interval,
        }
    }
}
