/*
[INPUT]:  ConnectionState, ConnectionEvent
[OUTPUT]: Validated transitions for the wallet connection lifecycle
[POS]:    Auth layer - state machine shared by connector and context
[UPDATE]: When connection states or transitions change
*/

use crate::http::{Result, WalletError};

/// Wallet connection lifecycle states
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Authenticating,
    Authenticated,
    /// Failure with the error code that caused it
    Error(String),
}

impl ConnectionState {
    /// Short text for a connection status indicator
    pub fn status_label(&self) -> String {
        match self {
            ConnectionState::Disconnected => "Not connected".to_string(),
            ConnectionState::Connecting => "Connecting".to_string(),
            ConnectionState::Connected => "Connected".to_string(),
            ConnectionState::Authenticating => "Waiting for signature".to_string(),
            ConnectionState::Authenticated => "Wallet verified".to_string(),
            ConnectionState::Error(code) => format!("Error ({code})"),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connected
                | ConnectionState::Authenticating
                | ConnectionState::Authenticated
        )
    }
}

/// Events that can trigger connection state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connect,
    Enabled,
    Authenticate,
    Verified,
    Disconnect,
    Retry,
    Fail(String),
}

/// State machine guarding the connection lifecycle
#[derive(Debug, Default)]
pub struct ConnectionStateMachine {
    current_state: ConnectionState,
}

impl ConnectionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if `event` is allowed from the current state
    pub fn can_transition(&self, event: &ConnectionEvent) -> bool {
        use ConnectionEvent as E;
        use ConnectionState as S;

        matches!(
            (&self.current_state, event),
            (S::Disconnected, E::Connect)
                | (S::Connecting, E::Enabled)
                | (S::Connected, E::Authenticate)
                | (S::Authenticated, E::Authenticate)
                | (S::Authenticating, E::Verified)
                | (S::Connected, E::Disconnect)
                | (S::Authenticated, E::Disconnect)
                | (S::Error(_), E::Retry)
                | (_, E::Fail(_))
        )
    }

    /// Perform a state transition
    pub fn transition(&mut self, event: ConnectionEvent) -> Result<&ConnectionState> {
        use ConnectionEvent as E;
        use ConnectionState as S;

        if !self.can_transition(&event) {
            return Err(WalletError::InvalidTransition {
                from: self.current_state.clone(),
                event,
            });
        }

        self.current_state = match event {
            E::Connect => S::Connecting,
            E::Enabled => S::Connected,
            E::Authenticate => S::Authenticating,
            E::Verified => S::Authenticated,
            E::Disconnect | E::Retry => S::Disconnected,
            E::Fail(code) => S::Error(code),
        };
        Ok(&self.current_state)
    }

    /// Get the current state
    pub fn state(&self) -> &ConnectionState {
        &self.current_state
    }
}
