/*
[INPUT]:  LittlefishClient, WalletConnector, user actions (login, connect, sign, refresh)
[OUTPUT]: Cached user and wallet state driven through the connection state machine
[POS]:    Auth layer - explicit per-session wallet context (replaces global state)
[UPDATE]: When the connect/authenticate workflow or cached state changes
*/

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::challenge::{Challenge, ChallengeGenerator};
use super::connector::WalletConnector;
use super::state_machine::{ConnectionEvent, ConnectionState, ConnectionStateMachine};
use crate::http::{LittlefishClient, Result, WalletError};
use crate::types::{HandleResolution, User, WalletAuthRequest, WalletDescriptor, WalletInfo};

/// Wallet and user state for one application session.
///
/// Create one at start-up and drop it (after [`WalletContext::logout`]) at
/// teardown. Nothing here is global.
#[derive(Debug)]
pub struct WalletContext {
    client: LittlefishClient,
    connector: WalletConnector,
    challenges: ChallengeGenerator,
    machine: ConnectionStateMachine,
    cancel: CancellationToken,
    user: Option<User>,
    wallet: Option<WalletInfo>,
    last_wallet: Option<String>,
}

impl WalletContext {
    pub fn new(client: LittlefishClient, connector: WalletConnector) -> Self {
        Self {
            client,
            connector,
            challenges: ChallengeGenerator::default(),
            machine: ConnectionStateMachine::new(),
            cancel: CancellationToken::new(),
            user: None,
            wallet: None,
            last_wallet: None,
        }
    }

    pub fn with_challenge_generator(mut self, challenges: ChallengeGenerator) -> Self {
        self.challenges = challenges;
        self
    }

    /// Restore the remembered wallet name (the only thing ever persisted)
    pub fn with_last_wallet(mut self, name: Option<String>) -> Self {
        self.last_wallet = name;
        self
    }

    pub fn client(&self) -> &LittlefishClient {
        &self.client
    }

    pub fn state(&self) -> &ConnectionState {
        self.machine.state()
    }

    pub fn status_label(&self) -> String {
        self.machine.state().status_label()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn wallet_info(&self) -> Option<&WalletInfo> {
        self.wallet.as_ref()
    }

    pub fn last_wallet(&self) -> Option<&str> {
        self.last_wallet.as_deref()
    }

    pub fn list_available(&self) -> Vec<WalletDescriptor> {
        self.connector.list_available()
    }

    /// Token that aborts the wallet prompt currently in flight
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn fail(&mut self, error: WalletError) -> WalletError {
        let _ = self
            .machine
            .transition(ConnectionEvent::Fail(error.code().to_string()));
        error
    }

    /// Credential login; wallet linking requires this first
    pub async fn login(&mut self, username: &str, password: &str) -> Result<&User> {
        let user = self.client.login(username, password).await?;
        info!(user_id = user.id, "Logged in");
        Ok(&*self.user.insert(user))
    }

    /// Enable `name` and pull fresh wallet info.
    ///
    /// A failed refresh is logged and does not fail the connection.
    pub async fn connect(&mut self, name: &str) -> Result<()> {
        if self.machine.state().is_connected() {
            self.connector.disconnect();
            self.machine.transition(ConnectionEvent::Disconnect)?;
        }
        self.machine.transition(ConnectionEvent::Connect)?;

        if let Err(e) = self.connector.enable(name).await {
            warn!(wallet = %name, error = %e, "Wallet connection failed");
            return Err(self.fail(e));
        }
        self.machine.transition(ConnectionEvent::Enabled)?;
        self.last_wallet = Some(name.to_string());

        if let Err(e) = self.refresh().await {
            warn!(wallet = %name, error = %e, "Wallet refresh after connect failed");
        }
        Ok(())
    }

    /// Reconnect to the remembered wallet if it is still installed
    pub async fn auto_connect(&mut self) -> bool {
        let Some(name) = self.last_wallet.clone() else {
            return false;
        };
        if *self.machine.state() != ConnectionState::Disconnected {
            return false;
        }
        if !self.list_available().iter().any(|w| w.name == name) {
            info!(wallet = %name, "Remembered wallet no longer available");
            self.last_wallet = None;
            return false;
        }
        match self.connect(&name).await {
            Ok(()) => true,
            Err(e) => {
                warn!(wallet = %name, error = %e, "Auto-connect failed");
                false
            }
        }
    }

    /// Sign a fresh challenge and link the wallet to the logged-in user
    pub async fn authenticate(&mut self) -> Result<&User> {
        let challenge = self.challenges.generate();
        self.authenticate_with(&challenge).await
    }

    /// Sign `challenge` and link the wallet; the cached user is replaced by
    /// the server's copy
    pub async fn authenticate_with(&mut self, challenge: &Challenge) -> Result<&User> {
        if !self.connector.is_enabled() {
            return Err(WalletError::NotConnected);
        }
        self.machine.transition(ConnectionEvent::Authenticate)?;
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }

        let signed = async {
            let address = self.connector.address().await?;
            let signature = self.connector.authenticate(challenge, &self.cancel).await?;
            let request = WalletAuthRequest::new(&address, &challenge.message, &signature);
            self.client.wallet_auth(&request).await
        }
        .await;

        match signed {
            Ok(response) => {
                self.machine.transition(ConnectionEvent::Verified)?;
                info!(user_id = response.user.id, "Wallet linked");
                Ok(&*self.user.insert(response.user))
            }
            Err(e) => {
                warn!(error = %e, "Wallet authentication failed");
                Err(self.fail(e))
            }
        }
    }

    /// Re-read address, balance and handle for the connected wallet
    pub async fn refresh(&mut self) -> Result<&WalletInfo> {
        let name = self
            .connector
            .wallet_name()
            .ok_or(WalletError::NotConnected)?
            .to_string();
        let address = self.connector.address().await?;
        let network = self.connector.network().await?;
        let reward_address = self.connector.reward_address().await?;

        let balance = self.client.address_balance(&address).await?;
        let handle = match self.client.handle(&address).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "Handle refresh failed");
                HandleResolution::unavailable(e.to_string())
            }
        };

        Ok(&*self.wallet.insert(WalletInfo {
            name,
            address,
            handle: handle.handle,
            handles: handle.handles.unwrap_or_default(),
            balance,
            network,
            reward_address,
            refreshed_at: Utc::now(),
        }))
    }

    /// Drop the wallet binding for this session and forget the wallet
    pub async fn disconnect(&mut self) -> Result<()> {
        if *self.machine.state() == ConnectionState::Authenticated {
            if let Err(e) = self.client.disconnect_wallet().await {
                warn!(error = %e, "Server-side wallet disconnect failed");
            }
        }
        self.connector.disconnect();
        self.wallet = None;
        self.last_wallet = None;
        match self.machine.state().clone() {
            ConnectionState::Disconnected => Ok(()),
            ConnectionState::Error(_) => self.retry(),
            _ => self.machine.transition(ConnectionEvent::Disconnect).map(|_| ()),
        }
    }

    /// Leave the error state so the user can try again
    pub fn retry(&mut self) -> Result<()> {
        self.machine.transition(ConnectionEvent::Retry)?;
        self.connector.disconnect();
        Ok(())
    }

    /// End the login session and tear down all wallet state
    pub async fn logout(&mut self) -> Result<()> {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.connector.disconnect();
        self.wallet = None;
        self.last_wallet = None;
        self.machine = ConnectionStateMachine::new();

        let result = self.client.logout().await.map(|_| ());
        self.user = None;
        result
    }
}
