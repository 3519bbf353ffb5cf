/*
[INPUT]:  Logins, wallet links, logouts
[OUTPUT]: Opaque session ids mapped to users and their wallet binding
[POS]:    State layer - login sessions
[UPDATE]: When session lifetime or the wallet binding changes
*/

use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, Utc};
use littlefish_adapter::WalletSession;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub user_id: u64,
    pub wallet: Option<WalletSession>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

fn new_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, user_id: u64) -> Session {
        let session = Session {
            id: new_session_id(),
            user_id,
            wallet: None,
            created_at: Utc::now(),
        };
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        session
    }

    pub async fn get(&self, id: &str) -> Option<Session> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn destroy(&self, id: &str) -> Option<Session> {
        self.sessions.write().await.remove(id)
    }

    /// Run `commit`, then attach `wallet` and move the session to a fresh id.
    ///
    /// The session table stays locked while `commit` runs, so a concurrent
    /// logout cannot slip in between. `Ok(None)` means the session was gone
    /// and `commit` never ran; if `commit` fails the session is left as it was.
    pub async fn link_wallet<T, E, F, Fut>(
        &self,
        id: &str,
        wallet: WalletSession,
        commit: F,
    ) -> Result<Option<(Session, T)>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut sessions = self.sessions.write().await;
        let Some(mut session) = sessions.remove(id) else {
            return Ok(None);
        };
        match commit().await {
            Ok(value) => {
                session.id = new_session_id();
                session.wallet = Some(wallet);
                sessions.insert(session.id.clone(), session.clone());
                Ok(Some((session, value)))
            }
            Err(e) => {
                sessions.insert(session.id.clone(), session);
                Err(e)
            }
        }
    }

    /// Drop the wallet binding, keeping the login
    pub async fn clear_wallet(&self, id: &str) -> Option<WalletSession> {
        self.sessions.write().await.get_mut(id)?.wallet.take()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
