//! Client-scoped identity provider built from stored tokens.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::domain::ports::{
    IdentityError, IdentityGateway, IdentityProvider, ProviderSession, SessionEvent, SessionTokens,
};

const EVENT_CAPACITY: usize = 16;

/// One client's session, backed by the server-wide gateway.
///
/// Gateway notifications for the client's account are relayed to
/// subscribers and keep the held tokens current. Construct inside a Tokio
/// runtime.
pub struct ScopedIdentity {
    gateway: Arc<dyn IdentityGateway>,
    tokens: Arc<Mutex<Option<SessionTokens>>>,
    events: broadcast::Sender<SessionEvent>,
    relay: Option<JoinHandle<()>>,
}

impl ScopedIdentity {
    /// Scope `gateway` to the client holding `tokens`.
    pub fn new(gateway: Arc<dyn IdentityGateway>, tokens: Option<SessionTokens>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let user_id = tokens.as_ref().map(|tokens| tokens.user_id);
        let tokens = Arc::new(Mutex::new(tokens));

        let relay = user_id.map(|user_id| {
            let mut upstream = gateway.subscribe();
            let downstream = events.clone();
            let held = Arc::clone(&tokens);
            tokio::spawn(async move {
                loop {
                    match upstream.recv().await {
                        Ok(event) if event.user_id == user_id => {
                            *lock(&held) = event.session.as_ref().map(ProviderSession::tokens);
                            if downstream.send(event).is_err() {
                                debug!("no scoped session listeners");
                            }
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(skipped, "identity relay lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            })
        });

        Self {
            gateway,
            tokens,
            events,
            relay,
        }
    }

    /// Tokens currently held, which change after a refresh.
    pub fn tokens(&self) -> Option<SessionTokens> {
        lock(&self.tokens).clone()
    }
}

fn lock(tokens: &Mutex<Option<SessionTokens>>) -> std::sync::MutexGuard<'_, Option<SessionTokens>> {
    tokens.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl IdentityProvider for ScopedIdentity {
    async fn current_session(&self) -> Result<Option<ProviderSession>, IdentityError> {
        let Some(tokens) = self.tokens() else {
            return Ok(None);
        };
        match self.gateway.session_for_token(&tokens.access_token).await {
            Ok(session) => Ok(Some(session)),
            Err(IdentityError::InvalidSession { message }) => {
                let Some(refresh_token) = tokens.refresh_token.as_deref() else {
                    debug!(%message, "session expired without a refresh token");
                    *lock(&self.tokens) = None;
                    return Ok(None);
                };
                match self.gateway.refresh(refresh_token).await {
                    Ok(session) => {
                        *lock(&self.tokens) = Some(session.tokens());
                        Ok(Some(session))
                    }
                    Err(IdentityError::InvalidSession { .. } | IdentityError::Rejected { .. }) => {
                        *lock(&self.tokens) = None;
                        Ok(None)
                    }
                    Err(error) => Err(error),
                }
            }
            Err(error) => Err(error),
        }
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        let Some(tokens) = self.tokens() else {
            return Ok(());
        };
        self.gateway.sign_out(&tokens).await?;
        *lock(&self.tokens) = None;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

impl Drop for ScopedIdentity {
    fn drop(&mut self) {
        if let Some(relay) = self.relay.take() {
            relay.abort();
        }
    }
}
