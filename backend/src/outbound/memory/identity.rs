//! In-memory identity gateway for local development and tests.
//!
//! `authorize` skips the external consent screen and redirects straight back
//! with a code for the configured development account. PKCE is still
//! enforced on exchange, so the callback path behaves like the hosted one.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::domain::UserId;
use crate::domain::ports::{
    AuthorizationRequest, IdentityError, IdentityGateway, IdentityUser, ProviderSession,
    SessionEvent, SessionEventKind, SessionTokens,
};
use crate::outbound::identity::{EVENT_CAPACITY, pkce};

struct PendingCode {
    user_id: UserId,
    challenge: String,
}

#[derive(Default)]
struct Registry {
    users: HashMap<UserId, IdentityUser>,
    codes: HashMap<String, PendingCode>,
    access: HashMap<String, UserId>,
    refresh: HashMap<String, UserId>,
}

/// [`IdentityGateway`] issuing opaque tokens from a process-local registry.
pub struct InMemoryIdentity {
    registry: Mutex<Registry>,
    dev_account: UserId,
    events: broadcast::Sender<SessionEvent>,
}

impl InMemoryIdentity {
    /// Create a gateway whose sign-in flow authenticates `dev_account`.
    pub fn new(dev_account: IdentityUser) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let dev_id = dev_account.id;
        let mut registry = Registry::default();
        registry.users.insert(dev_id, dev_account);
        Self {
            registry: Mutex::new(registry),
            dev_account: dev_id,
            events,
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Account the sign-in flow authenticates.
    pub fn dev_account(&self) -> Option<IdentityUser> {
        self.registry().users.get(&self.dev_account).cloned()
    }

    /// Make another account known to the gateway.
    pub fn register(&self, user: IdentityUser) {
        self.registry().users.insert(user.id, user);
    }

    /// Issue a session for a registered account without the redirect dance.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Rejected`] for unknown accounts.
    pub fn sign_in(&self, user_id: UserId) -> Result<ProviderSession, IdentityError> {
        let session = self.issue(user_id)?;
        self.emit(SessionEvent::with_session(
            SessionEventKind::SignedIn,
            session.clone(),
        ));
        Ok(session)
    }

    /// Forget an access token while keeping its refresh token, as expiry would.
    pub fn expire_access_token(&self, access_token: &str) {
        self.registry().access.remove(access_token);
    }

    fn issue(&self, user_id: UserId) -> Result<ProviderSession, IdentityError> {
        let mut registry = self.registry();
        let user = registry
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| IdentityError::rejected(format!("unknown account {user_id}")))?;
        let access_token = format!("mem-at-{}", Uuid::new_v4());
        let refresh_token = format!("mem-rt-{}", Uuid::new_v4());
        registry.access.insert(access_token.clone(), user_id);
        registry.refresh.insert(refresh_token.clone(), user_id);
        Ok(ProviderSession {
            access_token,
            refresh_token: Some(refresh_token),
            expires_at: None,
            user,
        })
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("no session listeners");
        }
    }
}

#[async_trait]
impl IdentityGateway for InMemoryIdentity {
    fn authorize(&self, redirect_to: &Url) -> Result<AuthorizationRequest, IdentityError> {
        let code_verifier = pkce::generate_verifier();
        let code = Uuid::new_v4().simple().to_string();
        self.registry().codes.insert(
            code.clone(),
            PendingCode {
                user_id: self.dev_account,
                challenge: pkce::challenge(&code_verifier),
            },
        );
        let mut url = redirect_to.clone();
        url.query_pairs_mut().append_pair("code", &code);
        Ok(AuthorizationRequest { url, code_verifier })
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<ProviderSession, IdentityError> {
        let pending = self
            .registry()
            .codes
            .remove(code)
            .ok_or_else(|| IdentityError::rejected("unknown or already used code"))?;
        if pending.challenge != pkce::challenge(code_verifier) {
            return Err(IdentityError::rejected("code verifier does not match"));
        }
        self.sign_in(pending.user_id)
    }

    async fn session_for_token(
        &self,
        access_token: &str,
    ) -> Result<ProviderSession, IdentityError> {
        let registry = self.registry();
        let user = registry
            .access
            .get(access_token)
            .and_then(|id| registry.users.get(id))
            .cloned()
            .ok_or_else(|| IdentityError::invalid_session("unknown access token"))?;
        Ok(ProviderSession {
            access_token: access_token.to_owned(),
            refresh_token: None,
            expires_at: None,
            user,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<ProviderSession, IdentityError> {
        let user_id = self
            .registry()
            .refresh
            .remove(refresh_token)
            .ok_or_else(|| IdentityError::rejected("unknown refresh token"))?;
        let session = self.issue(user_id)?;
        self.emit(SessionEvent::with_session(
            SessionEventKind::TokenRefreshed,
            session.clone(),
        ));
        Ok(session)
    }

    async fn sign_out(&self, tokens: &SessionTokens) -> Result<(), IdentityError> {
        {
            let mut registry = self.registry();
            registry.access.remove(&tokens.access_token);
            if let Some(refresh) = tokens.refresh_token.as_deref() {
                registry.refresh.remove(refresh);
            }
        }
        self.emit(SessionEvent::signed_out(tokens.user_id));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}
