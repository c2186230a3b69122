//! Per-client session state machine.
//!
//! A [`SessionManager`] is constructed for one client, started once, and torn
//! down when the client goes away. State lives in a `watch` channel so callers
//! can read the latest snapshot or await changes. Every resolution writes the
//! snapshot when it completes, so the most recently resolved state wins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::Error;
use crate::domain::ports::{IdentityError, IdentityProvider, ProviderSession};

use super::resolver::ProfileResolver;
use super::state::{SessionPhase, SessionSnapshot};
use super::map_identity_error;

/// Default time after which loading is forced off.
pub const DEFAULT_BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(10);

struct Shared {
    identity: Arc<dyn IdentityProvider>,
    resolver: Arc<ProfileResolver>,
    state: watch::Sender<SessionSnapshot>,
    alive: AtomicBool,
}

impl Shared {
    fn publish(&self, snapshot: SessionSnapshot) {
        if !self.alive.load(Ordering::Acquire) {
            debug!(phase = snapshot.phase.name(), "discarding session update after teardown");
            return;
        }
        self.state.send_replace(snapshot);
    }

    async fn apply(&self, session: Option<ProviderSession>) {
        let Some(session) = session else {
            self.publish(SessionSnapshot::unauthenticated());
            return;
        };
        let same_user = self
            .state
            .borrow()
            .profile()
            .is_some_and(|profile| profile.id == session.user.id);
        if !same_user {
            self.publish(SessionSnapshot::loading(SessionPhase::ResolvingProfile));
        }
        let resolved = self.resolver.resolve(&session.user).await;
        self.publish(SessionSnapshot::authenticated(resolved.profile));
    }

    async fn bootstrap(&self) {
        self.publish(SessionSnapshot::loading(SessionPhase::CheckingSession));
        match self.identity.current_session().await {
            Ok(session) => self.apply(session).await,
            Err(IdentityError::InvalidSession { message }) => {
                debug!(%message, "stored session is no longer valid");
                self.publish(SessionSnapshot::unauthenticated());
            }
            Err(error) => {
                warn!(%error, "session check failed");
                self.publish(SessionSnapshot::unauthenticated());
            }
        }
    }

    fn release_loading(&self) {
        if !self.alive.load(Ordering::Acquire) {
            return;
        }
        let released = self.state.send_if_modified(|snapshot| {
            let was_loading = snapshot.is_loading;
            snapshot.is_loading = false;
            was_loading
        });
        if released {
            warn!("session bootstrap timed out; releasing loading state");
        }
    }
}

/// Explicitly constructed session state for one client.
pub struct SessionManager {
    shared: Arc<Shared>,
    bootstrap_timeout: Duration,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SessionManager {
    /// Build a manager in the [`SessionPhase::Uninitialized`] state.
    pub fn new(identity: Arc<dyn IdentityProvider>, resolver: Arc<ProfileResolver>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::initial());
        Self {
            shared: Arc::new(Shared {
                identity,
                resolver,
                state,
                alive: AtomicBool::new(true),
            }),
            bootstrap_timeout: DEFAULT_BOOTSTRAP_TIMEOUT,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Override the safety-net timeout.
    #[must_use]
    pub fn with_bootstrap_timeout(mut self, timeout: Duration) -> Self {
        self.bootstrap_timeout = timeout;
        self
    }

    /// Begin the session check, subscribe to provider notifications and arm
    /// the safety-net timer. Returns immediately; observe progress with
    /// [`SessionManager::watch`] or [`SessionManager::settled`].
    pub fn start(&self) {
        let mut events = self.shared.identity.subscribe();
        let listener = Arc::clone(&self.shared);
        let listen = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        debug!(kind = ?event.kind, user_id = %event.user_id, "session notification");
                        listener.apply(event.session).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "session notifications lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let bootstrap = Arc::clone(&self.shared);
        let check = tokio::spawn(async move { bootstrap.bootstrap().await });

        let guard = Arc::clone(&self.shared);
        let timeout = self.bootstrap_timeout;
        let safety_net = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            guard.release_loading();
        });

        self.lock_tasks().extend([listen, check, safety_net]);
    }

    /// Latest snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.state.borrow().clone()
    }

    /// Receiver that observes every snapshot change.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.state.subscribe()
    }

    /// Wait until loading is over and return that snapshot.
    pub async fn settled(&self) -> SessionSnapshot {
        let mut receiver = self.watch();
        match receiver.wait_for(|snapshot| !snapshot.is_loading).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// Sign out with the provider, then clear local state. Provider errors
    /// are returned and local state is left untouched.
    pub async fn sign_out(&self) -> Result<(), Error> {
        self.shared
            .identity
            .sign_out()
            .await
            .map_err(map_identity_error)?;
        self.shared.publish(SessionSnapshot::unauthenticated());
        Ok(())
    }

    /// Stop listening, cancel timers and ignore in-flight results.
    pub fn teardown(&self) {
        self.shared.alive.store(false, Ordering::Release);
        for task in self.lock_tasks().drain(..) {
            task.abort();
        }
    }

    /// Whether [`SessionManager::teardown`] has run.
    pub fn is_torn_down(&self) -> bool {
        !self.shared.alive.load(Ordering::Acquire)
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
