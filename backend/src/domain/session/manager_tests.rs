//! Tests for the session manager.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use mockable::DefaultClock;
use tokio::sync::{Notify, broadcast};

use super::*;
use crate::domain::ports::{
    IdentityUser, MockProfileRepository, ProfileRepositoryError, SessionEvent, SessionEventKind,
};
use crate::domain::session::{ProfileResolver, ResolverPolicy};
use crate::domain::{ErrorCode, Role, UserId, UserProfile};

/// Identity double whose session check can be held open.
struct ScriptedIdentity {
    session: Option<ProviderSession>,
    hold: Option<Arc<Notify>>,
    sign_out_error: Option<IdentityError>,
    events: broadcast::Sender<SessionEvent>,
}

impl ScriptedIdentity {
    fn new(session: Option<ProviderSession>) -> Self {
        let (events, _) = broadcast::channel(8);
        Self {
            session,
            hold: None,
            sign_out_error: None,
            events,
        }
    }
}

#[async_trait]
impl IdentityProvider for ScriptedIdentity {
    async fn current_session(&self) -> Result<Option<ProviderSession>, IdentityError> {
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        Ok(self.session.clone())
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        match &self.sign_out_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

fn account() -> IdentityUser {
    IdentityUser {
        id: UserId::random(),
        email: "budi@toko.id".to_owned(),
        display_name: Some("Budi".to_owned()),
    }
}

fn session_for(user: &IdentityUser) -> ProviderSession {
    ProviderSession {
        access_token: "access".to_owned(),
        refresh_token: Some("refresh".to_owned()),
        expires_at: None,
        user: user.clone(),
    }
}

fn profile_for(user: &IdentityUser, role: Role) -> UserProfile {
    UserProfile {
        id: user.id,
        email: user.email.clone(),
        display_name: user.display_name.clone(),
        role,
        created_at: Utc::now(),
    }
}

fn resolver(repo: MockProfileRepository) -> Arc<ProfileResolver> {
    Arc::new(ProfileResolver::new(
        Arc::new(repo),
        Arc::new(DefaultClock),
        ResolverPolicy::default(),
    ))
}

fn manager(identity: ScriptedIdentity, repo: MockProfileRepository) -> SessionManager {
    SessionManager::new(Arc::new(identity), resolver(repo))
}

#[tokio::test]
async fn no_session_settles_unauthenticated() {
    let mut repo = MockProfileRepository::new();
    repo.expect_find_by_id().never();
    let manager = manager(ScriptedIdentity::new(None), repo);
    assert_eq!(manager.snapshot(), SessionSnapshot::initial());

    manager.start();
    let snapshot = manager.settled().await;

    assert!(!snapshot.is_authenticated());
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.phase, SessionPhase::Unauthenticated);
}

#[tokio::test]
async fn stored_profile_authenticates() {
    let user = account();
    let stored = profile_for(&user, Role::Admin);
    let expected = stored.clone();
    let mut repo = MockProfileRepository::new();
    repo.expect_find_by_id()
        .return_once(move |_| Ok(Some(stored)));
    let manager = manager(ScriptedIdentity::new(Some(session_for(&user))), repo);

    manager.start();
    let snapshot = manager.settled().await;

    assert!(snapshot.is_authenticated());
    assert_eq!(snapshot.profile(), Some(&expected));
}

#[tokio::test]
async fn missing_profile_is_created_with_default_role() {
    let user = account();
    let mut repo = MockProfileRepository::new();
    repo.expect_find_by_id().return_once(|_| Ok(None));
    repo.expect_insert()
        .withf(|new| new.role == Role::Pending)
        .times(1)
        .returning(|new| {
            Ok(UserProfile {
                id: new.id,
                email: new.email.clone(),
                display_name: new.display_name.clone(),
                role: new.role,
                created_at: Utc::now(),
            })
        });
    let manager = manager(ScriptedIdentity::new(Some(session_for(&user))), repo);

    manager.start();
    let snapshot = manager.settled().await;

    assert_eq!(snapshot.role(), Some(Role::Pending));
    assert_eq!(snapshot.profile().map(|p| p.id), Some(user.id));
}

#[tokio::test(start_paused = true)]
async fn safety_net_releases_loading() {
    let mut identity = ScriptedIdentity::new(None);
    identity.hold = Some(Arc::new(Notify::new()));
    let mut repo = MockProfileRepository::new();
    repo.expect_find_by_id().never();
    let manager = manager(identity, repo).with_bootstrap_timeout(Duration::from_secs(10));

    manager.start();
    tokio::time::sleep(Duration::from_secs(9)).await;
    assert!(manager.snapshot().is_loading);

    tokio::time::sleep(Duration::from_secs(2)).await;
    let snapshot = manager.snapshot();
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.phase, SessionPhase::CheckingSession);
}

#[tokio::test]
async fn results_after_teardown_are_discarded() {
    let user = account();
    let hold = Arc::new(Notify::new());
    let mut identity = ScriptedIdentity::new(Some(session_for(&user)));
    identity.hold = Some(Arc::clone(&hold));
    let mut repo = MockProfileRepository::new();
    repo.expect_find_by_id().never();
    let manager = manager(identity, repo);

    manager.start();
    tokio::task::yield_now().await;
    manager.teardown();
    hold.notify_one();
    tokio::task::yield_now().await;

    assert!(manager.is_torn_down());
    assert!(!manager.snapshot().is_authenticated());
}

#[tokio::test]
async fn sign_out_surfaces_provider_error() {
    let user = account();
    let stored = profile_for(&user, Role::Readonly);
    let mut identity = ScriptedIdentity::new(Some(session_for(&user)));
    identity.sign_out_error = Some(IdentityError::connection("offline"));
    let mut repo = MockProfileRepository::new();
    repo.expect_find_by_id()
        .return_once(move |_| Ok(Some(stored)));
    let manager = manager(identity, repo);
    manager.start();
    manager.settled().await;

    let err = manager.sign_out().await.expect_err("provider error");

    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    assert!(manager.snapshot().is_authenticated());
}

#[tokio::test]
async fn sign_out_clears_state() {
    let user = account();
    let stored = profile_for(&user, Role::Readonly);
    let mut repo = MockProfileRepository::new();
    repo.expect_find_by_id()
        .return_once(move |_| Ok(Some(stored)));
    let manager = manager(ScriptedIdentity::new(Some(session_for(&user))), repo);
    manager.start();
    manager.settled().await;

    manager.sign_out().await.expect("signed out");

    assert_eq!(manager.snapshot(), SessionSnapshot::unauthenticated());
}

#[tokio::test]
async fn provider_notifications_rerun_resolution() {
    let user = account();
    let stored = profile_for(&user, Role::Readonly);
    let identity = ScriptedIdentity::new(None);
    let events = identity.events.clone();
    let mut repo = MockProfileRepository::new();
    repo.expect_find_by_id()
        .times(1)
        .return_once(move |_| Ok(Some(stored)));
    let manager = manager(identity, repo);
    let mut updates = manager.watch();

    manager.start();
    manager.settled().await;
    events
        .send(SessionEvent::with_session(
            SessionEventKind::SignedIn,
            session_for(&user),
        ))
        .expect("listener subscribed");
    updates
        .wait_for(SessionSnapshot::is_authenticated)
        .await
        .expect("authenticated");

    events
        .send(SessionEvent::signed_out(user.id))
        .expect("listener subscribed");
    updates
        .wait_for(|snapshot| snapshot.phase == SessionPhase::Unauthenticated)
        .await
        .expect("signed out");
}

#[tokio::test]
async fn transient_profile_failures_still_settle() {
    let user = account();
    let mut repo = MockProfileRepository::new();
    repo.expect_find_by_id()
        .returning(|_| Err(ProfileRepositoryError::connection("timeout")));
    let identity = ScriptedIdentity::new(Some(session_for(&user)));
    let manager = SessionManager::new(
        Arc::new(identity),
        Arc::new(ProfileResolver::new(
            Arc::new(repo),
            Arc::new(DefaultClock),
            ResolverPolicy {
                retry_delay: Duration::from_millis(1),
                ..ResolverPolicy::default()
            },
        )),
    );

    manager.start();
    let snapshot = manager.settled().await;

    assert_eq!(snapshot.role(), Some(Role::Pending));
}
