//! Behaviour tests for session bootstrap and view gating.
//!
//! Each scenario runs a [`SessionManager`] against the in-memory identity
//! gateway and profile store, then asks the dashboard views what to do with
//! the settled session.
//
// rstest-bdd generates guard variables with double underscores, which trips
// the non_snake_case lint under -D warnings.
#![allow(non_snake_case)]

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use invento::domain::ports::{IdentityUser, ProfileRepository, SessionTokens};
use invento::domain::session::{
    GateDecision, ProfileResolver, ResolverPolicy, ScopedIdentity, SessionManager,
    SessionSnapshot,
};
use invento::domain::{NewProfile, Role, UserId, View};
use invento::outbound::memory::{InMemoryIdentity, InMemoryProfileRepository};
use mockable::DefaultClock;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tokio::runtime::Runtime;

struct SessionWorld {
    runtime: Runtime,
    profiles: Arc<InMemoryProfileRepository>,
    identity: RefCell<Option<Arc<InMemoryIdentity>>>,
    account: RefCell<Option<IdentityUser>>,
    default_role: RefCell<Role>,
    tokens: RefCell<Option<SessionTokens>>,
    manager: RefCell<Option<SessionManager>>,
    snapshot: RefCell<Option<SessionSnapshot>>,
}

impl SessionWorld {
    fn new() -> Self {
        Self {
            runtime: Runtime::new().expect("create runtime"),
            profiles: Arc::new(InMemoryProfileRepository::new(Arc::new(DefaultClock))),
            identity: RefCell::new(None),
            account: RefCell::new(None),
            default_role: RefCell::new(Role::Pending),
            tokens: RefCell::new(None),
            manager: RefCell::new(None),
            snapshot: RefCell::new(None),
        }
    }

    fn account(&self) -> IdentityUser {
        self.account.borrow().clone().expect("account should exist")
    }

    fn identity(&self) -> Arc<InMemoryIdentity> {
        self.identity.borrow().clone().expect("identity should exist")
    }

    fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone().expect("session should be bootstrapped")
    }

    fn decision(&self, view: View) -> GateDecision {
        view.decide(&self.snapshot())
    }
}

#[fixture]
fn world() -> SessionWorld {
    SessionWorld::new()
}

#[given("an identity account for {email}")]
fn an_identity_account(world: &SessionWorld, email: String) {
    let account = IdentityUser {
        id: UserId::random(),
        email,
        display_name: None,
    };
    *world.identity.borrow_mut() = Some(Arc::new(InMemoryIdentity::new(account.clone())));
    *world.account.borrow_mut() = Some(account);
}

#[given("new profiles receive the {role} role")]
fn new_profiles_receive_role(world: &SessionWorld, role: Role) {
    *world.default_role.borrow_mut() = role;
}

#[given("the account already has the {role} role")]
fn the_account_already_has_role(world: &SessionWorld, role: Role) {
    let account = world.account();
    world.runtime.block_on(world.profiles.seed(NewProfile {
        id: account.id,
        email: account.email.clone(),
        display_name: None,
        role,
    }));
}

#[given("the account is signed in")]
fn the_account_is_signed_in(world: &SessionWorld) {
    let session = world
        .identity()
        .sign_in(world.account().id)
        .expect("sign in should succeed");
    *world.tokens.borrow_mut() = Some(session.tokens());
}

#[when("the session bootstraps")]
fn the_session_bootstraps(world: &SessionWorld) {
    let identity = world.identity();
    let tokens = world.tokens.borrow().clone();
    let resolver = Arc::new(ProfileResolver::new(
        world.profiles.clone(),
        Arc::new(DefaultClock),
        ResolverPolicy {
            default_role: *world.default_role.borrow(),
            ..ResolverPolicy::default()
        },
    ));
    let (manager, snapshot) = world.runtime.block_on(async move {
        let scoped = Arc::new(ScopedIdentity::new(identity, tokens));
        let manager = SessionManager::new(scoped, resolver)
            .with_bootstrap_timeout(Duration::from_secs(5));
        manager.start();
        let snapshot = manager.settled().await;
        (manager, snapshot)
    });
    *world.manager.borrow_mut() = Some(manager);
    *world.snapshot.borrow_mut() = Some(snapshot);
}

#[when("the user signs out")]
fn the_user_signs_out(world: &SessionWorld) {
    let manager = world.manager.borrow_mut().take().expect("manager should run");
    let snapshot = world.runtime.block_on(async {
        manager.sign_out().await.expect("sign out should succeed");
        manager.snapshot()
    });
    *world.snapshot.borrow_mut() = Some(snapshot);
    manager.teardown();
}

#[then("the session is authenticated with the {role} role")]
fn the_session_is_authenticated(world: &SessionWorld, role: Role) {
    let snapshot = world.snapshot();
    assert!(!snapshot.is_loading);
    assert!(snapshot.is_authenticated());
    assert_eq!(snapshot.role(), Some(role));
}

#[then("the session is unauthenticated")]
fn the_session_is_unauthenticated(world: &SessionWorld) {
    let snapshot = world.snapshot();
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.phase.name(), "unauthenticated");
    assert!(snapshot.profile().is_none());
}

#[then("a profile is stored for the account")]
fn a_profile_is_stored(world: &SessionWorld) {
    let account = world.account();
    let stored = world
        .runtime
        .block_on(world.profiles.find_by_id(&account.id))
        .expect("profile lookup")
        .expect("profile should be stored");
    assert_eq!(stored.email, account.email);
    assert_eq!(Some(stored.role), world.snapshot().role());
}

#[then("the {view} view renders")]
fn the_view_renders(world: &SessionWorld, view: View) {
    assert_eq!(world.decision(view), GateDecision::Render);
}

#[then("the {view} view redirects to {path}")]
fn the_view_redirects(world: &SessionWorld, view: View, path: String) {
    assert_eq!(world.decision(view), GateDecision::Redirect(path));
}

#[scenario(
    path = "tests/features/session_bootstrap.feature",
    name = "First sign-in creates a pending profile"
)]
fn first_sign_in_creates_a_pending_profile(world: SessionWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/session_bootstrap.feature",
    name = "A configured default role is applied to new profiles"
)]
fn a_configured_default_role_is_applied_to_new_profiles(world: SessionWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/session_bootstrap.feature",
    name = "A stored admin profile is reused"
)]
fn a_stored_admin_profile_is_reused(world: SessionWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/session_bootstrap.feature",
    name = "Browsers without a session are sent to sign in"
)]
fn browsers_without_a_session_are_sent_to_sign_in(world: SessionWorld) {
    drop(world);
}

#[scenario(
    path = "tests/features/session_bootstrap.feature",
    name = "Signing out clears the session"
)]
fn signing_out_clears_the_session(world: SessionWorld) {
    drop(world);
}
