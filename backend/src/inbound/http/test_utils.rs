//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{App, HttpResponse, test, web};
use mockable::DefaultClock;
use url::Url;

use crate::domain::import::ImportService;
use crate::domain::ports::{IdentityUser, ProductRepository};
use crate::domain::session::{ProfileResolver, ResolverPolicy};
use crate::domain::{
    AuditTrail, CatalogueCache, CatalogueService, Error, NewProfile, ProductDraft,
    ProductService, Role, UserAdminService, UserId, UserProfile,
};
use crate::outbound::memory::{
    BroadcastChangeFeed, InMemoryAuditLogRepository, InMemoryIdentity,
    InMemoryProductRepository, InMemoryProfileRepository,
};

use super::session::SessionContext;
use super::state::{AuthSettings, HttpState};

pub const BASE_URL: &str = "http://invento.test";
const SIGN_IN_AS: &str = "/test/sign-in-as/{id}";

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Memory-backed adapters and the HTTP state wired over them.
pub struct Harness {
    pub state: HttpState,
    pub identity: Arc<InMemoryIdentity>,
    pub profiles: Arc<InMemoryProfileRepository>,
    pub products: Arc<InMemoryProductRepository>,
    pub changes: BroadcastChangeFeed,
}

impl Harness {
    /// The dev account the sign-in flow authenticates has no profile yet.
    pub fn new() -> Self {
        let clock = Arc::new(DefaultClock);
        let identity = Arc::new(InMemoryIdentity::new(identity_user("dev@invento.test")));
        let profiles = Arc::new(InMemoryProfileRepository::new(clock.clone()));
        let products = Arc::new(InMemoryProductRepository::new(clock.clone()));
        let audit_repo = Arc::new(InMemoryAuditLogRepository::new(
            profiles.clone(),
            clock.clone(),
        ));
        let changes = BroadcastChangeFeed::default();
        let change_feed = Arc::new(changes.clone());
        let audit = AuditTrail::new(audit_repo);
        let resolver = Arc::new(ProfileResolver::new(
            profiles.clone(),
            clock,
            ResolverPolicy::default(),
        ));
        let state = HttpState {
            products: ProductService::new(products.clone(), audit.clone(), change_feed.clone()),
            catalogue: CatalogueService::new(Arc::new(CatalogueCache::new(products.clone()))),
            imports: ImportService::new(products.clone(), audit.clone(), change_feed),
            users: UserAdminService::new(profiles.clone(), audit.clone()),
            audit,
            identity: identity.clone(),
            resolver,
            auth: AuthSettings::new(Url::parse(BASE_URL).expect("base url")),
        };
        Self {
            state,
            identity,
            profiles,
            products,
            changes,
        }
    }

    /// The account the sign-in redirect authenticates.
    pub fn dev_account(&self) -> IdentityUser {
        self.identity.dev_account().expect("dev account registered")
    }

    /// Give the dev account a profile with `role`.
    pub async fn seed_dev_profile(&self, role: Role) -> UserProfile {
        let dev = self.dev_account();
        self.profiles
            .seed(NewProfile {
                id: dev.id,
                email: dev.email,
                display_name: dev.display_name,
                role,
            })
            .await
    }

    /// Register a provider account with a local profile holding `role`.
    pub async fn account(&self, email: &str, role: Role) -> UserProfile {
        let user = identity_user(email);
        self.identity.register(user.clone());
        self.profiles
            .seed(NewProfile {
                id: user.id,
                email: user.email,
                display_name: user.display_name,
                role,
            })
            .await
    }

    /// Insert a product directly into the store.
    pub async fn product(&self, code: &str, category: &str, stock: u32) -> crate::domain::Product {
        let draft = ProductDraft {
            new_code: code.to_owned(),
            name: format!("Product {code}"),
            category: Some(category.to_owned()),
            stock,
            ..ProductDraft::default()
        };
        self.products
            .insert(&draft, None)
            .await
            .expect("seed product")
    }

    /// App with every route, the session middleware and a test-only
    /// `GET /test/sign-in-as/{id}` that stores a session for that account.
    pub fn app(
        &self,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        > + use<>,
    > {
        App::new()
            .wrap(test_session_middleware())
            .app_data(web::Data::new(self.state.clone()))
            .app_data(web::Data::new(self.identity.clone()))
            .service(web::scope("/auth").configure(super::configure_auth))
            .service(web::scope("/api/v1").configure(super::configure_api))
            .route(SIGN_IN_AS, web::get().to(sign_in_as))
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

async fn sign_in_as(
    identity: web::Data<Arc<InMemoryIdentity>>,
    session: SessionContext,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let user_id = UserId::new(path.as_str()).map_err(|err| Error::invalid_request(err.to_string()))?;
    let provider_session = identity
        .sign_in(user_id)
        .map_err(|err| Error::unauthorized(err.to_string()))?;
    session.persist_tokens(&provider_session.tokens())?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn identity_user(email: &str) -> IdentityUser {
    IdentityUser {
        id: UserId::random(),
        email: email.to_owned(),
        display_name: None,
    }
}

/// Session cookie from a response, if one was set.
pub fn session_cookie(res: &ServiceResponse) -> Option<Cookie<'static>> {
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .map(Cookie::into_owned)
}

/// Sign `user_id` in and return the session cookie.
pub async fn sign_in_cookie<S>(app: &S, user_id: UserId) -> Cookie<'static>
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let res = test::call_service(
        app,
        test::TestRequest::get()
            .uri(&format!("/test/sign-in-as/{user_id}"))
            .to_request(),
    )
    .await;
    assert!(res.status().is_success(), "test sign-in failed: {}", res.status());
    session_cookie(&res).expect("session cookie set")
}
