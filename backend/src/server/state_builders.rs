//! Adapter selection and service wiring.
//!
//! With provider settings the REST and GoTrue-style adapters are used.
//! Without them every port is served from process memory and a development
//! admin account is seeded so the sign-in flow works offline.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use tracing::{info, warn};

use invento::config::{AppSettings, ConfigError, ProviderSettings};
use invento::domain::import::ImportService;
use invento::domain::ports::{
    AuditLogRepository, ChangeFeed, IdentityGateway, IdentityUser, ProductRepository,
    ProfileRepository,
};
use invento::domain::session::ProfileResolver;
use invento::domain::{
    AuditTrail, CatalogueCache, CatalogueService, NewProfile, ProductService, Role,
    UserAdminService, UserId,
};
use invento::inbound::http::health::Backend;
use invento::inbound::http::state::{AuthSettings, HttpState};
use invento::inbound::ws::state::WsState;
use invento::outbound::identity::{HttpIdentityGateway, HttpIdentitySettings};
use invento::outbound::memory::{
    BroadcastChangeFeed, InMemoryAuditLogRepository, InMemoryIdentity,
    InMemoryProductRepository, InMemoryProfileRepository,
};
use invento::outbound::rest::{
    RestAuditLogRepository, RestClient, RestError, RestProductRepository,
    RestProfileRepository, RestSettings,
};

/// Failures while wiring adapters at start-up.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build store client: {0}")]
    Store(#[from] RestError),
    #[error("failed to build identity client: {0}")]
    Identity(#[from] reqwest::Error),
}

struct Adapters {
    products: Arc<dyn ProductRepository>,
    profiles: Arc<dyn ProfileRepository>,
    audit_logs: Arc<dyn AuditLogRepository>,
    identity: Arc<dyn IdentityGateway>,
    backend: Backend,
}

/// Handler state for both inbound adapters.
pub struct AppStates {
    pub http: HttpState,
    pub ws: WsState,
    pub backend: Backend,
}

/// Choose adapters from `settings`, build the services and start following
/// catalogue changes. Must run inside the server runtime.
pub async fn build_states(settings: &AppSettings) -> Result<AppStates, StartupError> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let adapters = match settings.provider()? {
        Some(provider) => provider_adapters(settings, &provider)?,
        None => memory_adapters(settings, Arc::clone(&clock)).await,
    };
    let Adapters {
        products,
        profiles,
        audit_logs,
        identity,
        backend,
    } = adapters;

    let changes: Arc<dyn ChangeFeed> = Arc::new(BroadcastChangeFeed::default());
    let audit = AuditTrail::new(audit_logs);
    let cache = Arc::new(CatalogueCache::new(Arc::clone(&products)));
    Arc::clone(&cache).follow(changes.as_ref());

    let resolver = Arc::new(ProfileResolver::new(
        Arc::clone(&profiles),
        clock,
        settings.resolver_policy()?,
    ));
    let http = HttpState {
        products: ProductService::new(Arc::clone(&products), audit.clone(), Arc::clone(&changes)),
        catalogue: CatalogueService::new(cache)
            .with_low_stock_threshold(settings.low_stock_threshold()),
        imports: ImportService::new(products, audit.clone(), Arc::clone(&changes))
            .with_chunk_size(settings.import_chunk_size()?),
        users: UserAdminService::new(profiles, audit.clone()),
        audit,
        identity,
        resolver,
        auth: AuthSettings::new(settings.public_base_url()?)
            .with_bootstrap_timeout(settings.bootstrap_timeout()),
    };
    let ws = WsState::new(changes, settings.ws_allowed_origins()?);
    info!(?backend, "adapters wired");
    Ok(AppStates { http, ws, backend })
}

fn provider_adapters(
    settings: &AppSettings,
    provider: &ProviderSettings,
) -> Result<Adapters, StartupError> {
    let timeout = settings.request_timeout();
    let client = RestClient::new(RestSettings {
        base_url: provider.url.clone(),
        api_key: provider.service_key.clone(),
        timeout,
    })?;
    let identity = HttpIdentityGateway::new(HttpIdentitySettings {
        base_url: provider.url.clone(),
        api_key: provider.anon_key.clone(),
        provider: provider.oauth_provider.clone(),
        timeout,
    })?;
    info!(url = %provider.url, oauth = %provider.oauth_provider, "using hosted provider");
    Ok(Adapters {
        products: Arc::new(RestProductRepository::new(client.clone())),
        profiles: Arc::new(RestProfileRepository::new(client.clone())),
        audit_logs: Arc::new(RestAuditLogRepository::new(client)),
        identity: Arc::new(identity),
        backend: Backend::Provider,
    })
}

async fn memory_adapters(settings: &AppSettings, clock: Arc<dyn Clock>) -> Adapters {
    let dev = IdentityUser {
        id: UserId::random(),
        email: settings.dev_account_email().to_owned(),
        display_name: Some("Development Admin".to_owned()),
    };
    let profiles = Arc::new(InMemoryProfileRepository::new(Arc::clone(&clock)));
    profiles
        .seed(NewProfile {
            id: dev.id,
            email: dev.email.clone(),
            display_name: dev.display_name.clone(),
            role: Role::Admin,
        })
        .await;
    warn!(
        email = %dev.email,
        "no provider configured; serving from memory and signing everyone in as the dev admin"
    );
    Adapters {
        products: Arc::new(InMemoryProductRepository::new(Arc::clone(&clock))),
        audit_logs: Arc::new(InMemoryAuditLogRepository::new(
            Arc::clone(&profiles) as Arc<dyn ProfileRepository>,
            clock,
        )),
        profiles,
        identity: Arc::new(InMemoryIdentity::new(dev)),
        backend: Backend::Memory,
    }
}
