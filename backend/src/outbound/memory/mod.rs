//! Process-local adapters used when no hosted store is configured.

mod audit_logs;
mod change_feed;
mod identity;
mod products;
mod profiles;

pub use audit_logs::InMemoryAuditLogRepository;
pub use change_feed::BroadcastChangeFeed;
pub use identity::InMemoryIdentity;
pub use products::InMemoryProductRepository;
pub use profiles::InMemoryProfileRepository;
