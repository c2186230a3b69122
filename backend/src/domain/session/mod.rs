//! Session bootstrap: resolve the provider session, resolve or create the
//! local profile, expose loading state and gate views by role.

mod gate;
mod manager;
mod resolver;
mod scoped;
mod state;

pub use gate::{GateDecision, RoleGate};
pub use manager::{DEFAULT_BOOTSTRAP_TIMEOUT, SessionManager};
pub use resolver::{ProfileOrigin, ProfileResolver, ResolvedProfile, ResolverPolicy};
pub use scoped::ScopedIdentity;
pub use state::{SessionPhase, SessionSnapshot};

use crate::domain::Error;
use crate::domain::ports::IdentityError;

/// Map identity adapter failures onto domain errors.
pub(crate) fn map_identity_error(error: IdentityError) -> Error {
    match error {
        IdentityError::Connection { message } => {
            Error::service_unavailable(format!("identity provider unavailable: {message}"))
        }
        IdentityError::Rejected { message } => Error::unauthorized(message),
        IdentityError::InvalidSession { message } => Error::unauthorized(message),
    }
}
