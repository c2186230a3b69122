//! HTTP inbound adapter exposing the sign-in flow and the REST API.
//!
//! Handlers are thin: they extract the caller through [`session`] and hand
//! off to domain services held in [`state::HttpState`].

pub mod audit;
pub mod auth;
pub mod error;
pub mod health;
pub mod import;
pub mod products;
pub mod session;
pub mod session_config;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod users;
pub mod views;

use actix_web::web;

pub use error::ApiResult;

/// Browser-facing sign-in routes, mounted under `/auth`.
pub fn configure_auth(cfg: &mut web::ServiceConfig) {
    cfg.service(auth::sign_in).service(auth::callback);
}

/// JSON API routes, mounted under `/api/v1`.
///
/// Literal product paths are registered before `/products/{id}` so they are
/// not captured as identifiers.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(import::MAX_IMPORT_BYTES))
        .service(auth::sign_out)
        .service(auth::current_session)
        .service(views::view_access)
        .service(import::import_template)
        .service(import::preview_import)
        .service(import::commit_import)
        .service(products::list_categories)
        .service(products::catalogue_stats)
        .service(products::list_products)
        .service(products::get_product)
        .service(products::create_product)
        .service(products::update_product)
        .service(products::delete_product)
        .service(users::list_users)
        .service(users::change_user_role)
        .service(users::delete_user)
        .service(audit::recent_audit_logs);
}
