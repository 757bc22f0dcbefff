use crate::state::AppState;
use axum::Router;

mod claims;
mod dto;
mod extractors;
pub mod handlers;
mod jwt;
mod password;
mod principal;
pub mod services;

pub use extractors::AuthUser;
#[cfg(test)]
pub use jwt::JwtKeys;
pub use principal::Principal;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
