use axum::{middleware, routing::get, routing::post, Router};

use crate::rate_limit::{rate_limit, IpRateLimiter};

pub mod auth;
pub mod common;
pub mod inventory;
pub mod production;
pub mod products;
pub mod system;
pub mod users;

/// Router for all authenticated (tenant-scoped) endpoints.
///
/// `sensitive` guards account management on top of the general limit.
pub fn router(sensitive: IpRateLimiter) -> Router {
    Router::new()
        .route("/auth/me", get(system::me))
        .route("/stream", get(system::stream))
        .route(
            "/users",
            post(users::create_user)
                .route_layer(middleware::from_fn_with_state(sensitive, rate_limit)),
        )
        .nest("/production", production::router())
        .nest("/inventory", inventory::router())
        .nest("/products", products::router())
}

/// Endpoints reachable without a token.
pub fn public_router(auth: IpRateLimiter) -> Router {
    Router::new().route(
        "/auth/login",
        post(auth::login).route_layer(middleware::from_fn_with_state(auth, rate_limit)),
    )
}
