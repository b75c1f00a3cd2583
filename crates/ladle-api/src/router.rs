use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};

use crate::auth::{self, AppState};
use crate::generate;
use crate::middleware::require_auth;
use crate::recipes;

/// Photo uploads can be a few megabytes each before preprocessing.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/process", post(generate::process))
        .route("/recipes/shared/{token}", get(recipes::get_shared_recipe))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/recipes/user", get(recipes::list_recipes))
        .route("/recipes/save", post(recipes::save_recipe))
        .route("/recipes/share", post(recipes::share_recipe))
        .route("/recipes/share/link", post(recipes::share_link))
        .route(
            "/recipes/{id}",
            get(recipes::get_recipe).delete(recipes::delete_recipe),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
