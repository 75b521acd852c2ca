pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod flash;
pub mod models;
pub mod routes;
pub mod store;
pub mod templates;
pub mod validation;

use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use tower_http::trace::TraceLayer;

use crate::store::DataManager;

#[derive(Clone)]
pub struct AppState {
    pub data: Arc<dyn DataManager>,
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(data: Arc<dyn DataManager>, secret: &str) -> Self {
        Self { data, cookie_key: Key::derive_from(secret.as_bytes()) }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/explore", get(routes::explore))
        .route("/users", get(routes::list_users))
        .route("/users/{user_id}", get(routes::user_movies))
        .route(
            "/users/{user_id}/add_movie",
            get(routes::add_movie_form).post(routes::add_movie),
        )
        .route("/users/{user_id}/deactivate", post(routes::deactivate_user))
        .route("/update/{movie_id}", get(routes::update_movie_form).post(routes::update_movie))
        .route("/delete/{movie_id}", get(routes::delete_movie))
        .route("/add_user", get(routes::add_user_form).post(routes::add_user))
        .route("/favorite/{movie_id}", post(routes::toggle_favorite))
        .route("/choose_user", get(routes::choose_user))
        .fallback(routes::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
