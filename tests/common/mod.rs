#![allow(dead_code)]

use std::sync::Arc;

use movieshelf::{
    AppState, db,
    models::MovieInput,
    store::{DataManager, SqliteDataManager},
};

pub const SECRET: &str = "test-secret-key-that-is-long-enough-for-cookies";

pub async fn memory_store() -> SqliteDataManager {
    let conn = db::connect_and_migrate("sqlite::memory:").await.unwrap();
    SqliteDataManager::new(conn)
}

pub async fn memory_state() -> (AppState, Arc<SqliteDataManager>) {
    let store = Arc::new(memory_store().await);
    let state = AppState::new(store.clone(), SECRET);
    (state, store)
}

pub fn movie(title: &str, year: i32, rating: f64) -> MovieInput {
    MovieInput {
        title: title.to_string(),
        year,
        rating,
        poster: format!("https://img.example/{}.jpg", title.to_lowercase().replace(' ', "-")),
    }
}

pub async fn titles(store: &dyn DataManager, query: &str, sort: movieshelf::models::MovieSort) -> Vec<String> {
    store.search_movies(query, sort).await.unwrap().into_iter().map(|m| m.title).collect()
}
