mod common;

use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use movieshelf::{
    AppState, app,
    models::{Movie, MovieInput, MovieSort, User},
    store::{DataManager, StoreError, StoreResult},
};
use sea_orm::DbErr;
use tower::ServiceExt;

use common::{SECRET, memory_state, movie};

async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(resp: Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(resp: &Response) -> &str {
    resp.headers().get(header::LOCATION).unwrap().to_str().unwrap()
}

fn sets_flash(resp: &Response) -> bool {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .any(|v| v.to_str().unwrap_or_default().starts_with("flash="))
}

#[tokio::test]
async fn landing_page_renders() {
    let (state, _) = memory_state().await;
    let app = app(state);

    let resp = send(&app, get("/")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("Explore movies"));
}

#[tokio::test]
async fn unknown_user_is_404() {
    let (state, _) = memory_state().await;
    let app = app(state);

    assert_eq!(send(&app, get("/users/999")).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(send(&app, get("/users/999/add_movie")).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(send(&app, get("/update/999")).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(send(&app, get("/delete/999")).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(send(&app, get("/no/such/page")).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn add_user_flow() {
    let (state, store) = memory_state().await;
    let app = app(state);

    let resp = send(&app, post_form("/add_user", "name=+Alex+")).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(sets_flash(&resp));
    let alex = &store.get_all_users().await.unwrap()[0];
    assert_eq!(alex.name, "Alex");
    assert_eq!(location(&resp), format!("/users/{}", alex.id));

    let resp = send(&app, post_form("/add_user", "name=Alex")).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert!(body_text(resp).await.contains("User 'Alex' already exists."));
    assert_eq!(store.get_all_users().await.unwrap().len(), 1);

    let resp = send(&app, post_form("/add_user", "name=++")).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(resp).await.contains("Please enter a valid name."));
}

#[tokio::test]
async fn add_movie_validates_input() {
    let (state, store) = memory_state().await;
    let user = store.add_user("Alex").await.unwrap();
    let app = app(state);
    let uri = format!("/users/{}/add_movie", user.id);

    let resp = send(
        &app,
        post_form(&uri, "title=Titanic&year=1887&rating=7.9&poster=https%3A%2F%2Fimg.example%2Ft.jpg"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(resp).await.contains("Year must be a whole number"));
    assert!(store.get_user_movies(user.id).await.unwrap().is_empty());

    let resp = send(
        &app,
        post_form(&uri, "title=Titanic&year=1997&rating=7.9&poster=https%3A%2F%2Fimg.example%2Ft.jpg"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), format!("/users/{}", user.id));

    let movies = store.get_user_movies(user.id).await.unwrap();
    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0].poster.as_deref(), Some("https://img.example/t.jpg"));
}

#[tokio::test]
async fn update_and_delete_movie() {
    let (state, store) = memory_state().await;
    let user = store.add_user("Alex").await.unwrap();
    let m = store.add_movie(user.id, movie("Titanic", 1997, 7.9)).await.unwrap();
    let app = app(state);

    let resp = send(&app, get(&format!("/update/{}", m.id))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("value=\"Titanic\""));

    let resp = send(
        &app,
        post_form(
            &format!("/update/{}", m.id),
            "title=Titanic&year=1997&rating=8.5&poster=https%3A%2F%2Fimg.example%2Ft.jpg",
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/explore");
    assert_eq!(store.get_movie(m.id).await.unwrap().unwrap().rating, 8.5);

    let resp = send(&app, get(&format!("/delete/{}", m.id))).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(sets_flash(&resp));
    assert!(store.get_movie(m.id).await.unwrap().is_none());

    assert_eq!(send(&app, get(&format!("/delete/{}", m.id))).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn favorite_toggle_redirects_to_referrer() {
    let (state, store) = memory_state().await;
    let user = store.add_user("Alex").await.unwrap();
    let m = store.add_movie(user.id, movie("Titanic", 1997, 7.9)).await.unwrap();
    let app = app(state);

    let mut req = post_form(&format!("/favorite/{}", m.id), &format!("user_id={}", user.id));
    req.headers_mut().insert(header::REFERER, "/explore?sort=year".parse().unwrap());
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/explore?sort=year");
    assert!(store.get_favorite_movie_ids(user.id).await.unwrap().contains(&m.id));

    let resp = send(&app, get(&format!("/explore?user_id={}", user.id))).await;
    assert!(body_text(resp).await.contains("Remove favorite"));

    let req = post_form(&format!("/favorite/{}", m.id), &format!("user_id={}", user.id));
    let resp = send(&app, req).await;
    assert_eq!(location(&resp), format!("/explore?user_id={}", user.id));
    assert!(store.get_favorite_movie_ids(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn favorite_toggle_never_redirects_off_site() {
    let (state, store) = memory_state().await;
    let user = store.add_user("Alex").await.unwrap();
    let m = store.add_movie(user.id, movie("Titanic", 1997, 7.9)).await.unwrap();
    let app = app(state);

    let mut req = post_form(&format!("/favorite/{}", m.id), &format!("user_id={}", user.id));
    req.headers_mut()
        .insert(header::REFERER, "https://evil.example/explore?sort=year".parse().unwrap());
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/explore?sort=year");

    let mut req = post_form(&format!("/favorite/{}", m.id), &format!("user_id={}", user.id));
    req.headers_mut().insert(header::REFERER, "//evil.example/".parse().unwrap());
    let resp = send(&app, req).await;
    assert_eq!(location(&resp), format!("/explore?user_id={}", user.id));
}

#[tokio::test]
async fn explore_filters_and_tolerates_blank_user() {
    let (state, store) = memory_state().await;
    let user = store.add_user("Alex").await.unwrap();
    store.add_movie(user.id, movie("Titanic", 1997, 7.9)).await.unwrap();
    store.add_movie(user.id, movie("Heat", 1995, 8.3)).await.unwrap();
    let app = app(state);

    let resp = send(&app, get("/explore?q=TITAN&sort=rating&user_id=")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("Titanic"));
    assert!(!html.contains("Heat"));
    assert!(html.contains("Choose user"));
}

#[tokio::test]
async fn deactivated_users_leave_the_list() {
    let (state, store) = memory_state().await;
    let alex = store.add_user("Alex").await.unwrap();
    store.add_user("Sam").await.unwrap();
    let app = app(state);

    let resp = send(&app, post_form(&format!("/users/{}/deactivate", alex.id), "")).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/users");

    let html = body_text(send(&app, get("/users")).await).await;
    assert!(html.contains("Sam"));
    assert!(!html.contains("Alex"));

    let resp = send(&app, post_form("/users/999/deactivate", "")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn choose_user_keeps_next_local() {
    let (state, store) = memory_state().await;
    let user = store.add_user("Alex").await.unwrap();
    let app = app(state);

    let html = body_text(send(&app, get("/choose_user?next=%2Fexplore%3Fsort%3Dyear")).await).await;
    assert!(html.contains(&format!("/explore?sort=year&amp;user_id={}", user.id)));

    let html = body_text(send(&app, get("/choose_user?next=https%3A%2F%2Fevil.example")).await).await;
    assert!(html.contains(&format!("href=\"/explore?user_id={}\"", user.id)));
    assert!(!html.contains("evil.example"));
}

struct BrokenStore;

fn broken<T>() -> StoreResult<T> {
    Err(StoreError::Db(DbErr::Custom("disk on fire".to_string())))
}

#[async_trait]
impl DataManager for BrokenStore {
    async fn get_all_users(&self) -> StoreResult<Vec<User>> {
        broken()
    }

    async fn get_active_users(&self) -> StoreResult<Vec<User>> {
        broken()
    }

    async fn get_user(&self, _user_id: i32) -> StoreResult<Option<User>> {
        broken()
    }

    async fn get_user_movies(&self, _user_id: i32) -> StoreResult<Vec<Movie>> {
        broken()
    }

    async fn add_user(&self, _name: &str) -> StoreResult<User> {
        broken()
    }

    async fn deactivate_user(&self, _user_id: i32) -> StoreResult<bool> {
        broken()
    }

    async fn get_movie(&self, _movie_id: i32) -> StoreResult<Option<Movie>> {
        broken()
    }

    async fn add_movie(&self, _user_id: i32, _input: MovieInput) -> StoreResult<Movie> {
        broken()
    }

    async fn update_movie(&self, _movie_id: i32, _input: MovieInput) -> StoreResult<Option<Movie>> {
        broken()
    }

    async fn delete_movie(&self, _movie_id: i32) -> StoreResult<bool> {
        broken()
    }

    async fn search_movies(&self, _query: &str, _sort_by: MovieSort) -> StoreResult<Vec<Movie>> {
        broken()
    }

    async fn toggle_favorite(&self, _user_id: i32, _movie_id: i32) -> StoreResult<bool> {
        broken()
    }

    async fn get_favorite_movie_ids(&self, _user_id: i32) -> StoreResult<HashSet<i32>> {
        broken()
    }
}

#[tokio::test]
async fn storage_failures_render_generic_error() {
    let app = app(AppState::new(Arc::new(BrokenStore), SECRET));

    for uri in ["/users", "/explore", "/users/1"] {
        let resp = send(&app, get(uri)).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        let html = body_text(resp).await;
        assert!(html.contains("Something went wrong"));
        assert!(!html.contains("disk on fire"));
    }
}
