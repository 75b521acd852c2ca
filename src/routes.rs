use std::collections::HashSet;

use axum::{
    extract::{Form, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::SignedCookieJar;
use tracing::{info, warn};

use crate::{
    AppState,
    error::{AppError, AppResult},
    flash::{self, Flash},
    models::{
        ChooseUserQuery, ExploreQuery, FavoriteForm, Movie, MovieForm, MovieSort, User, UserForm,
    },
    store::StoreError,
    templates::{self, ExploreView, MovieFormView},
    validation,
};

pub async fn index(jar: SignedCookieJar) -> (SignedCookieJar, Html<String>) {
    let (jar, flash) = flash::take(jar);
    (jar, Html(templates::index_page(flash.as_ref())))
}

pub async fn explore(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Query(q): Query<ExploreQuery>,
) -> AppResult<(SignedCookieJar, Html<String>)> {
    let query = q.q.as_deref().unwrap_or_default().trim();
    let sort = MovieSort::from_param(q.sort.as_deref());

    let movies = state.data.get_all_movies(query, sort).await?;

    let user = match q.user_id() {
        Some(id) => state.data.get_user(id).await?.filter(|u| u.is_active),
        None => None,
    };
    let favorites = match &user {
        Some(user) => state.data.get_favorite_movie_ids(user.id).await?,
        None => HashSet::new(),
    };

    let (jar, flash) = flash::take(jar);
    let view =
        ExploreView { movies: &movies, query, sort, user: user.as_ref(), favorites: &favorites };
    Ok((jar, Html(templates::explore_page(flash.as_ref(), &view))))
}

pub async fn list_users(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> AppResult<(SignedCookieJar, Html<String>)> {
    let users = state.data.get_active_users().await?;
    let (jar, flash) = flash::take(jar);
    Ok((jar, Html(templates::users_page(flash.as_ref(), &users))))
}

pub async fn user_movies(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Path(user_id): Path<i32>,
) -> AppResult<(SignedCookieJar, Html<String>)> {
    let user = find_user(&state, user_id).await?;
    let movies = state.data.get_user_movies(user.id).await?;
    let favorites = state.data.get_favorite_movie_ids(user.id).await?;

    let (jar, flash) = flash::take(jar);
    Ok((jar, Html(templates::user_movies_page(flash.as_ref(), &user, &movies, &favorites))))
}

pub async fn add_movie_form(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> AppResult<Html<String>> {
    let user = find_user(&state, user_id).await?;
    Ok(Html(render_add_movie(None, &user, &MovieForm::default())))
}

pub async fn add_movie(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Path(user_id): Path<i32>,
    Form(form): Form<MovieForm>,
) -> AppResult<Response> {
    let user = find_user(&state, user_id).await?;

    let input = match validation::validate_movie(&form) {
        Ok(input) => input,
        Err(err) => {
            let body = render_add_movie(Some(&Flash::danger(err.to_string())), &user, &form);
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(body)).into_response());
        },
    };

    let movie = state.data.add_movie(user.id, input).await?;
    info!(movie_id = movie.id, user_id = user.id, title = %movie.title, "movie added");

    let jar = flash::set(jar, Flash::success(format!("'{}' was added.", movie.title)));
    Ok((jar, Redirect::to(&format!("/users/{}", user.id))).into_response())
}

pub async fn update_movie_form(
    State(state): State<AppState>,
    Path(movie_id): Path<i32>,
) -> AppResult<Html<String>> {
    let movie = find_movie(&state, movie_id).await?;
    Ok(Html(render_update_movie(None, &movie, &MovieForm::from(&movie))))
}

pub async fn update_movie(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Path(movie_id): Path<i32>,
    Form(form): Form<MovieForm>,
) -> AppResult<Response> {
    let movie = find_movie(&state, movie_id).await?;

    let input = match validation::validate_movie(&form) {
        Ok(input) => input,
        Err(err) => {
            let body = render_update_movie(Some(&Flash::danger(err.to_string())), &movie, &form);
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(body)).into_response());
        },
    };

    let updated =
        state.data.update_movie(movie.id, input).await?.ok_or(AppError::NotFound("movie"))?;
    info!(movie_id = updated.id, "movie updated");

    let jar = flash::set(jar, Flash::success(format!("'{}' was updated.", updated.title)));
    Ok((jar, Redirect::to("/explore")).into_response())
}

pub async fn delete_movie(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Path(movie_id): Path<i32>,
) -> AppResult<(SignedCookieJar, Redirect)> {
    let movie = find_movie(&state, movie_id).await?;

    if !state.data.delete_movie(movie.id).await? {
        return Err(AppError::NotFound("movie"));
    }
    info!(movie_id = movie.id, title = %movie.title, "movie deleted");

    let jar =
        flash::set(jar, Flash::success(format!("'{}' was deleted successfully!", movie.title)));
    Ok((jar, Redirect::to("/explore")))
}

pub async fn add_user_form(jar: SignedCookieJar) -> (SignedCookieJar, Html<String>) {
    let (jar, flash) = flash::take(jar);
    (jar, Html(templates::add_user_page(flash.as_ref(), "")))
}

pub async fn add_user(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<UserForm>,
) -> AppResult<Response> {
    let name = match validation::validate_user_name(&form.name) {
        Ok(name) => name,
        Err(err) => {
            let body = templates::add_user_page(Some(&Flash::danger(err.to_string())), &form.name);
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(body)).into_response());
        },
    };

    let user = match state.data.add_user(&name).await {
        Ok(user) => user,
        Err(StoreError::UniqueViolation(_)) => {
            warn!(name = %name, "duplicate user name");
            let message = format!("User '{name}' already exists.");
            let body = templates::add_user_page(Some(&Flash::danger(message)), &name);
            return Ok((StatusCode::CONFLICT, Html(body)).into_response());
        },
        Err(err) => return Err(err.into()),
    };
    info!(user_id = user.id, name = %user.name, "user created");

    let jar = flash::set(jar, Flash::success(format!("User '{}' created successfully!", user.name)));
    Ok((jar, Redirect::to(&format!("/users/{}", user.id))).into_response())
}

pub async fn toggle_favorite(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    headers: HeaderMap,
    Path(movie_id): Path<i32>,
    Form(form): Form<FavoriteForm>,
) -> AppResult<(SignedCookieJar, Redirect)> {
    let user = find_user(&state, form.user_id).await?;
    let movie = find_movie(&state, movie_id).await?;

    let added = state.data.toggle_favorite(user.id, movie.id).await?;
    let message = if added {
        format!("Added '{}' to favorites.", movie.title)
    } else {
        format!("Removed '{}' from favorites.", movie.title)
    };

    let back = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(referer_path)
        .unwrap_or_else(|| templates::with_user_id("/explore", user.id));

    let jar = flash::set(jar, Flash::info(message));
    Ok((jar, Redirect::to(&back)))
}

pub async fn choose_user(
    State(state): State<AppState>,
    Query(q): Query<ChooseUserQuery>,
) -> AppResult<Html<String>> {
    let next = local_path(q.next.as_deref()).unwrap_or("/explore");
    let users = state.data.get_active_users().await?;
    Ok(Html(templates::choose_user_page(&users, next)))
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Path(user_id): Path<i32>,
) -> AppResult<(SignedCookieJar, Redirect)> {
    let user = find_user(&state, user_id).await?;

    if !state.data.deactivate_user(user.id).await? {
        return Err(AppError::NotFound("user"));
    }
    info!(user_id = user.id, name = %user.name, "user deactivated");

    let jar = flash::set(jar, Flash::info(format!("User '{}' was deactivated.", user.name)));
    Ok((jar, Redirect::to("/users")))
}

pub async fn not_found() -> AppError {
    AppError::NotFound("page")
}

async fn find_user(state: &AppState, user_id: i32) -> AppResult<User> {
    state.data.get_user(user_id).await?.ok_or(AppError::NotFound("user"))
}

async fn find_movie(state: &AppState, movie_id: i32) -> AppResult<Movie> {
    state.data.get_movie(movie_id).await?.ok_or(AppError::NotFound("movie"))
}

fn render_add_movie(flash: Option<&Flash>, user: &User, form: &MovieForm) -> String {
    let heading = format!("Add a movie for {}", user.name);
    let action = format!("/users/{}/add_movie", user.id);
    let cancel = format!("/users/{}", user.id);
    templates::movie_form_page(
        flash,
        &MovieFormView { heading: &heading, action: &action, submit: "Add", cancel: &cancel, form },
    )
}

fn render_update_movie(flash: Option<&Flash>, movie: &Movie, form: &MovieForm) -> String {
    let heading = format!("Edit {}", movie.title);
    let action = format!("/update/{}", movie.id);
    templates::movie_form_page(
        flash,
        &MovieFormView { heading: &heading, action: &action, submit: "Save", cancel: "/explore", form },
    )
}

/// Only same-site paths are allowed as redirect targets.
fn local_path(next: Option<&str>) -> Option<&str> {
    let next = next?.trim();
    (next.starts_with('/') && !next.starts_with("//") && !next.contains('\\')).then_some(next)
}

/// Keeps only the path and query of a Referer, never its origin.
fn referer_path(raw: &str) -> Option<String> {
    match url::Url::parse(raw) {
        Ok(url) => {
            let path = match url.query() {
                Some(query) => format!("{}?{query}", url.path()),
                None => url.path().to_string(),
            };
            local_path(Some(&path)).map(str::to_string)
        },
        Err(_) => local_path(Some(raw)).map(str::to_string),
    }
}
