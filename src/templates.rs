use std::collections::HashSet;

use axum::http::StatusCode;
use maud::{DOCTYPE, Markup, html};

use crate::{
    flash::{Flash, FlashLevel},
    models::{Movie, MovieForm, MovieSort, User},
    validation::{MAX_RATING, MAX_YEAR, MIN_RATING, MIN_YEAR},
};

const TAILWIND_CDN: &str = "https://cdn.tailwindcss.com";

const INPUT_CLASS: &str = "mt-2 w-full rounded-md border border-gray-300 px-3 py-2 focus:border-blue-500 focus:outline-none focus:ring-1 focus:ring-blue-500";
const BUTTON_CLASS: &str =
    "rounded-md bg-blue-600 px-4 py-2 font-semibold text-white hover:bg-blue-700";
const LINK_CLASS: &str = "text-sm text-blue-600 hover:text-blue-800";

pub fn index_page(flash: Option<&Flash>) -> String {
    page(
        "MovieShelf",
        flash,
        html! {
            div class="bg-white shadow rounded-lg p-8" {
                h1 class="text-3xl font-bold text-gray-900" { "MovieShelf" }
                p class="mt-2 text-gray-600" { "Keep track of the movies you love, rate them, and browse what everyone else is watching." }
                div class="mt-8 flex flex-wrap gap-4" {
                    a class=(BUTTON_CLASS) href="/explore" { "Explore movies" }
                    a class=(BUTTON_CLASS) href="/users" { "Users" }
                    a class=(BUTTON_CLASS) href="/add_user" { "Add user" }
                }
            }
        },
    )
}

/// Everything the catalog page needs.
pub struct ExploreView<'a> {
    pub movies: &'a [Movie],
    pub query: &'a str,
    pub sort: MovieSort,
    pub user: Option<&'a User>,
    pub favorites: &'a HashSet<i32>,
}

pub fn explore_page(flash: Option<&Flash>, view: &ExploreView<'_>) -> String {
    let user_id = view.user.map(|u| u.id.to_string()).unwrap_or_default();
    let choose_next = format!(
        "/choose_user?next={}",
        urlencoding::encode(&format!(
            "/explore?q={}&sort={}",
            urlencoding::encode(view.query),
            view.sort.as_str()
        ))
    );

    page(
        "Explore",
        flash,
        html! {
            div class="flex items-start justify-between gap-6" {
                div {
                    h1 class="text-3xl font-bold text-gray-900" { "Explore" }
                    @if let Some(user) = view.user {
                        p class="mt-2 text-gray-600" { "Favoriting as " span class="font-medium" { (user.name) } }
                    }
                }
                a class=(LINK_CLASS) href=(choose_next) {
                    @if view.user.is_some() { "Switch user" } @else { "Choose user" }
                }
            }

            form class="mt-6 flex flex-wrap gap-3 items-end" method="get" action="/explore" {
                input type="hidden" name="user_id" value=(user_id);
                div class="flex-1 min-w-48" {
                    label class="block text-sm font-medium text-gray-700" for="q" { "Search" }
                    input class=(INPUT_CLASS) type="search" name="q" id="q" value=(view.query) placeholder="Title";
                }
                div {
                    label class="block text-sm font-medium text-gray-700" for="sort" { "Sort by" }
                    select class=(INPUT_CLASS) name="sort" id="sort" {
                        @for sort in [MovieSort::Title, MovieSort::Year, MovieSort::Rating] {
                            option value=(sort.as_str()) selected[sort == view.sort] { (sort_label(sort)) }
                        }
                    }
                }
                button class=(BUTTON_CLASS) type="submit" { "Go" }
            }

            (movie_grid(view.movies, view.user, view.favorites))
        },
    )
}

pub fn users_page(flash: Option<&Flash>, users: &[User]) -> String {
    page(
        "Users",
        flash,
        html! {
            div class="flex items-start justify-between gap-6" {
                h1 class="text-3xl font-bold text-gray-900" { "Users" }
                a class=(LINK_CLASS) href="/add_user" { "Add user" }
            }
            @if users.is_empty() {
                p class="mt-6 text-gray-600" { "No users yet." }
            } @else {
                ul class="mt-6 divide-y divide-gray-200 bg-white shadow rounded-lg" {
                    @for user in users {
                        li class="flex items-center justify-between px-6 py-4" {
                            a class="font-medium text-gray-900 hover:text-blue-700" href=(format!("/users/{}", user.id)) { (user.name) }
                            form method="post" action=(format!("/users/{}/deactivate", user.id)) {
                                button class="text-sm text-red-600 hover:text-red-800" type="submit" { "Deactivate" }
                            }
                        }
                    }
                }
            }
        },
    )
}

pub fn user_movies_page(
    flash: Option<&Flash>,
    user: &User,
    movies: &[Movie],
    favorites: &HashSet<i32>,
) -> String {
    page(
        &user.name,
        flash,
        html! {
            div class="flex items-start justify-between gap-6" {
                div {
                    h1 class="text-3xl font-bold text-gray-900" { (user.name) "'s movies" }
                    @if !user.is_active {
                        p class="mt-2 text-sm text-gray-500" { "This user has been deactivated." }
                    }
                }
                @if user.is_active {
                    a class=(BUTTON_CLASS) href=(format!("/users/{}/add_movie", user.id)) { "Add movie" }
                }
            }
            (movie_grid(movies, Some(user).filter(|u| u.is_active), favorites))
        },
    )
}

pub fn add_user_page(flash: Option<&Flash>, name: &str) -> String {
    page(
        "Add user",
        flash,
        html! {
            div class="bg-white shadow rounded-lg p-8 max-w-xl" {
                h1 class="text-2xl font-bold text-gray-900" { "Add user" }
                form class="mt-6 space-y-6" method="post" action="/add_user" {
                    div {
                        label class="block text-sm font-medium text-gray-700" for="name" { "Name" }
                        input class=(INPUT_CLASS) name="name" id="name" value=(name) maxlength="100" required;
                    }
                    button class=(BUTTON_CLASS) type="submit" { "Create" }
                }
            }
        },
    )
}

/// Shared by the add and edit screens.
pub struct MovieFormView<'a> {
    pub heading: &'a str,
    pub action: &'a str,
    pub submit: &'a str,
    pub cancel: &'a str,
    pub form: &'a MovieForm,
}

pub fn movie_form_page(flash: Option<&Flash>, view: &MovieFormView<'_>) -> String {
    page(
        view.heading,
        flash,
        html! {
            div class="bg-white shadow rounded-lg p-8 max-w-xl" {
                h1 class="text-2xl font-bold text-gray-900" { (view.heading) }
                form class="mt-6 space-y-6" method="post" action=(view.action) {
                    div {
                        label class="block text-sm font-medium text-gray-700" for="title" { "Title" }
                        input class=(INPUT_CLASS) name="title" id="title" value=(view.form.title) maxlength="100" required;
                    }
                    div {
                        label class="block text-sm font-medium text-gray-700" for="year" { "Year" }
                        input class=(INPUT_CLASS) type="number" name="year" id="year" value=(view.form.year) min=(MIN_YEAR) max=(MAX_YEAR) required;
                    }
                    div {
                        label class="block text-sm font-medium text-gray-700" for="rating" { "Rating" }
                        input class=(INPUT_CLASS) type="number" name="rating" id="rating" value=(view.form.rating) min=(MIN_RATING) max=(MAX_RATING) step="0.1" required;
                    }
                    div {
                        label class="block text-sm font-medium text-gray-700" for="poster" { "Poster URL" }
                        input class=(INPUT_CLASS) type="url" name="poster" id="poster" value=(view.form.poster) maxlength="500" required;
                    }
                    div class="flex items-center gap-4" {
                        button class=(BUTTON_CLASS) type="submit" { (view.submit) }
                        a class=(LINK_CLASS) href=(view.cancel) { "Cancel" }
                    }
                }
            }
        },
    )
}

pub fn choose_user_page(users: &[User], next: &str) -> String {
    page(
        "Choose user",
        None,
        html! {
            h1 class="text-3xl font-bold text-gray-900" { "Who's browsing?" }
            @if users.is_empty() {
                p class="mt-6 text-gray-600" {
                    "No users yet. "
                    a class=(LINK_CLASS) href="/add_user" { "Create one" }
                }
            } @else {
                div class="mt-6 grid gap-4 sm:grid-cols-2" {
                    @for user in users {
                        a class="block bg-white shadow rounded-lg px-6 py-4 font-medium text-gray-900 hover:bg-blue-50" href=(with_user_id(next, user.id)) {
                            (user.name)
                        }
                    }
                }
            }
        },
    )
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    page(
        "Error",
        None,
        html! {
            div class="bg-white shadow rounded-lg p-8 max-w-xl" {
                h1 class="text-2xl font-bold text-gray-900" { "Error " (status.as_u16()) }
                p class="mt-4 text-gray-700" { (message) }
                a class="mt-6 inline-block text-blue-600 hover:text-blue-800" href="/" { "Back" }
            }
        },
    )
}

/// Appends `user_id` to a local path, keeping any existing query string.
pub fn with_user_id(next: &str, user_id: i32) -> String {
    let sep = if next.contains('?') { '&' } else { '?' };
    format!("{next}{sep}user_id={user_id}")
}

fn page(title: &str, flash: Option<&Flash>, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " · MovieShelf" }
                script src=(TAILWIND_CDN) {}
            }
            body class="min-h-screen bg-gray-50" {
                nav class="bg-white shadow" {
                    div class="max-w-5xl mx-auto px-6 py-4 flex gap-6" {
                        a class="font-bold text-gray-900" href="/" { "MovieShelf" }
                        a class="text-gray-600 hover:text-gray-900" href="/explore" { "Explore" }
                        a class="text-gray-600 hover:text-gray-900" href="/users" { "Users" }
                    }
                }
                main class="max-w-5xl mx-auto px-6 py-10" {
                    @if let Some(flash) = flash {
                        (flash_banner(flash))
                    }
                    (body)
                }
            }
        }
    }
    .into_string()
}

fn flash_banner(flash: &Flash) -> Markup {
    let class = match flash.level {
        FlashLevel::Success => "border-green-300 bg-green-50 text-green-800",
        FlashLevel::Danger => "border-red-300 bg-red-50 text-red-800",
        FlashLevel::Info => "border-blue-300 bg-blue-50 text-blue-800",
    };
    html! {
        div class=(format!("mb-6 rounded-md border px-4 py-3 {class}")) role="alert" data-level=(flash.level.as_str()) {
            (flash.message)
        }
    }
}

fn movie_grid(movies: &[Movie], user: Option<&User>, favorites: &HashSet<i32>) -> Markup {
    html! {
        @if movies.is_empty() {
            div class="mt-10 bg-white shadow rounded-lg p-8" {
                p class="text-gray-600" { "No movies found." }
            }
        } @else {
            div class="mt-10 grid gap-6 sm:grid-cols-2 lg:grid-cols-3" {
                @for movie in movies {
                    (movie_card(movie, user, favorites.contains(&movie.id)))
                }
            }
        }
    }
}

fn movie_card(movie: &Movie, user: Option<&User>, is_favorite: bool) -> Markup {
    let ring = if is_favorite { " ring-2 ring-yellow-400" } else { "" };
    html! {
        div class=(format!("bg-white shadow rounded-lg overflow-hidden{ring}")) data-movie-id=(movie.id) {
            @if let Some(poster) = &movie.poster {
                img class="h-64 w-full object-cover" src=(poster) alt=(movie.title) loading="lazy";
            }
            div class="p-4" {
                h2 class="text-lg font-semibold text-gray-900" {
                    (movie.title)
                    span class="ml-2 font-normal text-gray-500" { "(" (movie.year) ")" }
                }
                p class="mt-1 text-sm text-gray-600" { "Rating: " (format!("{:.1}", movie.rating)) " / 10" }
                div class="mt-4 flex items-center gap-4" {
                    a class=(LINK_CLASS) href=(format!("/update/{}", movie.id)) { "Edit" }
                    a class="text-sm text-red-600 hover:text-red-800" href=(format!("/delete/{}", movie.id)) { "Delete" }
                    @if let Some(user) = user {
                        form class="ml-auto" method="post" action=(format!("/favorite/{}", movie.id)) {
                            input type="hidden" name="user_id" value=(user.id);
                            button class="text-xl" type="submit" title=(if is_favorite { "Remove favorite" } else { "Add favorite" }) {
                                @if is_favorite { "★" } @else { "☆" }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn sort_label(sort: MovieSort) -> &'static str {
    match sort {
        MovieSort::Title => "Title (A–Z)",
        MovieSort::Year => "Newest",
        MovieSort::Rating => "Top rated",
    }
}
