use std::str::FromStr;

use serde::Deserialize;

pub use crate::entities::{movie::Model as Movie, user::Model as User};

/// Ordering applied to catalog listings.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MovieSort {
    /// Title, A to Z.
    #[default]
    Title,
    /// Newest first.
    Year,
    /// Highest rated first.
    Rating,
}

impl MovieSort {
    pub fn as_str(self) -> &'static str {
        match self {
            MovieSort::Title => "title",
            MovieSort::Year => "year",
            MovieSort::Rating => "rating",
        }
    }

    /// Unknown or missing values fall back to [`MovieSort::Title`].
    pub fn from_param(param: Option<&str>) -> Self {
        param.and_then(|p| p.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for MovieSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(MovieSort::Title),
            "year" => Ok(MovieSort::Year),
            "rating" => Ok(MovieSort::Rating),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

/// Validated movie fields, ready to be written.
#[derive(Clone, Debug, PartialEq)]
pub struct MovieInput {
    pub title: String,
    pub year: i32,
    pub rating: f64,
    pub poster: String,
}

/// Raw movie form as submitted by the browser.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MovieForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub poster: String,
}

impl From<&Movie> for MovieForm {
    fn from(movie: &Movie) -> Self {
        Self {
            title: movie.title.clone(),
            year: movie.year.to_string(),
            rating: movie.rating.to_string(),
            poster: movie.poster.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserForm {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct FavoriteForm {
    pub user_id: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExploreQuery {
    pub q: Option<String>,
    pub sort: Option<String>,
    pub user_id: Option<String>,
}

impl ExploreQuery {
    /// Blank or malformed ids mean "no user selected".
    pub fn user_id(&self) -> Option<i32> {
        self.user_id.as_deref().and_then(|s| s.trim().parse().ok())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ChooseUserQuery {
    pub next: Option<String>,
}
