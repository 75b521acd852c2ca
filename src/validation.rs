//! Form input checks. Error messages are shown to the user verbatim.

use url::Url;

use crate::models::{MovieForm, MovieInput};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_POSTER_LEN: usize = 500;
pub const MIN_YEAR: i32 = 1888;
pub const MAX_YEAR: i32 = 2100;
pub const MIN_RATING: f64 = 0.0;
pub const MAX_RATING: f64 = 10.0;

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter a valid {field}.")]
    Empty { field: &'static str },

    #[error("The {field} may be at most {max} characters long.")]
    TooLong { field: &'static str, max: usize },

    #[error("Year must be a whole number between 1888 and 2100.")]
    Year,

    #[error("Rating must be a number between 0 and 10.")]
    Rating,

    #[error("Poster must be an http or https URL.")]
    Poster,
}

pub fn validate_user_name(raw: &str) -> Result<String, ValidationError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ValidationError::Empty { field: "name" });
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong { field: "name", max: MAX_NAME_LEN });
    }
    Ok(name.to_string())
}

pub fn validate_movie(form: &MovieForm) -> Result<MovieInput, ValidationError> {
    let title = form.title.trim();
    if title.is_empty() {
        return Err(ValidationError::Empty { field: "title" });
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ValidationError::TooLong { field: "title", max: MAX_TITLE_LEN });
    }

    let year: i32 = form.year.trim().parse().map_err(|_| ValidationError::Year)?;
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(ValidationError::Year);
    }

    let rating: f64 = form.rating.trim().parse().map_err(|_| ValidationError::Rating)?;
    if !rating.is_finite() || !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ValidationError::Rating);
    }

    let poster = form.poster.trim();
    if poster.len() > MAX_POSTER_LEN {
        return Err(ValidationError::TooLong { field: "poster URL", max: MAX_POSTER_LEN });
    }
    if !is_web_url(poster) {
        return Err(ValidationError::Poster);
    }

    Ok(MovieInput {
        title: title.to_string(),
        year,
        rating,
        poster: poster.to_string(),
    })
}

fn is_web_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(title: &str, year: &str, rating: &str, poster: &str) -> MovieForm {
        MovieForm {
            title: title.into(),
            year: year.into(),
            rating: rating.into(),
            poster: poster.into(),
        }
    }

    #[test]
    fn accepts_valid_movie() {
        let input =
            validate_movie(&form("  Titanic ", "1997", "7.9", "https://img.example/t.jpg")).unwrap();
        assert_eq!(input.title, "Titanic");
        assert_eq!(input.year, 1997);
        assert_eq!(input.rating, 7.9);
        assert_eq!(input.poster, "https://img.example/t.jpg");
    }

    #[test]
    fn year_bounds() {
        let ok = |y| validate_movie(&form("X", y, "5", "http://a.example/p.png"));
        assert!(ok("1888").is_ok());
        assert!(ok("2100").is_ok());
        assert_eq!(ok("1887"), Err(ValidationError::Year));
        assert_eq!(ok("2101"), Err(ValidationError::Year));
        assert_eq!(ok("nineteen"), Err(ValidationError::Year));
    }

    #[test]
    fn rating_bounds() {
        let ok = |r| validate_movie(&form("X", "2000", r, "http://a.example/p.png"));
        assert!(ok("0").is_ok());
        assert!(ok("10").is_ok());
        assert_eq!(ok("-0.1"), Err(ValidationError::Rating));
        assert_eq!(ok("10.1"), Err(ValidationError::Rating));
        assert_eq!(ok("NaN"), Err(ValidationError::Rating));
    }

    #[test]
    fn poster_must_be_web_url() {
        let check = |p| validate_movie(&form("X", "2000", "5", p));
        assert_eq!(check("ftp://a.example/p.png"), Err(ValidationError::Poster));
        assert_eq!(check("not a url"), Err(ValidationError::Poster));
        assert_eq!(check(""), Err(ValidationError::Poster));
        let long = format!("https://a.example/{}", "p".repeat(MAX_POSTER_LEN));
        assert!(matches!(check(long.as_str()), Err(ValidationError::TooLong { .. })));
    }

    #[test]
    fn blank_title_rejected() {
        let err = validate_movie(&form("   ", "2000", "5", "http://a.example")).unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "title" });
        assert_eq!(err.to_string(), "Please enter a valid title.");
    }

    #[test]
    fn user_names() {
        assert_eq!(validate_user_name("  Alex "), Ok("Alex".to_string()));
        assert_eq!(validate_user_name(" "), Err(ValidationError::Empty { field: "name" }));
        assert!(validate_user_name(&"a".repeat(MAX_NAME_LEN + 1)).is_err());
    }
}
