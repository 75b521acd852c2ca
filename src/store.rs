//! Data access for users, movies and favorites.
//!
//! Handlers talk to storage only through [`DataManager`]. The SQLite-backed
//! [`SqliteDataManager`] is the production implementation; tests can swap in
//! their own.

use std::collections::HashSet;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, ModelTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
    TransactionTrait,
    sea_query::{Expr, Func, LikeExpr, SimpleExpr},
};
use tracing::debug;

use crate::{
    entities::{favorite, movie, user},
    models::{Movie, MovieInput, MovieSort, User},
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error(transparent)]
    Db(#[from] DbErr),
}

impl StoreError {
    fn classify(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => StoreError::UniqueViolation(msg),
            _ => StoreError::Db(err),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DataManager: Send + Sync {
    /// Every user, active or not.
    async fn get_all_users(&self) -> StoreResult<Vec<User>>;

    async fn get_active_users(&self) -> StoreResult<Vec<User>>;

    async fn get_user(&self, user_id: i32) -> StoreResult<Option<User>>;

    /// Movies owned by `user_id`. An unknown user simply owns nothing.
    async fn get_user_movies(&self, user_id: i32) -> StoreResult<Vec<Movie>>;

    /// Fails with [`StoreError::UniqueViolation`] when the name is taken.
    async fn add_user(&self, name: &str) -> StoreResult<User>;

    /// Soft-delete. Returns false if the user does not exist.
    async fn deactivate_user(&self, user_id: i32) -> StoreResult<bool>;

    async fn get_movie(&self, movie_id: i32) -> StoreResult<Option<Movie>>;

    /// Inserts as given; callers validate first.
    async fn add_movie(&self, user_id: i32, input: MovieInput) -> StoreResult<Movie>;

    /// Replaces title, year, rating and poster. `None` if the movie is gone.
    async fn update_movie(&self, movie_id: i32, input: MovieInput) -> StoreResult<Option<Movie>>;

    /// True if a row was removed.
    async fn delete_movie(&self, movie_id: i32) -> StoreResult<bool>;

    /// Case-insensitive title substring search. A blank query matches everything.
    async fn search_movies(&self, query: &str, sort_by: MovieSort) -> StoreResult<Vec<Movie>>;

    /// Catalog listing; same filter and ordering as [`DataManager::search_movies`].
    async fn get_all_movies(&self, query: &str, sort_by: MovieSort) -> StoreResult<Vec<Movie>> {
        self.search_movies(query, sort_by).await
    }

    /// Returns true if the favorite was added, false if it was removed.
    async fn toggle_favorite(&self, user_id: i32, movie_id: i32) -> StoreResult<bool>;

    async fn get_favorite_movie_ids(&self, user_id: i32) -> StoreResult<HashSet<i32>>;
}

#[derive(Clone)]
pub struct SqliteDataManager {
    db: DatabaseConnection,
}

impl SqliteDataManager {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl DataManager for SqliteDataManager {
    async fn get_all_users(&self) -> StoreResult<Vec<User>> {
        Ok(user::Entity::find().order_by_asc(user::Column::Id).all(&self.db).await?)
    }

    async fn get_active_users(&self) -> StoreResult<Vec<User>> {
        Ok(user::Entity::find()
            .filter(user::Column::IsActive.eq(true))
            .order_by_asc(user::Column::Name)
            .all(&self.db)
            .await?)
    }

    async fn get_user(&self, user_id: i32) -> StoreResult<Option<User>> {
        Ok(user::Entity::find_by_id(user_id).one(&self.db).await?)
    }

    async fn get_user_movies(&self, user_id: i32) -> StoreResult<Vec<Movie>> {
        Ok(movie::Entity::find()
            .filter(movie::Column::UserId.eq(user_id))
            .order_by_asc(movie::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn add_user(&self, name: &str) -> StoreResult<User> {
        let txn = self.db.begin().await?;

        let model = user::ActiveModel {
            id: Default::default(),
            name: Set(name.to_string()),
            is_active: Set(true),
        };

        match model.insert(&txn).await {
            Ok(created) => {
                txn.commit().await?;
                debug!(user_id = created.id, name = %created.name, "user added");
                Ok(created)
            },
            Err(err) => {
                txn.rollback().await?;
                Err(StoreError::classify(err))
            },
        }
    }

    async fn deactivate_user(&self, user_id: i32) -> StoreResult<bool> {
        let result = user::Entity::update_many()
            .col_expr(user::Column::IsActive, Expr::value(false))
            .filter(user::Column::Id.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn get_movie(&self, movie_id: i32) -> StoreResult<Option<Movie>> {
        Ok(movie::Entity::find_by_id(movie_id).one(&self.db).await?)
    }

    async fn add_movie(&self, user_id: i32, input: MovieInput) -> StoreResult<Movie> {
        let model = movie::ActiveModel {
            id: Default::default(),
            title: Set(input.title),
            year: Set(input.year),
            rating: Set(input.rating),
            poster: Set(Some(input.poster)),
            favorite: Set(false),
            user_id: Set(user_id),
        };

        let created = model.insert(&self.db).await?;
        debug!(movie_id = created.id, user_id, "movie added");
        Ok(created)
    }

    async fn update_movie(&self, movie_id: i32, input: MovieInput) -> StoreResult<Option<Movie>> {
        let Some(existing) = movie::Entity::find_by_id(movie_id).one(&self.db).await? else {
            return Ok(None);
        };

        let mut model = existing.into_active_model();
        model.title = Set(input.title);
        model.year = Set(input.year);
        model.rating = Set(input.rating);
        model.poster = Set(Some(input.poster));

        Ok(Some(model.update(&self.db).await?))
    }

    async fn delete_movie(&self, movie_id: i32) -> StoreResult<bool> {
        let txn = self.db.begin().await?;

        favorite::Entity::delete_many()
            .filter(favorite::Column::MovieId.eq(movie_id))
            .exec(&txn)
            .await?;

        let result = movie::Entity::delete_by_id(movie_id).exec(&txn).await?;

        txn.commit().await?;

        Ok(result.rows_affected > 0)
    }

    async fn search_movies(&self, query: &str, sort_by: MovieSort) -> StoreResult<Vec<Movie>> {
        let mut select = movie::Entity::find();

        let query = query.trim();
        let needle = query.to_lowercase();
        // SQLite's LIKE folds ASCII case only: it narrows the scan for ASCII
        // queries, the match itself is decided on Unicode-lowercased titles below.
        if !query.is_empty() && query.is_ascii() {
            let pattern = format!("%{}%", escape_like(query));
            select = select
                .filter(Expr::col(movie::Column::Title).like(LikeExpr::new(pattern).escape('\\')));
        }

        let select = match sort_by {
            MovieSort::Title => select
                .order_by_asc(SimpleExpr::from(Func::lower(Expr::col(movie::Column::Title))))
                .order_by_asc(movie::Column::Title),
            MovieSort::Year => select.order_by_desc(movie::Column::Year),
            MovieSort::Rating => select.order_by_desc(movie::Column::Rating),
        };

        let mut movies = select.order_by_asc(movie::Column::Id).all(&self.db).await?;
        if !needle.is_empty() {
            movies.retain(|m| m.title.to_lowercase().contains(&needle));
        }

        debug!(query, sort = sort_by.as_str(), results = movies.len(), "movie search");
        Ok(movies)
    }

    async fn toggle_favorite(&self, user_id: i32, movie_id: i32) -> StoreResult<bool> {
        let txn = self.db.begin().await?;

        let existing = favorite::Entity::find_by_id((user_id, movie_id)).one(&txn).await?;

        let added = match existing {
            Some(row) => {
                row.delete(&txn).await?;
                false
            },
            None => {
                insert_favorite(&txn, user_id, movie_id).await?;
                true
            },
        };

        txn.commit().await?;

        debug!(user_id, movie_id, added, "favorite toggled");
        Ok(added)
    }

    async fn get_favorite_movie_ids(&self, user_id: i32) -> StoreResult<HashSet<i32>> {
        let ids: Vec<i32> = favorite::Entity::find()
            .select_only()
            .column(favorite::Column::MovieId)
            .filter(favorite::Column::UserId.eq(user_id))
            .into_tuple()
            .all(&self.db)
            .await?;
        Ok(ids.into_iter().collect())
    }
}

/// A racing toggle for the same pair surfaces as [`StoreError::UniqueViolation`].
async fn insert_favorite<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    movie_id: i32,
) -> StoreResult<()> {
    let model = favorite::ActiveModel {
        user_id: Set(user_id),
        movie_id: Set(movie_id),
        created_at: Set(now_sec()),
    };
    favorite::Entity::insert(model)
        .exec_without_returning(conn)
        .await
        .map_err(StoreError::classify)?;
    Ok(())
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}
