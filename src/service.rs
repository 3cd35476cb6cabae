use std::sync::Arc;

use jiff::civil::Date;
use sea_orm::Value;
use tracing::{debug, warn};

use crate::{
    dao::{FieldMap, FilmStore, WriteOutcome},
    error::{FilmError, FilmResult},
    models::{Film, FilmFilter, FilmPatch, FilmRecord, NewFilm},
};

/// Validation and business rules in front of a [`FilmStore`].
pub struct FilmService<S: FilmStore> {
    store: Arc<S>,
}

impl<S: FilmStore> FilmService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn list(&self, filter: FilmFilter) -> FilmResult<Vec<Film>> {
        self.store
            .list_by_filter(filter)
            .await
            .inspect_err(|err| warn!(?filter, error = %err, "failed to list films"))
    }

    /// Returns the one-element row set for `id`.
    pub async fn get_by_id(&self, id: i32) -> FilmResult<Vec<Film>> {
        let result = async {
            let rows = self.store.get_by_id(id).await?;
            if rows.is_empty() {
                return Err(FilmError::NotFound(id));
            }
            Ok(rows)
        }
        .await;
        result.inspect_err(|err| warn!(id, error = %err, "failed to get film"))
    }

    pub async fn add(&self, film: NewFilm) -> FilmResult<()> {
        let result = async {
            let record = FilmRecord {
                title: validate_title(film.title)?,
                favorite: film.favorite.map(validate_favorite).transpose()?.unwrap_or(0),
                watchdate: normalize_watch_date(film.watch_date)?.map(|d| d.to_string()),
                rating: film.rating.map(validate_rating).transpose()?,
            };

            let outcome = self.store.insert(&record).await?;
            expect_one_row(outcome, FilmError::OperationFailed("add film"))?;
            debug!(id = outcome.last_insert_id, "film added");
            Ok(())
        }
        .await;
        result.inspect_err(|err| warn!(error = %err, "failed to add film"))
    }

    pub async fn update_favorite(&self, id: i32, favorite: Option<i64>) -> FilmResult<()> {
        let result = async {
            let Some(favorite) = favorite else {
                return Err(FilmError::validation("favorite", "must be specified"));
            };
            let favorite = validate_favorite(favorite)?;

            let outcome = self.store.update_favorite(id, favorite).await?;
            match outcome.rows_affected {
                1 => Ok(()),
                0 => Err(FilmError::NotFound(id)),
                _ => Err(FilmError::OperationFailed("update favorite")),
            }
        }
        .await;
        result.inspect_err(|err| warn!(id, error = %err, "failed to update favorite"))
    }

    /// Applies `delta` to the current rating. Concurrent calls for the same
    /// film are not serialized; the last write wins.
    pub async fn update_rating(&self, id: i32, delta: i32) -> FilmResult<()> {
        let result = async {
            let Some(current) = self.store.get_rating_by_id(id).await?.into_iter().next() else {
                return Err(FilmError::NotFound(id));
            };

            let rating = next_rating(current, delta);
            let outcome = self.store.update_rating(id, rating).await?;
            expect_one_row(outcome, FilmError::OperationFailed("update rating"))?;
            debug!(id, ?current, delta, rating, "rating updated");
            Ok(())
        }
        .await;
        result.inspect_err(|err| warn!(id, delta, error = %err, "failed to update rating"))
    }

    pub async fn update_fields(&self, id: i32, patch: FilmPatch) -> FilmResult<()> {
        let result = async {
            let fields = patch_to_fields(patch)?;
            let outcome = self.store.update_fields(id, fields).await?;
            expect_one_row(outcome, FilmError::OperationFailed("update film"))
        }
        .await;
        result.inspect_err(|err| warn!(id, error = %err, "failed to update film"))
    }

    pub async fn delete(&self, id: i32) -> FilmResult<()> {
        let result = async {
            let outcome = self.store.delete(id).await?;
            expect_one_row(outcome, FilmError::NotFound(id))
        }
        .await;
        result.inspect_err(|err| warn!(id, error = %err, "failed to delete film"))
    }
}

fn expect_one_row(outcome: WriteOutcome, err: FilmError) -> FilmResult<()> {
    if outcome.rows_affected == 1 { Ok(()) } else { Err(err) }
}

/// Clamps above at 5. Anything below zero becomes 1; zero itself is kept.
fn next_rating(current: Option<i32>, delta: i32) -> i32 {
    let rating = current.map_or(delta, |c| c.saturating_add(delta));
    if rating > 5 {
        5
    } else if rating < 0 {
        1
    } else {
        rating
    }
}

fn patch_to_fields(patch: FilmPatch) -> FilmResult<FieldMap> {
    let mut fields = FieldMap::new();

    if let Some(title) = patch.title {
        fields.push(("title".to_string(), validate_title(title)?.into()));
    }
    if let Some(favorite) = patch.favorite {
        let favorite = favorite.map(validate_favorite).transpose()?.unwrap_or(0);
        fields.push(("favorite".to_string(), favorite.into()));
    }
    if let Some(watch_date) = patch.watch_date {
        let watch_date = normalize_watch_date(watch_date)?.map(|d| d.to_string());
        fields.push(("watchdate".to_string(), watch_date.into()));
    }
    if let Some(rating) = patch.rating {
        let rating = rating.map(validate_rating).transpose()?;
        fields.push(("rating".to_string(), rating.into()));
    }

    for (key, value) in patch.other {
        if let Some(field) = guarded_field(&key) {
            return Err(match field {
                "id" => FilmError::validation("id", "cannot be changed"),
                _ => FilmError::validation(
                    field,
                    format!("unexpected key {key:?}, send it as {field:?}"),
                ),
            });
        }
        fields.push((key, json_to_value(value)));
    }

    Ok(fields)
}

/// Film columns that extra patch keys must not reach. SQLite resolves column
/// names case-insensitively, so `Favorite` or `watchdate` would otherwise skip
/// validation.
fn guarded_field(key: &str) -> Option<&'static str> {
    [
        ("id", "id"),
        ("title", "title"),
        ("favorite", "favorite"),
        ("watchdate", "watchDate"),
        ("rating", "rating"),
    ]
    .into_iter()
    .find(|(column, _)| key.eq_ignore_ascii_case(column))
    .map(|(_, field)| field)
}

fn json_to_value(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::String(None),
        serde_json::Value::Bool(b) => b.into(),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => i.into(),
            None => n.as_f64().into(),
        },
        serde_json::Value::String(s) => s.into(),
        other => other.to_string().into(),
    }
}

fn validate_title(title: Option<String>) -> FilmResult<String> {
    match title {
        Some(title) if !title.trim().is_empty() => Ok(title),
        _ => Err(FilmError::validation("title", "must be a non-empty string")),
    }
}

fn validate_favorite(favorite: i64) -> FilmResult<i32> {
    match favorite {
        0 => Ok(0),
        1 => Ok(1),
        other => Err(FilmError::validation("favorite", format!("must be 0 or 1, got {other}"))),
    }
}

fn validate_rating(rating: i64) -> FilmResult<i32> {
    match rating {
        1..=5 => Ok(rating as i32),
        other => Err(FilmError::validation("rating", format!("must be between 1 and 5, got {other}"))),
    }
}

/// Blank dates mean "unseen"; anything else must be a real `YYYY-MM-DD` date.
fn normalize_watch_date(watch_date: Option<String>) -> FilmResult<Option<Date>> {
    match watch_date {
        Some(raw) if !raw.trim().is_empty() => parse_watch_date(&raw).map(Some),
        _ => Ok(None),
    }
}

fn parse_watch_date(raw: &str) -> FilmResult<Date> {
    let invalid =
        || FilmError::validation("watchDate", format!("{raw:?} is not a YYYY-MM-DD date"));

    let bytes = raw.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes.iter().enumerate().all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shaped {
        return Err(invalid());
    }

    let year: i16 = raw[0..4].parse().map_err(|_| invalid())?;
    let month: i8 = raw[5..7].parse().map_err(|_| invalid())?;
    let day: i8 = raw[8..10].parse().map_err(|_| invalid())?;
    Date::new(year, month, day).map_err(|_| invalid())
}
