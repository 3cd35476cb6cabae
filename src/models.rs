use std::collections::BTreeMap;

use jiff::civil::Date;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::entities::film;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    pub id: i32,
    pub title: String,
    pub favorite: i32,
    pub watch_date: Option<Date>,
    pub rating: Option<i32>,
}

impl From<film::Model> for Film {
    fn from(row: film::Model) -> Self {
        let id = row.id;
        let watch_date = row.watchdate.and_then(|raw| match raw.parse::<Date>() {
            Ok(date) => Some(date),
            Err(err) => {
                warn!(id, watchdate = %raw, error = %err, "unreadable stored watch date");
                None
            },
        });

        Self { id, title: row.title, favorite: row.favorite, watch_date, rating: row.rating }
    }
}

/// Named predicate for listing films. Unknown keywords select everything.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FilmFilter {
    All,
    Favorite,
    Best,
    Unseen,
    LastMonth,
}

impl FilmFilter {
    pub fn from_keyword(keyword: Option<&str>) -> Self {
        match keyword {
            Some("favorite") => FilmFilter::Favorite,
            Some("best") => FilmFilter::Best,
            Some("unseen") => FilmFilter::Unseen,
            Some("lastmonth") => FilmFilter::LastMonth,
            _ => FilmFilter::All,
        }
    }
}

/// Request body for creating a film. Everything but the title is optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFilm {
    pub title: Option<String>,
    pub favorite: Option<i64>,
    pub watch_date: Option<String>,
    pub rating: Option<i64>,
}

/// A validated film ready to be written to the `films` table.
#[derive(Clone, Debug, PartialEq)]
pub struct FilmRecord {
    pub title: String,
    pub favorite: i32,
    pub watchdate: Option<String>,
    pub rating: Option<i32>,
}

/// Partial update body.
///
/// The outer `Option` tracks whether the key was sent at all, the inner one
/// whether its value was `null`. Keys that are not film fields are kept in
/// `other` and written through as column names.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FilmPatch {
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub favorite: Option<Option<i64>>,
    #[serde(default, rename = "watchDate", deserialize_with = "present")]
    pub watch_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub rating: Option<Option<i64>>,
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

fn present<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    pub favorite: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingRequest {
    pub delta_rating: i32,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub filter: Option<String>,
}
