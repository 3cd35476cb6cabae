use async_trait::async_trait;
use jiff::{ToSpan, Timestamp, tz::TimeZone};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, QueryTrait, Set, Value,
    sea_query::{Alias, Expr},
};
use tracing::debug;

use crate::{
    entities::film,
    error::FilmResult,
    models::{Film, FilmFilter, FilmRecord},
};

/// Column name to new value, in the order the columns are written.
pub type FieldMap = Vec<(String, Value)>;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct WriteOutcome {
    pub last_insert_id: u64,
    pub rows_affected: u64,
}

/// Data access for the `films` table. Implementations run exactly the
/// requested statement and never validate.
#[async_trait]
pub trait FilmStore: Send + Sync {
    async fn list_by_filter(&self, filter: FilmFilter) -> FilmResult<Vec<Film>>;
    async fn get_by_id(&self, id: i32) -> FilmResult<Vec<Film>>;
    async fn get_rating_by_id(&self, id: i32) -> FilmResult<Vec<Option<i32>>>;
    async fn insert(&self, film: &FilmRecord) -> FilmResult<WriteOutcome>;
    async fn update_favorite(&self, id: i32, favorite: i32) -> FilmResult<WriteOutcome>;
    async fn update_rating(&self, id: i32, rating: i32) -> FilmResult<WriteOutcome>;
    async fn update_fields(&self, id: i32, fields: FieldMap) -> FilmResult<WriteOutcome>;
    async fn delete(&self, id: i32) -> FilmResult<WriteOutcome>;
}

#[derive(Clone)]
pub struct SeaOrmFilmStore {
    db: DatabaseConnection,
}

impl SeaOrmFilmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FilmStore for SeaOrmFilmStore {
    async fn list_by_filter(&self, filter: FilmFilter) -> FilmResult<Vec<Film>> {
        let query = film::Entity::find().order_by_asc(film::Column::Id);
        let query = match filter {
            FilmFilter::All => query,
            FilmFilter::Favorite => query.filter(film::Column::Favorite.eq(1)),
            FilmFilter::Best => query.filter(film::Column::Rating.eq(5)),
            FilmFilter::Unseen => query.filter(film::Column::Watchdate.is_null()),
            FilmFilter::LastMonth => query
                .filter(film::Column::Watchdate.is_not_null())
                .filter(film::Column::Watchdate.gte(last_month_cutoff())),
        };

        debug!(?filter, sql = %query.build(self.db.get_database_backend()), "listing films");
        let rows = query.all(&self.db).await?;
        Ok(rows.into_iter().map(Film::from).collect())
    }

    async fn get_by_id(&self, id: i32) -> FilmResult<Vec<Film>> {
        debug!(id, "fetching film");
        let row = film::Entity::find_by_id(id).one(&self.db).await?;
        Ok(row.into_iter().map(Film::from).collect())
    }

    async fn get_rating_by_id(&self, id: i32) -> FilmResult<Vec<Option<i32>>> {
        debug!(id, "fetching film rating");
        let ratings = film::Entity::find()
            .select_only()
            .column(film::Column::Rating)
            .filter(film::Column::Id.eq(id))
            .into_tuple::<Option<i32>>()
            .all(&self.db)
            .await?;
        Ok(ratings)
    }

    async fn insert(&self, record: &FilmRecord) -> FilmResult<WriteOutcome> {
        let model = film::ActiveModel {
            id: Default::default(),
            title: Set(record.title.clone()),
            favorite: Set(record.favorite),
            watchdate: Set(record.watchdate.clone()),
            rating: Set(record.rating),
        };
        let stmt = film::Entity::insert(model).build(self.db.get_database_backend());
        debug!(sql = %stmt, "inserting film");

        let res = self.db.execute(stmt).await?;
        Ok(WriteOutcome { last_insert_id: res.last_insert_id(), rows_affected: res.rows_affected() })
    }

    async fn update_favorite(&self, id: i32, favorite: i32) -> FilmResult<WriteOutcome> {
        self.update_fields(id, vec![("favorite".to_string(), favorite.into())]).await
    }

    async fn update_rating(&self, id: i32, rating: i32) -> FilmResult<WriteOutcome> {
        self.update_fields(id, vec![("rating".to_string(), rating.into())]).await
    }

    async fn update_fields(&self, id: i32, fields: FieldMap) -> FilmResult<WriteOutcome> {
        if fields.is_empty() {
            debug!(id, "no fields to update");
            return Ok(WriteOutcome::default());
        }

        let mut update = film::Entity::update_many().filter(film::Column::Id.eq(id));
        for (column, value) in fields {
            update = update.col_expr(Alias::new(column), Expr::value(value));
        }
        debug!(id, sql = %update.build(self.db.get_database_backend()), "updating film");

        let res = update.exec(&self.db).await?;
        Ok(WriteOutcome { rows_affected: res.rows_affected, ..Default::default() })
    }

    async fn delete(&self, id: i32) -> FilmResult<WriteOutcome> {
        debug!(id, "deleting film");
        let res = film::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(WriteOutcome { rows_affected: res.rows_affected, ..Default::default() })
    }
}

/// Oldest watch date, as stored text, that still counts as last month.
fn last_month_cutoff() -> String {
    let today = Timestamp::now().to_zoned(TimeZone::UTC).date();
    today.saturating_sub(30.days()).to_string()
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, error::FilmError};

    fn record(title: &str, favorite: i32, watchdate: Option<&str>, rating: Option<i32>) -> FilmRecord {
        FilmRecord { title: title.to_string(), favorite, watchdate: watchdate.map(str::to_string), rating }
    }

    fn days_ago(days: i32) -> String {
        let today = Timestamp::now().to_zoned(TimeZone::UTC).date();
        today.saturating_sub(days.days()).to_string()
    }

    async fn seeded() -> SeaOrmFilmStore {
        let store = SeaOrmFilmStore::new(db::memory().await);
        for film in [
            record("Pulp Fiction", 1, Some(days_ago(3).as_str()), Some(5)),
            record("21 Grams", 1, Some(days_ago(90).as_str()), Some(4)),
            record("Star Wars", 0, None, None),
            record("Matrix", 0, None, None),
            record("Shrek", 0, Some(days_ago(30).as_str()), Some(3)),
        ] {
            store.insert(&film).await.unwrap();
        }
        store
    }

    fn titles(films: &[Film]) -> Vec<&str> {
        films.iter().map(|f| f.title.as_str()).collect()
    }

    #[tokio::test]
    async fn insert_reports_generated_id_and_one_row() {
        let store = SeaOrmFilmStore::new(db::memory().await);

        let first = store.insert(&record("Dune", 0, None, None)).await.unwrap();
        let second = store.insert(&record("Arrival", 1, Some("2024-01-05"), Some(4))).await.unwrap();

        assert_eq!(first.rows_affected, 1);
        assert_eq!(second.rows_affected, 1);
        assert_eq!(second.last_insert_id, first.last_insert_id + 1);

        let rows = store.get_by_id(second.last_insert_id as i32).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Arrival");
        assert_eq!(rows[0].watch_date.map(|d| d.to_string()).as_deref(), Some("2024-01-05"));
        assert_eq!(rows[0].rating, Some(4));
    }

    #[tokio::test]
    async fn filters_select_matching_rows() {
        let store = seeded().await;

        let all = store.list_by_filter(FilmFilter::All).await.unwrap();
        assert_eq!(all.len(), 5);

        let favorites = store.list_by_filter(FilmFilter::Favorite).await.unwrap();
        assert_eq!(titles(&favorites), ["Pulp Fiction", "21 Grams"]);

        let best = store.list_by_filter(FilmFilter::Best).await.unwrap();
        assert_eq!(titles(&best), ["Pulp Fiction"]);

        let unseen = store.list_by_filter(FilmFilter::Unseen).await.unwrap();
        assert_eq!(titles(&unseen), ["Star Wars", "Matrix"]);

        let last_month = store.list_by_filter(FilmFilter::LastMonth).await.unwrap();
        assert_eq!(titles(&last_month), ["Pulp Fiction", "Shrek"]);
    }

    #[tokio::test]
    async fn missing_rows_yield_empty_results() {
        let store = seeded().await;

        assert!(store.get_by_id(999).await.unwrap().is_empty());
        assert!(store.get_rating_by_id(999).await.unwrap().is_empty());
        assert_eq!(store.update_favorite(999, 1).await.unwrap().rows_affected, 0);
        assert_eq!(store.delete(999).await.unwrap().rows_affected, 0);
    }

    #[tokio::test]
    async fn rating_lookup_distinguishes_unrated() {
        let store = seeded().await;

        assert_eq!(store.get_rating_by_id(1).await.unwrap(), vec![Some(5)]);
        assert_eq!(store.get_rating_by_id(3).await.unwrap(), vec![None]);
    }

    #[tokio::test]
    async fn targeted_updates_touch_one_row() {
        let store = seeded().await;

        assert_eq!(store.update_favorite(3, 1).await.unwrap().rows_affected, 1);
        assert_eq!(store.update_rating(3, 2).await.unwrap().rows_affected, 1);

        let film = store.get_by_id(3).await.unwrap().remove(0);
        assert_eq!(film.favorite, 1);
        assert_eq!(film.rating, Some(2));
    }

    #[tokio::test]
    async fn empty_field_map_is_a_no_op() {
        let store = seeded().await;

        let outcome = store.update_fields(1, Vec::new()).await.unwrap();
        assert_eq!(outcome, WriteOutcome::default());
    }

    #[tokio::test]
    async fn field_map_writes_values_and_nulls() {
        let store = seeded().await;

        let fields = vec![
            ("title".to_string(), Value::from("Pulp Fiction (1994)")),
            ("watchdate".to_string(), Value::String(None)),
            ("rating".to_string(), Value::Int(None)),
        ];
        assert_eq!(store.update_fields(1, fields).await.unwrap().rows_affected, 1);

        let film = store.get_by_id(1).await.unwrap().remove(0);
        assert_eq!(film.title, "Pulp Fiction (1994)");
        assert_eq!(film.watch_date, None);
        assert_eq!(film.rating, None);
    }

    #[tokio::test]
    async fn unknown_columns_surface_as_storage_errors() {
        let store = seeded().await;

        let fields = vec![("director".to_string(), Value::from("Tarantino"))];
        let err = store.update_fields(1, fields).await.unwrap_err();
        assert!(matches!(err, FilmError::Storage(ref msg) if msg.contains("director")), "{err}");
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let store = seeded().await;

        assert_eq!(store.delete(2).await.unwrap().rows_affected, 1);
        assert!(store.get_by_id(2).await.unwrap().is_empty());
        assert_eq!(store.list_by_filter(FilmFilter::All).await.unwrap().len(), 4);
    }
}
