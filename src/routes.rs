use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    AppState,
    error::FilmResult,
    models::{Film, FilmFilter, FilmPatch, FavoriteRequest, ListQuery, NewFilm, RatingRequest},
};

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/films", get(list_films).post(add_film))
        .route("/films/{id}", get(get_film).patch(update_film).delete(delete_film))
        .route("/films/{id}/favorite", patch(update_favorite))
        .route("/films/{id}/rating", patch(update_rating));

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http())
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Endpoint not found" })))
}

pub async fn list_films(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> FilmResult<Json<Vec<Film>>> {
    let filter = FilmFilter::from_keyword(q.filter.as_deref());
    Ok(Json(state.films.list(filter).await?))
}

pub async fn get_film(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> FilmResult<Json<Vec<Film>>> {
    Ok(Json(state.films.get_by_id(id).await?))
}

pub async fn add_film(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewFilm>, JsonRejection>,
) -> FilmResult<Json<bool>> {
    let Json(film) = body?;
    state.films.add(film).await?;
    Ok(Json(true))
}

pub async fn update_favorite(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    body: Result<Json<FavoriteRequest>, JsonRejection>,
) -> FilmResult<Json<bool>> {
    let Json(req) = body?;
    state.films.update_favorite(id, req.favorite).await?;
    Ok(Json(true))
}

pub async fn update_rating(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    body: Result<Json<RatingRequest>, JsonRejection>,
) -> FilmResult<Json<bool>> {
    let Json(req) = body?;
    state.films.update_rating(id, req.delta_rating).await?;
    Ok(Json(true))
}

pub async fn update_film(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    body: Result<Json<FilmPatch>, JsonRejection>,
) -> FilmResult<Json<bool>> {
    let Json(patch) = body?;
    state.films.update_fields(id, patch).await?;
    Ok(Json(true))
}

pub async fn delete_film(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> FilmResult<Json<bool>> {
    state.films.delete(id).await?;
    Ok(Json(true))
}
