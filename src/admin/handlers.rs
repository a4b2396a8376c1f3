use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, Redirect},
    routing::{get, post},
    Form, Router,
};
use tracing::{info, instrument};

use crate::{
    admin::{engine, schema, schema::TableDescriptor, views},
    auth::extractors::CurrentUser,
    error::ApiError,
    state::AppState,
};

pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

pub fn model_routes() -> Router<AppState> {
    Router::new()
        .route("/model/:table", get(list_rows))
        .route("/model/:table/create", get(create_form).post(create_row))
        .route("/model/:table/edit/:id", get(edit_form).post(update_row))
        .route("/model/:table/delete/:id", post(delete_row))
}

/// Unknown table names 404 before anything touches the store.
fn resolve(table: &str) -> Result<&'static TableDescriptor, ApiError> {
    schema::lookup(table).ok_or_else(|| ApiError::not_found(format!("unknown table `{table}`")))
}

#[instrument(skip(state, _user))]
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> Result<Html<String>, ApiError> {
    let users = resolve("users")?;
    let items = resolve("items")?;
    let user_count = engine::count_rows(&state.db, users).await?;
    let item_count = engine::count_rows(&state.db, items).await?;
    Ok(Html(views::dashboard_page(
        user_count,
        item_count,
        schema::tables(),
    )))
}

#[instrument(skip(state, _user))]
pub async fn list_rows(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(table): Path<String>,
) -> Result<Html<String>, ApiError> {
    let table = resolve(&table)?;
    let rows = engine::list_rows(&state.db, table).await?;
    Ok(Html(views::model_list_page(table, &rows)))
}

#[instrument(skip(_user))]
pub async fn create_form(
    CurrentUser(_user): CurrentUser,
    Path(table): Path<String>,
) -> Result<Html<String>, ApiError> {
    let table = resolve(&table)?;
    Ok(Html(views::create_page(table)))
}

#[instrument(skip(state, _user, fields))]
pub async fn create_row(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(table): Path<String>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<(StatusCode, HeaderMap), ApiError> {
    let table = resolve(&table)?;
    engine::create_row(&state.db, table, &fields).await?;
    info!(table = table.name, "admin created row");

    let mut headers = HeaderMap::new();
    headers.insert(
        header::LOCATION,
        format!("/model/{}", table.name)
            .parse()
            .map_err(anyhow::Error::from)?,
    );
    Ok((StatusCode::CREATED, headers))
}

#[instrument(skip(state, _user))]
pub async fn edit_form(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path((table, id)): Path<(String, i64)>,
) -> Result<Html<String>, ApiError> {
    let table = resolve(&table)?;
    let row = engine::get_row(&state.db, table, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no `{}` row with id {id}", table.name)))?;
    Ok(Html(views::edit_page(table, id, &row)))
}

#[instrument(skip(state, _user, fields))]
pub async fn update_row(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path((table, id)): Path<(String, i64)>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Redirect, ApiError> {
    let table = resolve(&table)?;
    engine::update_row(&state.db, table, id, &fields).await?;
    info!(table = table.name, id, "admin updated row");
    Ok(Redirect::to(&format!("/model/{}", table.name)))
}

#[instrument(skip(state, _user))]
pub async fn delete_row(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path((table, id)): Path<(String, i64)>,
) -> Result<Redirect, ApiError> {
    let table = resolve(&table)?;
    engine::delete_row(&state.db, table, id).await?;
    info!(table = table.name, id, "admin deleted row");
    Ok(Redirect::to(&format!("/model/{}", table.name)))
}
