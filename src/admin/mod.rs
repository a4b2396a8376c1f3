use crate::state::AppState;
use axum::Router;

pub mod engine;
pub mod handlers;
pub mod schema;
mod views;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::dashboard_routes())
        .merge(handlers::model_routes())
}
