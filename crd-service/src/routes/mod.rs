mod auth;
mod health;
mod records;
mod reports;

use axum::Router;
use axum::routing::{get, patch, post};

use crate::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        // Auth routes
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        // Record routes
        .route("/records", get(records::list_records))
        .route("/records/{id}", patch(records::update_record))
        // Report routes over the upcoming window
        .route("/reports/upcoming", get(reports::upcoming))
        .route("/reports/weekly", get(reports::weekly))
        .route("/reports/export", get(reports::export))
}
