use axum::extract::{FromRequest, FromRequestParts, Path, Query};
use axum::http::request::Parts;
use axum::Json;
use rusqlite::Connection;

use super::error::AppError;
use super::AppState;

/// One database connection per request, closed when the handler returns or fails.
pub struct Session(pub Connection);

impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(_parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        Ok(Session(state.db.session()?))
    }
}

/// JSON body; shape errors become a 422 [`AppError::Validation`].
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ValidJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct ValidQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct ValidPath<T>(pub T);
