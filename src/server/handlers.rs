use axum::Json;
use rusqlite::Connection;
use tracing::{info, instrument, warn};

use super::error::{AppError, ITEM_NOT_FOUND, USER_NOT_FOUND};
use super::extract::{Session, ValidJson, ValidPath, ValidQuery};
use crate::db;
use crate::models::{Item, ItemCreate, ItemDraft, Pagination, Recipe, User, UserCreate};

type ApiResult<T> = Result<Json<T>, AppError>;

fn require_user(conn: &Connection, user_id: i64) -> Result<User, AppError> {
    db::get_user(conn, user_id)?.ok_or_else(|| {
        warn!(user_id, "User lookup missed");
        AppError::NotFound(USER_NOT_FOUND)
    })
}

// ── Users ──

#[instrument(name = "handler::create_user", skip_all)]
pub async fn create_user(
    Session(conn): Session,
    ValidJson(body): ValidJson<UserCreate>,
) -> ApiResult<User> {
    let user = db::insert_user(&conn, &body)?;
    info!(user_id = user.user_id, "Created user");
    Ok(Json(user))
}

#[instrument(name = "handler::list_users", skip(conn))]
pub async fn list_users(
    Session(conn): Session,
    ValidQuery(page): ValidQuery<Pagination>,
) -> ApiResult<Vec<User>> {
    Ok(Json(db::list_users(&conn, page)?))
}

#[instrument(name = "handler::read_user", skip(conn))]
pub async fn read_user(
    Session(conn): Session,
    ValidPath(user_id): ValidPath<i64>,
) -> ApiResult<User> {
    Ok(Json(require_user(&conn, user_id)?))
}

/// Items owned by the user; also served under the older `stocks-items` path.
#[instrument(name = "handler::read_user_items", skip(conn))]
pub async fn read_user_items(
    Session(conn): Session,
    ValidPath(user_id): ValidPath<i64>,
) -> ApiResult<Vec<Item>> {
    require_user(&conn, user_id)?;
    Ok(Json(db::items_for_user(&conn, user_id)?))
}

#[instrument(name = "handler::create_user_item", skip(conn, body))]
pub async fn create_user_item(
    Session(conn): Session,
    ValidPath(user_id): ValidPath<i64>,
    ValidJson(body): ValidJson<ItemDraft>,
) -> ApiResult<Item> {
    require_user(&conn, user_id)?;
    let item = db::insert_item(&conn, &body.owned_by(user_id))?;
    info!(item_id = item.item_id, "Created item");
    Ok(Json(item))
}

// ── Items ──

#[instrument(name = "handler::create_item", skip_all)]
pub async fn create_item(
    Session(conn): Session,
    ValidJson(body): ValidJson<ItemCreate>,
) -> ApiResult<Item> {
    require_user(&conn, body.user_id)?;
    let item = db::insert_item(&conn, &body)?;
    info!(item_id = item.item_id, user_id = item.user_id, "Created item");
    Ok(Json(item))
}

#[instrument(name = "handler::list_items", skip(conn))]
pub async fn list_items(
    Session(conn): Session,
    ValidQuery(page): ValidQuery<Pagination>,
) -> ApiResult<Vec<Item>> {
    Ok(Json(db::list_items(&conn, page)?))
}

#[instrument(name = "handler::read_item", skip(conn))]
pub async fn read_item(
    Session(conn): Session,
    ValidPath(item_id): ValidPath<i64>,
) -> ApiResult<Item> {
    match db::get_item(&conn, item_id)? {
        Some(item) => Ok(Json(item)),
        None => {
            warn!(item_id, "Item lookup missed");
            Err(AppError::NotFound(ITEM_NOT_FOUND))
        }
    }
}

// ── Recipes ──

#[instrument(name = "handler::list_recipes", skip(conn))]
pub async fn list_recipes(
    Session(conn): Session,
    ValidQuery(page): ValidQuery<Pagination>,
) -> ApiResult<Vec<Recipe>> {
    Ok(Json(db::list_recipes(&conn, page)?))
}
