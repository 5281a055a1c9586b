pub mod error;
pub mod extract;
pub mod handlers;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Settings;
use crate::db::{self, Database};
use crate::seed;
use handlers::*;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
}

/// Every collection route answers with and without the trailing slash.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/", get(list_users).post(create_user))
        .route("/users/{user_id}", get(read_user))
        .route("/users/{user_id}/items", get(read_user_items).post(create_user_item))
        .route("/users/{user_id}/items/", get(read_user_items).post(create_user_item))
        .route("/users/{user_id}/stocks-items", get(read_user_items))
        .route("/items", get(list_items).post(create_item))
        .route("/items/", get(list_items).post(create_item))
        .route("/items/{item_id}", get(read_item))
        .route("/recipes", get(list_recipes))
        .route("/recipes/", get(list_recipes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Create the schema, seed recipes, then serve until Ctrl-C or SIGTERM.
pub async fn serve(settings: &Settings) -> Result<()> {
    let db = Database::open(&settings.database_path)?;
    info!("Database: {}", db.target());
    {
        let conn = db.session()?;
        db::init_schema(&conn)?;
        seed::seed_recipes(&conn, &settings.recipes_csv)?;
    }

    let app = router(AppState { db });
    let address = format!("{}:{}", settings.host, settings.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Server running on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::db::tests::test_db;

    fn app() -> Router {
        router(AppState { db: test_db() })
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let req = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(v) => req
                .header("content-type", "application/json")
                .body(Body::from(v.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn new_user(app: &Router, name: &str) -> i64 {
        let (status, body) = call(
            app,
            "POST",
            "/users/",
            Some(json!({"UserName": name, "Password": "secret"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["UserId"].as_i64().unwrap()
    }

    fn item_body() -> Value {
        json!({
            "ItemName": "さば缶",
            "ItemImage": "https://img.example.com/saba.jpg",
            "Category": "缶詰",
            "PurchaseDate": "2024-05-01T00:00:00",
            "LimitDate": "2027-05-01",
            "Unit": 4
        })
    }

    #[tokio::test]
    async fn user_roundtrip() {
        let app = app();
        let id = new_user(&app, "taro").await;
        let (status, body) = call(&app, "GET", &format!("/users/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"UserId": id, "UserName": "taro", "Password": "secret"}));
    }

    #[tokio::test]
    async fn duplicate_user_names_are_accepted() {
        let app = app();
        let a = new_user(&app, "same").await;
        let b = new_user(&app, "same").await;
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn missing_user_and_item_are_404() {
        let app = app();
        let (status, body) = call(&app, "GET", "/users/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"detail": "User not found"}));

        let (status, body) = call(&app, "GET", "/items/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"detail": "Item not found"}));

        for path in ["/users/999/items", "/users/999/stocks-items"] {
            let (status, body) = call(&app, "GET", path, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["detail"], "User not found");
        }
    }

    #[tokio::test]
    async fn item_created_under_user_is_listed() {
        let app = app();
        let owner = new_user(&app, "owner").await;
        let other = new_user(&app, "other").await;

        let (status, item) =
            call(&app, "POST", &format!("/users/{}/items/", owner), Some(item_body())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(item["UserId"], owner);
        assert_eq!(item["PurchaseDate"], "2024-05-01");
        assert_eq!(item["ItemURL"], Value::Null);

        let mut for_other = item_body();
        for_other["UserId"] = json!(other);
        let (status, _) = call(&app, "POST", "/items/", Some(for_other)).await;
        assert_eq!(status, StatusCode::OK);

        let (_, owned) = call(&app, "GET", &format!("/users/{}/items", owner), None).await;
        assert_eq!(owned, json!([item.clone()]));
        let (_, stocks) = call(&app, "GET", &format!("/users/{}/stocks-items", owner), None).await;
        assert_eq!(stocks, owned);

        let (status, fetched) =
            call(&app, "GET", &format!("/items/{}", item["ItemId"]), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, item);
    }

    #[tokio::test]
    async fn path_user_overrides_body_user() {
        let app = app();
        let owner = new_user(&app, "owner").await;
        let mut body = item_body();
        body["UserId"] = json!(owner + 100);
        let (status, item) = call(&app, "POST", &format!("/users/{}/items", owner), Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(item["UserId"], owner);
    }

    #[tokio::test]
    async fn item_for_unknown_user_is_404() {
        let app = app();
        let (status, body) = call(&app, "POST", "/users/5/items/", Some(item_body())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "User not found");

        let mut direct = item_body();
        direct["UserId"] = json!(5);
        let (status, _) = call(&app, "POST", "/items/", Some(direct)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn skip_and_limit() {
        let app = app();
        let first = new_user(&app, "a").await;
        let second = new_user(&app, "b").await;
        new_user(&app, "c").await;

        let (_, page) = call(&app, "GET", "/users/?limit=1", None).await;
        assert_eq!(page.as_array().unwrap().len(), 1);
        assert_eq!(page[0]["UserId"], first);

        let (_, page) = call(&app, "GET", "/users?skip=1&limit=1", None).await;
        assert_eq!(page.as_array().unwrap().len(), 1);
        assert_eq!(page[0]["UserId"], second);

        let (_, all) = call(&app, "GET", "/users/", None).await;
        assert_eq!(all.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn malformed_requests_are_422() {
        let app = app();
        let (status, body) =
            call(&app, "POST", "/users/", Some(json!({"UserName": "no password"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("Password"));

        let mut bad_date = item_body();
        bad_date["LimitDate"] = json!("someday");
        bad_date["UserId"] = json!(1);
        let (status, _) = call(&app, "POST", "/items/", Some(bad_date)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = call(&app, "GET", "/users/?limit=-1", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = call(&app, "GET", "/users/abc", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn recipes_are_listed_from_seed() {
        let state = AppState { db: test_db() };
        let conn = state.db.session().unwrap();
        seed::seed_recipes(&conn, std::path::Path::new("tests/fixtures/recipes.csv")).unwrap();
        drop(conn);

        let app = router(state);
        let (status, page) = call(&app, "GET", "/recipes/?skip=1&limit=2", None).await;
        assert_eq!(status, StatusCode::OK);
        let page = page.as_array().unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0]["RecipeTitle"], "ツナ & トマトの冷製パスタ");
        assert_eq!(page[1]["RecipeCategory"], "さば缶");
        assert!(page[1]["RecipeURL"].as_str().unwrap().starts_with("https://recipe.rakuten.co.jp/"));
    }
}
