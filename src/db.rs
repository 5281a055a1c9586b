use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};

use crate::models::{Item, ItemCreate, Pagination, Recipe, User, UserCreate};
use crate::recipes::RecipeRecord;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the SQLite store. Cheap to clone; every request opens its own
/// connection through [`Database::session`] and closes it on drop.
#[derive(Clone)]
pub struct Database {
    target: String,
    flags: OpenFlags,
    // Shared-cache memory databases vanish when their last connection closes.
    _anchor: Option<Arc<Mutex<Connection>>>,
}

impl Database {
    /// Open a database file. `:memory:` maps to a shared in-memory database.
    pub fn open(path: &Path) -> Result<Self> {
        if path == Path::new(":memory:") {
            return Self::in_memory("pantry");
        }
        let db = Self {
            target: path.to_string_lossy().into_owned(),
            flags: OpenFlags::default(),
            _anchor: None,
        };
        let conn = db.session()?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(db)
    }

    /// Named in-memory database shared by every session of this handle.
    pub fn in_memory(name: &str) -> Result<Self> {
        let mut db = Self {
            target: format!("file:{}?mode=memory&cache=shared", name),
            flags: OpenFlags::default() | OpenFlags::SQLITE_OPEN_URI,
            _anchor: None,
        };
        db._anchor = Some(Arc::new(Mutex::new(db.session()?)));
        Ok(db)
    }

    pub fn session(&self) -> Result<Connection> {
        let conn = Connection::open_with_flags(&self.target, self.flags)
            .with_context(|| format!("Failed to open {}", self.target))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(conn)
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            UserId    INTEGER PRIMARY KEY AUTOINCREMENT,
            UserName  TEXT NOT NULL,
            Password  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS items (
            ItemId       INTEGER PRIMARY KEY AUTOINCREMENT,
            ItemName     TEXT NOT NULL,
            ItemImage    TEXT,
            Category     TEXT NOT NULL,
            PurchaseDate TEXT NOT NULL,
            LimitDate    TEXT NOT NULL,
            Unit         INTEGER NOT NULL,
            ItemURL      TEXT,
            UserId       INTEGER NOT NULL REFERENCES users(UserId)
        );
        CREATE INDEX IF NOT EXISTS idx_items_user ON items(UserId);

        CREATE TABLE IF NOT EXISTS recipes (
            RecipeId       INTEGER PRIMARY KEY AUTOINCREMENT,
            RecipeTitle    TEXT NOT NULL,
            RecipeCategory TEXT NOT NULL,
            RecipeImage    TEXT NOT NULL,
            RecipeURL      TEXT NOT NULL,
            UNIQUE(RecipeURL, RecipeCategory)
        );
        ",
    )?;
    Ok(())
}

// ── Users ──

const USER_COLUMNS: &str = "UserId, UserName, Password";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        user_id: row.get(0)?,
        user_name: row.get(1)?,
        password: row.get(2)?,
    })
}

pub fn insert_user(conn: &Connection, user: &UserCreate) -> Result<User> {
    conn.execute(
        "INSERT INTO users (UserName, Password) VALUES (?1, ?2)",
        params![user.user_name, user.password],
    )?;
    Ok(User {
        user_id: conn.last_insert_rowid(),
        user_name: user.user_name.clone(),
        password: user.password.clone(),
    })
}

pub fn get_user(conn: &Connection, user_id: i64) -> Result<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE UserId = ?1", USER_COLUMNS),
            params![user_id],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn list_users(conn: &Connection, page: Pagination) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM users ORDER BY UserId LIMIT ?1 OFFSET ?2",
        USER_COLUMNS
    ))?;
    let rows = stmt
        .query_map(params![page.limit, page.skip], user_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Items ──

const ITEM_COLUMNS: &str =
    "ItemId, ItemName, ItemImage, Category, PurchaseDate, LimitDate, Unit, ItemURL, UserId";

fn item_from_row(row: &Row) -> rusqlite::Result<Item> {
    Ok(Item {
        item_id: row.get(0)?,
        item_name: row.get(1)?,
        item_image: row.get(2)?,
        category: row.get(3)?,
        purchase_date: row.get(4)?,
        limit_date: row.get(5)?,
        unit: row.get(6)?,
        item_url: row.get(7)?,
        user_id: row.get(8)?,
    })
}

pub fn insert_item(conn: &Connection, item: &ItemCreate) -> Result<Item> {
    let d = &item.draft;
    conn.execute(
        "INSERT INTO items
         (ItemName, ItemImage, Category, PurchaseDate, LimitDate, Unit, ItemURL, UserId)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            d.item_name, d.item_image, d.category, d.purchase_date, d.limit_date,
            d.unit, d.item_url, item.user_id,
        ],
    )?;
    Ok(Item {
        item_id: conn.last_insert_rowid(),
        item_name: d.item_name.clone(),
        item_image: d.item_image.clone(),
        category: d.category.clone(),
        purchase_date: d.purchase_date,
        limit_date: d.limit_date,
        unit: d.unit,
        item_url: d.item_url.clone(),
        user_id: item.user_id,
    })
}

pub fn get_item(conn: &Connection, item_id: i64) -> Result<Option<Item>> {
    let item = conn
        .query_row(
            &format!("SELECT {} FROM items WHERE ItemId = ?1", ITEM_COLUMNS),
            params![item_id],
            item_from_row,
        )
        .optional()?;
    Ok(item)
}

pub fn list_items(conn: &Connection, page: Pagination) -> Result<Vec<Item>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM items ORDER BY ItemId LIMIT ?1 OFFSET ?2",
        ITEM_COLUMNS
    ))?;
    let rows = stmt
        .query_map(params![page.limit, page.skip], item_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn items_for_user(conn: &Connection, user_id: i64) -> Result<Vec<Item>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM items WHERE UserId = ?1 ORDER BY ItemId",
        ITEM_COLUMNS
    ))?;
    let rows = stmt
        .query_map(params![user_id], item_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Recipes ──

/// Insert scraped recipes in one transaction. Rows already present
/// (same URL and category) are skipped; returns the number inserted.
pub fn insert_recipes(conn: &Connection, records: &[RecipeRecord]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO recipes (RecipeTitle, RecipeCategory, RecipeImage, RecipeURL)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for r in records {
            count += stmt.execute(params![r.title, r.parent_category, r.image_url, r.link])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn list_recipes(conn: &Connection, page: Pagination) -> Result<Vec<Recipe>> {
    let mut stmt = conn.prepare(
        "SELECT RecipeId, RecipeTitle, RecipeCategory, RecipeImage, RecipeURL
         FROM recipes ORDER BY RecipeId LIMIT ?1 OFFSET ?2",
    )?;
    let rows = stmt
        .query_map(params![page.limit, page.skip], |row| {
            Ok(Recipe {
                recipe_id: row.get(0)?,
                recipe_title: row.get(1)?,
                recipe_category: row.get(2)?,
                recipe_image: row.get(3)?,
                recipe_url: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub users: usize,
    pub items: usize,
    pub recipes: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let users: usize = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
    let items: usize = conn.query_row("SELECT COUNT(*) FROM items", [], |r| r.get(0))?;
    let recipes: usize = conn.query_row("SELECT COUNT(*) FROM recipes", [], |r| r.get(0))?;
    Ok(Stats {
        users,
        items,
        recipes,
    })
}
