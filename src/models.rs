use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{de, Deserialize, Deserializer, Serialize};

// ── Users ──

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserCreate {
    pub user_name: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    pub user_id: i64,
    pub user_name: String,
    pub password: String,
}

// ── Items ──

/// Item fields as posted to `/users/{user_id}/items/`, where the owner comes from the path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemDraft {
    pub item_name: String,
    #[serde(default)]
    pub item_image: Option<String>,
    pub category: String,
    #[serde(deserialize_with = "date_or_datetime")]
    pub purchase_date: NaiveDate,
    #[serde(deserialize_with = "date_or_datetime")]
    pub limit_date: NaiveDate,
    pub unit: i64,
    #[serde(default, rename = "ItemURL")]
    pub item_url: Option<String>,
}

impl ItemDraft {
    pub fn owned_by(self, user_id: i64) -> ItemCreate {
        ItemCreate { draft: self, user_id }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemCreate {
    #[serde(flatten)]
    pub draft: ItemDraft,
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Item {
    pub item_id: i64,
    pub item_name: String,
    pub item_image: Option<String>,
    pub category: String,
    pub purchase_date: NaiveDate,
    pub limit_date: NaiveDate,
    pub unit: i64,
    #[serde(rename = "ItemURL")]
    pub item_url: Option<String>,
    pub user_id: i64,
}

// ── Recipes ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Recipe {
    pub recipe_id: i64,
    pub recipe_title: String,
    pub recipe_category: String,
    pub recipe_image: String,
    #[serde(rename = "RecipeURL")]
    pub recipe_url: String,
}

// ── Paging ──

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
        }
    }
}

fn default_limit() -> u32 {
    10
}

/// Accepts `2024-05-01`, `2024-05-01T09:30:00` or RFC 3339 and keeps the date part.
fn date_or_datetime<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| de::Error::custom(format!("invalid date `{}`", raw)))
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn date_formats() {
        let d = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(parse_date("2024-05-01"), Some(d));
        assert_eq!(parse_date("2024-05-01T09:30:00"), Some(d));
        assert_eq!(parse_date("2024-05-01T09:30:00.250"), Some(d));
        assert_eq!(parse_date("2024-05-01T23:30:00+09:00"), Some(d));
        assert_eq!(parse_date("01/05/2024"), None);
    }

    #[test]
    fn item_create_from_pascal_case_payload() {
        let body = json!({
            "ItemName": "ツナ缶",
            "Category": "缶詰",
            "PurchaseDate": "2024-05-01T00:00:00",
            "LimitDate": "2026-05-01",
            "Unit": 3,
            "UserId": 7
        });
        let item: ItemCreate = serde_json::from_value(body).unwrap();
        assert_eq!(item.user_id, 7);
        assert_eq!(item.draft.unit, 3);
        assert_eq!(item.draft.item_image, None);
        assert_eq!(item.draft.item_url, None);
        assert_eq!(item.draft.limit_date, NaiveDate::from_ymd_opt(2026, 5, 1).unwrap());
    }

    #[test]
    fn item_missing_user_is_rejected() {
        let body = json!({
            "ItemName": "パスタ",
            "Category": "乾物",
            "PurchaseDate": "2024-05-01",
            "LimitDate": "2025-05-01",
            "Unit": 1
        });
        assert!(serde_json::from_value::<ItemCreate>(body).is_err());
    }

    #[test]
    fn item_serializes_pascal_case_field_names() {
        let item = Item {
            item_id: 1,
            item_name: "クラッカー".into(),
            item_image: None,
            category: "菓子".into(),
            purchase_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            limit_date: NaiveDate::from_ymd_opt(2024, 7, 2).unwrap(),
            unit: 2,
            item_url: Some("https://example.com/cracker".into()),
            user_id: 4,
        };
        let v = serde_json::to_value(&item).unwrap();
        assert_eq!(v["ItemId"], 1);
        assert_eq!(v["ItemURL"], "https://example.com/cracker");
        assert_eq!(v["PurchaseDate"], "2024-01-02");
        assert_eq!(v["UserId"], 4);
    }

    #[test]
    fn pagination_defaults() {
        let p: Pagination = serde_json::from_value(json!({})).unwrap();
        assert_eq!((p.skip, p.limit), (0, 10));
    }
}
