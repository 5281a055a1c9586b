use std::collections::HashSet;
use std::sync::LazyLock;

use anyhow::{bail, Result};
use regex::{Captures, Regex};

use crate::recipes::RecipeRecord;

pub const RANKING_LINK_CLASS: &str = "recipe_ranking__link";
pub const RANKING_TITLE_CLASS: &str = "recipe_ranking__recipe_title";

static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a(\s[^>]*)?>(.*?)</a\s*>").unwrap());
static SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<span(\s[^>]*)?>(.*?)</span\s*>").unwrap());
static IMG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<img(\s[^>]*?)/?>").unwrap());
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)(?:^|\s)([a-z][a-z0-9_:-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .unwrap()
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(?:[xX]([0-9a-fA-F]+)|([0-9]+));").unwrap());
static CATEGORY_HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://[^/]+)?(/category/[0-9][0-9-]*/?)$").unwrap()
});

/// A category discovered on the category index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub path: String,
}

/// Extract one record per ranking anchor on a search or category page.
///
/// `category` becomes the record's `parent_category` (the search term or the
/// category label). Relative hrefs are joined onto `base_url`.
pub fn parse_ranking(html: &str, base_url: &str, category: &str) -> Result<Vec<RecipeRecord>> {
    let mut records = Vec::new();

    for (i, caps) in ANCHOR_RE.captures_iter(html).enumerate() {
        let attrs = caps.get(1).map_or("", |m| m.as_str());
        if !has_class(attrs, RANKING_LINK_CLASS) {
            continue;
        }
        let inner = caps.get(2).map_or("", |m| m.as_str());

        let Some(href) = attr(attrs, "href") else {
            bail!("Ranking link #{} for {} has no href", i + 1, category);
        };
        let Some(title) = find_title(inner) else {
            bail!("Ranking link {} for {} has no title span", href, category);
        };
        let Some(image_url) = IMG_RE
            .captures(inner)
            .and_then(|img| attr(img.get(1).map_or("", |m| m.as_str()), "src"))
        else {
            bail!("Ranking link {} for {} has no image", href, category);
        };

        records.push(RecipeRecord {
            title,
            image_url,
            parent_category: category.to_string(),
            link: absolute_link(base_url, &href),
        });
    }

    Ok(records)
}

/// Collect `/category/<id>/` links in document order, first label wins per path.
pub fn parse_categories(html: &str) -> Vec<Category> {
    let mut seen = HashSet::new();
    let mut categories = Vec::new();

    for caps in ANCHOR_RE.captures_iter(html) {
        let attrs = caps.get(1).map_or("", |m| m.as_str());
        let Some(href) = attr(attrs, "href") else {
            continue;
        };
        let Some(path) = CATEGORY_HREF_RE.captures(href.trim()).map(|c| c[1].to_string()) else {
            continue;
        };
        let name = inner_text(caps.get(2).map_or("", |m| m.as_str()));
        if name.is_empty() || !seen.insert(path.clone()) {
            continue;
        }
        categories.push(Category { name, path });
    }

    categories
}

fn find_title(fragment: &str) -> Option<String> {
    SPAN_RE
        .captures_iter(fragment)
        .find(|span| has_class(span.get(1).map_or("", |m| m.as_str()), RANKING_TITLE_CLASS))
        .map(|span| inner_text(span.get(2).map_or("", |m| m.as_str())))
}

fn attr(attrs: &str, name: &str) -> Option<String> {
    ATTR_RE
        .captures_iter(attrs)
        .find(|c| c[1].eq_ignore_ascii_case(name))
        .and_then(|c| c.get(2).or_else(|| c.get(3)).or_else(|| c.get(4)))
        .map(|m| decode_entities(m.as_str()))
}

fn has_class(attrs: &str, class: &str) -> bool {
    attr(attrs, "class").is_some_and(|v| v.split_whitespace().any(|c| c == class))
}

fn absolute_link(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{}{}", base_url.trim_end_matches('/'), href)
    }
}

/// Text content with tags removed and entities decoded, trimmed at both ends.
fn inner_text(fragment: &str) -> String {
    let stripped = TAG_RE.replace_all(fragment, "");
    decode_entities(&stripped).trim().to_string()
}

fn decode_entities(s: &str) -> String {
    let numeric = NUMERIC_ENTITY_RE.replace_all(s, |c: &Captures| {
        let code = match (c.get(1), c.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (_, Some(dec)) => dec.as_str().parse().ok(),
            _ => None,
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| c[0].to_string())
    });
    // &amp; last so "&amp;lt;" stays "&lt;"
    numeric
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}
