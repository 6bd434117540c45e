use anyhow::Context;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::repo::Recipe;

/// Wire shape of a recipe. Identical to the row except that `nutrients`
/// goes out as a JSON object (empty when the column is NULL), never as
/// the raw serialized string.
#[derive(Debug, Serialize)]
pub struct RecipeJson {
    pub id: i64,
    pub title: Option<String>,
    pub cuisine: Option<String>,
    pub rating: Option<f64>,
    pub prep_time: Option<i64>,
    pub cook_time: Option<i64>,
    pub total_time: Option<i64>,
    pub description: Option<String>,
    pub nutrients: Value,
    pub serves: Option<String>,
}

impl RecipeJson {
    pub fn from_row(r: Recipe) -> anyhow::Result<Self> {
        let nutrients = match r.nutrients.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => serde_json::from_str(raw).context("deserialize nutrients")?,
            None => Value::Object(Map::new()),
        };
        Ok(Self {
            id: r.id,
            title: r.title,
            cuisine: r.cuisine,
            rating: r.rating,
            prep_time: r.prep_time,
            cook_time: r.cook_time,
            total_time: r.total_time,
            description: r.description,
            nutrients,
            serves: r.serves,
        })
    }
}

/// `?page=abc` falls back to the default instead of rejecting the request.
fn lenient_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(Option::<String>::deserialize(d)?.and_then(|s| s.trim().parse().ok()))
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    #[serde(default, deserialize_with = "lenient_int")]
    page: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    limit: Option<i64>,
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(15)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub title: Option<String>,
    pub cuisine: Option<String>,
    pub total_time: Option<String>,
    pub rating: Option<String>,
    pub calories: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PageResponse {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub data: Vec<RecipeJson>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub data: Vec<RecipeJson>,
}
