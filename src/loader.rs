//! One-shot bulk import of a recipe dump.
//!
//! The dump is a single JSON object mapping arbitrary keys to
//! recipe-shaped objects. Rows are flushed in batches of 5000, one
//! transaction per flush; a malformed entry is logged and skipped
//! without aborting the run.

use std::path::Path;

use anyhow::Context;
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::recipes::repo::{insert_batch, NewRecipe};

pub const BATCH_SIZE: usize = 5000;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("entry is not a JSON object")]
    NotAnObject,
    #[error("serialize nutrients: {0}")]
    Nutrients(#[from] serde_json::Error),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoadSummary {
    pub inserted: u64,
    pub skipped: u64,
}

pub async fn load_file(db: &SqlitePool, path: &Path) -> anyhow::Result<LoadSummary> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    let entries: Map<String, Value> =
        serde_json::from_str(&raw).context("parse recipe dump")?;
    load_entries(db, &entries).await
}

pub async fn load_entries(
    db: &SqlitePool,
    entries: &Map<String, Value>,
) -> anyhow::Result<LoadSummary> {
    let mut summary = LoadSummary::default();
    let mut batch: Vec<NewRecipe> = Vec::with_capacity(BATCH_SIZE.min(entries.len()));

    for (key, entry) in entries {
        match normalize(entry) {
            Ok(row) => batch.push(row),
            Err(e) => {
                warn!(key = %key, error = %e, "skipping malformed recipe entry");
                summary.skipped += 1;
                continue;
            }
        }
        if batch.len() >= BATCH_SIZE {
            insert_batch(db, &batch).await?;
            summary.inserted += batch.len() as u64;
            batch.clear();
        }
    }
    if !batch.is_empty() {
        insert_batch(db, &batch).await?;
        summary.inserted += batch.len() as u64;
    }

    info!(
        inserted = summary.inserted,
        skipped = summary.skipped,
        "recipe import finished"
    );
    Ok(summary)
}

fn normalize(entry: &Value) -> Result<NewRecipe, LoadError> {
    let obj = entry.as_object().ok_or(LoadError::NotAnObject)?;

    // Always serialized, even when the source has no nutrients at all:
    // the column stores "{}" rather than NULL.
    let empty = Value::Object(Map::new());
    let nutrients = serde_json::to_string(obj.get("nutrients").unwrap_or(&empty))?;

    Ok(NewRecipe {
        title: text(obj, "title"),
        cuisine: text(obj, "cuisine"),
        rating: float(obj, "rating"),
        prep_time: int(obj, "prep_time"),
        cook_time: int(obj, "cook_time"),
        total_time: int(obj, "total_time"),
        description: text(obj, "description"),
        nutrients,
        serves: text(obj, "serves"),
    })
}

// Falsy source values collapse to NULL, zero included. The upstream
// dump uses 0, "" and null interchangeably for "unknown", at the cost
// of losing any legitimate zero.

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn float(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(Value::as_f64).filter(|v| *v != 0.0)
}

fn int(obj: &Map<String, Value>, key: &str) -> Option<i64> {
    obj.get(key).and_then(Value::as_i64).filter(|v| *v != 0)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;
    use crate::recipes::repo::{test_pool, Recipe};

    #[tokio::test]
    async fn loads_valid_entries_and_skips_malformed_ones() {
        let mut dump = Map::new();
        dump.insert(
            "1".into(),
            json!({
                "title": "Margherita Pizza",
                "cuisine": "Italian",
                "rating": 4.5,
                "prep_time": 15,
                "cook_time": 30,
                "total_time": 45,
                "description": "Classic Neapolitan pie",
                "nutrients": { "calories": "389 kcal", "fat": "10 g" },
                "serves": "4 servings"
            }),
        );
        dump.insert("2".into(), json!("not a recipe"));
        dump.insert("3".into(), json!({ "title": "Plain Rice" }));
        dump.insert("4".into(), json!([1, 2, 3]));

        let pool = test_pool().await;
        let summary = load_entries(&pool, &dump).await.expect("load");
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(Recipe::count_all(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn falsy_values_become_null_and_nutrients_always_serialize() {
        let mut dump = Map::new();
        dump.insert(
            "1".into(),
            json!({
                "title": "",
                "cuisine": null,
                "rating": 0.0,
                "prep_time": 0,
                "total_time": 25,
                "serves": 4
            }),
        );

        let pool = test_pool().await;
        load_entries(&pool, &dump).await.expect("load");

        let rows = Recipe::page_by_rating(&pool, 10, 0).await.unwrap();
        assert_eq!(rows.len(), 1);
        let r = &rows[0];
        assert_eq!(r.title, None);
        assert_eq!(r.cuisine, None);
        assert_eq!(r.rating, None);
        assert_eq!(r.prep_time, None);
        assert_eq!(r.cook_time, None);
        assert_eq!(r.total_time, Some(25));
        // non-string serves is treated as absent, not stringified
        assert_eq!(r.serves, None);
        assert_eq!(r.nutrients.as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn nutrients_survive_the_round_trip() {
        let mut dump = Map::new();
        dump.insert(
            "1".into(),
            json!({
                "title": "Garlic Bread",
                "nutrients": { "calories": "389 kcal", "fat": "10 g" }
            }),
        );

        let pool = test_pool().await;
        load_entries(&pool, &dump).await.expect("load");

        let rows = Recipe::page_by_rating(&pool, 1, 0).await.unwrap();
        let stored: Value = serde_json::from_str(rows[0].nutrients.as_deref().unwrap()).unwrap();
        assert_eq!(stored, json!({ "calories": "389 kcal", "fat": "10 g" }));
    }

    #[tokio::test]
    async fn flushes_in_batches_with_remainder() {
        let mut dump = Map::new();
        for i in 0..(BATCH_SIZE + 3) {
            dump.insert(format!("r{i}"), json!({ "title": format!("Recipe {i}") }));
        }

        let pool = test_pool().await;
        let summary = load_entries(&pool, &dump).await.expect("load");
        assert_eq!(summary.inserted, (BATCH_SIZE + 3) as u64);
        assert_eq!(
            Recipe::count_all(&pool).await.unwrap(),
            (BATCH_SIZE + 3) as i64
        );
    }

    #[tokio::test]
    async fn no_flush_writes_more_than_one_batch() {
        let mut dump = Map::new();
        for i in 0..(BATCH_SIZE + 3) {
            dump.insert(format!("r{i:05}"), json!({ "title": format!("Recipe {i}") }));
        }

        let pool = test_pool().await;
        // Reject any insert once a full batch is stored. The first flush
        // fills the table exactly to BATCH_SIZE; the remainder flush then
        // aborts, and its rows roll back without touching the first batch.
        // Had the loader flushed everything in one transaction, the abort
        // would leave zero rows.
        sqlx::query(&format!(
            "CREATE TRIGGER batch_capacity BEFORE INSERT ON recipes \
             WHEN (SELECT COUNT(*) FROM recipes) >= {BATCH_SIZE} \
             BEGIN SELECT RAISE(ABORT, 'capacity reached'); END"
        ))
        .execute(&pool)
        .await
        .expect("create trigger");

        let result = load_entries(&pool, &dump).await;
        assert!(result.is_err(), "remainder flush should hit the trigger");
        assert_eq!(
            Recipe::count_all(&pool).await.unwrap(),
            BATCH_SIZE as i64,
            "first flush should have written exactly one full batch"
        );
    }

    #[tokio::test]
    async fn load_file_reads_a_dump_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        let dump = json!({
            "1": { "title": "Pad Thai", "cuisine": "Thai", "rating": 4.8 },
            "2": { "title": "Lasagna", "cuisine": "Italian" }
        });
        write!(file, "{dump}").expect("write dump");

        let pool = test_pool().await;
        let summary = load_file(&pool, file.path()).await.expect("load");
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.skipped, 0);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let pool = test_pool().await;
        assert!(load_file(&pool, Path::new("/nonexistent/recipes.json"))
            .await
            .is_err());
    }
}
