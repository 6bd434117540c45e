use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use super::filter::SearchFilters;

/// A stored recipe. Every column except `id` is nullable; the loader
/// writes NULL for absent or empty source values so "unknown" never
/// shows up as an empty string.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: i64,
    pub title: Option<String>,
    pub cuisine: Option<String>,
    pub rating: Option<f64>,
    pub prep_time: Option<i64>,
    pub cook_time: Option<i64>,
    pub total_time: Option<i64>,
    pub description: Option<String>,
    pub nutrients: Option<String>,
    pub serves: Option<String>,
}

/// Insert shape used by the loader. `nutrients` is always present,
/// serialized as `"{}"` when the source had none.
#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub title: Option<String>,
    pub cuisine: Option<String>,
    pub rating: Option<f64>,
    pub prep_time: Option<i64>,
    pub cook_time: Option<i64>,
    pub total_time: Option<i64>,
    pub description: Option<String>,
    pub nutrients: String,
    pub serves: Option<String>,
}

impl Recipe {
    pub async fn count_all(db: &SqlitePool) -> anyhow::Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes")
            .fetch_one(db)
            .await?;
        Ok(count)
    }

    /// One page of recipes, best-rated first. Unrated rows sort last.
    pub async fn page_by_rating(
        db: &SqlitePool,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Recipe>> {
        let rows = sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, title, cuisine, rating, prep_time, cook_time, total_time,
                   description, nutrients, serves
            FROM recipes
            ORDER BY rating DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Fetch all rows matching the pushdown filters, AND-combined. The
    /// calories filter is not applied here; callers run it over the
    /// deserialized nutrients after the fetch.
    pub async fn search(db: &SqlitePool, f: &SearchFilters) -> anyhow::Result<Vec<Recipe>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, title, cuisine, rating, prep_time, cook_time, total_time, \
             description, nutrients, serves FROM recipes WHERE 1 = 1",
        );

        if let Some(cuisine) = &f.cuisine {
            qb.push(" AND cuisine LIKE '%' || ");
            qb.push_bind(cuisine);
            qb.push(" || '%'");
        }
        if let Some(title) = &f.title {
            qb.push(" AND title LIKE '%' || ");
            qb.push_bind(title);
            qb.push(" || '%'");
        }
        if let Some(cmp) = f.total_time {
            qb.push(" AND total_time ");
            qb.push(cmp.op.sql());
            qb.push(" ");
            qb.push_bind(cmp.value);
        }
        if let Some(cmp) = f.rating {
            qb.push(" AND rating ");
            qb.push(cmp.op.sql());
            qb.push(" ");
            qb.push_bind(cmp.value);
        }

        let rows = qb.build_query_as::<Recipe>().fetch_all(db).await?;
        Ok(rows)
    }
}

/// Persist one loader batch in a single transaction. There is no
/// cross-batch rollback; a crash mid-run leaves earlier batches in place.
pub async fn insert_batch(db: &SqlitePool, batch: &[NewRecipe]) -> anyhow::Result<()> {
    let mut tx = db.begin().await?;
    for r in batch {
        sqlx::query(
            r#"
            INSERT INTO recipes (title, cuisine, rating, prep_time, cook_time,
                                 total_time, description, nutrients, serves)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&r.title)
        .bind(&r.cuisine)
        .bind(r.rating)
        .bind(r.prep_time)
        .bind(r.cook_time)
        .bind(r.total_time)
        .bind(&r.description)
        .bind(&r.nutrients)
        .bind(&r.serves)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    use sqlx::sqlite::SqlitePoolOptions;

    // One connection only: every connection to sqlite::memory: gets its
    // own private database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    pool
}
