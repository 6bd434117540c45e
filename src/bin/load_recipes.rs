//! Imports a bulk recipe dump into the store. One-shot; not meant to run
//! while the API is serving traffic against the same database file.
//!
//! Usage: load-recipes <recipes.json>

use std::path::PathBuf;

use anyhow::Context;

use recipebox::loader;
use recipebox::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "recipebox=info".to_string());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let path: PathBuf = std::env::args()
        .nth(1)
        .context("usage: load-recipes <recipes.json>")?
        .into();

    let state = AppState::init().await?;
    sqlx::migrate!("./migrations")
        .run(&state.db)
        .await
        .context("run migrations")?;

    let summary = loader::load_file(&state.db, &path).await?;
    tracing::info!(
        inserted = summary.inserted,
        skipped = summary.skipped,
        path = %path.display(),
        "import complete"
    );
    Ok(())
}
