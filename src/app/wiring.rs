use crate::{context, storage};
use anyhow::{Context, Result};

pub fn init_data_dir(ctx: &context::Context) -> Result<()> {
    std::fs::create_dir_all(&ctx.data_dir)
        .with_context(|| format!("creating {}", ctx.data_dir.display()))?;
    Ok(())
}

pub fn init_storage(ctx: &context::Context) -> Result<storage::SqliteStorage> {
    let sqlite = storage::SqliteStorage::new(ctx.db_path());
    if ctx.reset {
        sqlite.reset_all().context("resetting storage")?;
    }
    sqlite.init().context("initializing storage")?;
    Ok(sqlite)
}
