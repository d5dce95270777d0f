mod wiring;

use crate::{cli, context, rest, storage};
use anyhow::{Context as AnyhowContext, Result};
use tokio_util::sync::CancellationToken;

pub struct App {
    pub ctx: context::Context,
    pub storage: storage::SqliteStorage,
}

impl App {
    pub fn from_cli() -> Result<(Self, cli::Cli)> {
        let cli = crate::cli::parse();
        let ctx = context::Context::from_cli(&cli);

        crate::tracing::init(ctx.log_file.as_deref());

        wiring::init_data_dir(&ctx).context("initializing data dir")?;
        let storage = wiring::init_storage(&ctx)?;

        Ok((Self { ctx, storage }, cli))
    }
}

pub async fn run_server(app: App) -> Result<()> {
    log::info!("🚀 Starting onlinecourse");
    log::info!("📂 Data dir: {}", app.ctx.data_dir.display());
    if let Some(path) = app.ctx.log_file.as_deref() {
        log::info!("📝 Log file: {}", path.display());
    }

    let shutdown = CancellationToken::new();

    let api_addr = app.ctx.api_listen;
    let rest_storage = app.storage.clone();
    let rest_shutdown = shutdown.clone();

    let mut rest_handle = tokio::spawn(async move {
        if let Err(e) = rest::serve(api_addr, rest_storage, rest_shutdown).await {
            log::error!("HTTP server error: {:#}", e);
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("🧨 Ctrl-C received, shutting down");
        }
        _ = &mut rest_handle => {},
    }

    shutdown.cancel();
    if let Err(e) = rest_handle.await {
        if !e.is_cancelled() {
            log::error!("HTTP task failed: {}", e);
            return Err(e.into());
        }
    }

    log::info!("✅ Shutdown complete");
    Ok(())
}

pub async fn run() -> Result<()> {
    let (app, cli) = App::from_cli()?;

    if let Some(cmd) = &cli.cmd {
        // one-shot command mode
        cmd.run(&app.storage)?;
        return Ok(());
    }

    run_server(app).await
}
