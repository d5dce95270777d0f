mod admin;
mod app;
mod auth;
mod cli;
mod commands;
mod context;
mod courses;
mod rest;
mod storage;
mod tracing;
mod types;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run().await
}
