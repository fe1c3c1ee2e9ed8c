//! waveseek entry point.

mod app;
mod commands;
mod config;
mod level;
mod logging;
mod signal;
mod ui;
mod viz;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    app::run().await
}
