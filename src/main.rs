use std::env;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use themis_mcp::config::Config;
use themis_mcp::diary::Diary;
use themis_mcp::mcp::run_stdio;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout 专用于协议消息，日志写 stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = match env::args().nth(1) {
        Some(path) => Config::load_from_path(Path::new(&path))
            .with_context(|| format!("failed to load config {path}"))?,
        None => Config::default(),
    };

    let diary = Diary::from_config(&config).context("failed to set up vault scanner")?;
    tracing::info!(
        vault = %diary.scanner().root().display(),
        order = ?config.vault.order,
        "starting {} {}",
        config.server.name,
        config.server.version
    );

    run_stdio(Arc::new(diary), config.server).await?;
    Ok(())
}
