//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};
use fintrack_core::Config;

pub async fn cmd_serve(
    config: &Config,
    host: &str,
    port: u16,
    static_dir: Option<&Path>,
) -> Result<()> {
    println!("🚀 Starting Fintrack web server...");
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }
    match &config.source {
        Some(path) => println!("   Config: {}", path.display()),
        None => println!("   Config: built-in defaults"),
    }
    println!("   Upload limit: {} MB", config.server.max_upload_mb);
    if config.server.allowed_origins.is_empty() {
        println!("   CORS: same-origin only");
    } else {
        println!("   CORS: {}", config.server.allowed_origins.join(", "));
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let static_dir_str = static_dir
        .map(|p| p.to_str().context("static dir path must be valid UTF-8"))
        .transpose()?;
    fintrack_server::serve(config, host, port, static_dir_str).await?;

    Ok(())
}
