mod app;
mod brew;
mod config;
mod tui;

use anyhow::Result;
use std::fs::{self, OpenOptions};

/// TUI 占用终端，日志写入文件；级别由 RUST_LOG 控制，默认 info
fn init_logger() -> Result<()> {
    let path = config::Config::log_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = init_logger() {
        eprintln!("无法初始化日志文件: {}", e);
    }

    // 加载配置
    let config = config::Config::load_or_default()?;
    log::info!("配置已加载: brew_path={:?}", config.brew_path);

    tui::run(config).await?;

    Ok(())
}
