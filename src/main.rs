use anyhow::Result;
use ocr_processor::utils::logging::{self, LogOptions};
use ocr_processor::App;
use std::path::PathBuf;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 初始化日志
    if let Some(path) = logging::init(&LogOptions::from_env())? {
        info!("📝 日志文件: {}", path.display());
    }

    // 唯一的位置参数：配置文件路径
    let Some(config_path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        error!("[IoError] 缺少配置文件路径参数，用法: ocr_processor <config.toml>");
        return Ok(());
    };

    let outcome = App::new().run(&config_path).await;

    let code = outcome.exit_code();
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
