use anyhow::Result;
use clap::Parser;
use plant_disease_detector::{config::Config, config::DEFAULT_MODEL_PATH, web::serve};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "plant-disease-detector")]
#[command(about = "Plant leaf disease detection service backed by an ONNX classifier")]
struct Args {
    /// Server bind address
    #[arg(long, default_value = "0.0.0.0:8501")]
    bind: String,

    /// Trained model path (ONNX)
    #[arg(long, default_value = DEFAULT_MODEL_PATH)]
    model: String,

    /// ONNX Runtime intra-op threads
    #[arg(long)]
    threads: Option<usize>,

    /// Maximum upload size in megabytes
    #[arg(long, default_value_t = 10)]
    max_upload_mb: usize,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Enable development mode
    #[arg(long)]
    dev: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志系统
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_target(false)
        .init();

    tracing::info!("Starting plant disease detector...");
    tracing::info!("Bind address: {}", args.bind);
    tracing::info!("Model path: {}", args.model);

    let config = Config::new(
        args.bind,
        args.model,
        args.threads,
        args.max_upload_mb,
        args.dev,
    )?;

    serve(config).await?;

    Ok(())
}
