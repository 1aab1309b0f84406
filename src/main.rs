use clap::Parser;
use std::future::Future;
use std::path::PathBuf;
use vigilintel_connector::domain::ports::CheckpointStore;
use vigilintel_connector::utils::logger::{self, LogFormat};
use vigilintel_connector::{
    ConnectorConfig, ConnectorLoop, FileCheckpointStore, HttpReportFetcher, OpenCtiClient,
    SystemClock,
};

#[derive(Parser, Debug)]
#[command(name = "vigilintel-connector")]
#[command(about = "Imports the daily VigilIntel STIX reports into OpenCTI")]
struct Args {
    /// Path to TOML configuration file (optional; environment variables take precedence)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Keep the checkpoint in a local JSON file instead of the OpenCTI connector state
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Show which reports would be fetched without fetching or writing anything
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 配置錯誤時連接器不可啟動
    let config = match ConnectorConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    let log_format = if args.json_logs {
        LogFormat::Json
    } else {
        config.log_format
    };
    logger::init_logger(args.verbose, log_format);

    for warning in config.warnings() {
        tracing::warn!("{}", warning);
    }
    tracing::info!(
        "Connector initialised: language={}, lookback={} days, interval={}h",
        config.language,
        config.lookback_days,
        config.interval_hours
    );

    let fetcher = HttpReportFetcher::new(config.request_timeout())?;
    let platform = OpenCtiClient::new(&config)?;
    let store: Box<dyn CheckpointStore> = match &args.state_file {
        Some(path) => {
            tracing::info!("Using local state file {}", path.display());
            Box::new(FileCheckpointStore::new(path))
        }
        None => Box::new(platform.clone()),
    };

    let connector = ConnectorLoop::new(&config, fetcher, store, platform.clone(), SystemClock);

    if args.dry_run {
        let targets = connector.dry_run().await?;
        if targets.is_empty() {
            println!("✅ Already up-to-date, nothing to fetch");
        } else {
            println!("🔍 {} report(s) would be fetched:", targets.len());
            for target in &targets {
                println!("  {}  {}", target.date, target.url);
            }
        }
        return Ok(());
    }

    if let Err(e) = platform.register().await {
        tracing::warn!("Connector registration failed: {}", e);
    }

    if args.once {
        return match connector.run_cycle().await {
            Ok(report) => {
                println!("✅ {}", report.summary_message());
                Ok(())
            }
            Err(e) => {
                tracing::error!("❌ Cycle failed: {}", e);
                eprintln!("💡 {}", e.recovery_suggestion());
                std::process::exit(2);
            }
        };
    }

    let shutdown = shutdown_signal()?;
    connector.run(shutdown).await;
    Ok(())
}

/// 建立時就安裝 handler，第一輪進行中收到的 signal 也會保留到該輪結束
fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        Ok(async move {
            tokio::select! {
                _ = interrupt.recv() => tracing::info!("Received SIGINT"),
                _ = terminate.recv() => tracing::info!("Received SIGTERM"),
            }
        })
    }

    #[cfg(not(unix))]
    {
        let mut ctrl_c = tokio::signal::windows::ctrl_c()?;
        Ok(async move {
            ctrl_c.recv().await;
            tracing::info!("Received Ctrl-C");
        })
    }
}
