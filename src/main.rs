use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use nvfetch::config::{ConfigOverrides, FetchConfig};
use nvfetch::{interrupt, logging, orchestrator};

#[derive(Parser)]
#[command(name = "nvfetch")]
#[command(about = "Download and unpack NeuroVault statistical maps by image id")]
#[command(version = "1.0")]
struct Cli {
    #[arg(short, long, help = "TOML config file")]
    config: Option<PathBuf>,
    #[arg(long, help = "first image id (inclusive)")]
    start: Option<u64>,
    #[arg(long, help = "last image id (exclusive)")]
    end: Option<u64>,
    #[arg(short, long, help = "concurrent downloads")]
    workers: Option<usize>,
    #[arg(short, long, help = "directory to write images into")]
    output_dir: Option<PathBuf>,
    #[arg(long, help = "metadata page URL containing {id}")]
    page_url: Option<String>,
    #[arg(long, help = "per-request timeout in seconds")]
    timeout_secs: Option<u64>,
    #[arg(long, help = "hide the progress bar")]
    no_progress: bool,
    #[arg(long, help = "exit with status 1 if any image failed")]
    fail_on_error: bool,
    #[arg(long, help = "write the run report as JSON")]
    report_json: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            start: self.start,
            end: self.end,
            workers: self.workers,
            output_dir: self.output_dir.clone(),
            page_url_template: self.page_url.clone(),
            request_timeout_secs: self.timeout_secs,
            fail_on_error: self.fail_on_error,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    logging::init_logging()?;

    let cli = Cli::parse();
    let config = FetchConfig::resolve(cli.config.as_deref(), cli.overrides())?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if interrupt::escalate(interrupt::ctrl_c_stream(), on_interrupt).await {
            std::process::exit(interrupt::FORCED_EXIT_CODE);
        }
    });

    let report = orchestrator::run(&config, cancel, !cli.no_progress).await?;

    if let Some(path) = &cli.report_json {
        serde_json::to_writer_pretty(File::create(path)?, &report)?;
    }

    println!("{}", report);

    let code = report.exit_code(config.fail_on_error);
    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}
