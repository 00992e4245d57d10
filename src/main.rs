//! driftnet CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use driftnet::{
    config::{AuthType, CrawlConfig},
    error::{Error, Result},
    progress::{crawl_spinner, LogWriterFactory},
    Crawler, Visit,
};
use indicatif::ProgressBar;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "driftnet")]
#[command(version, about = "Bounded-concurrency web crawler", long_about = None)]
struct Cli {
    /// Path to a TOML crawl config
    #[arg(short, long, global = true, env = "DRIFTNET_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output one JSON object per visit and log as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl from a URL and report every page visited
    Crawl(CrawlArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args)]
struct CrawlArgs {
    /// Root URL (defaults to the config's entrypoint)
    url: Option<String>,

    /// Number of concurrent workers
    #[arg(short, long, env = "DRIFTNET_WORKERS")]
    workers: Option<usize>,

    /// Number of links that may wait to be visited
    #[arg(long)]
    buffer: Option<usize>,

    /// Additional domain to traverse (repeatable)
    #[arg(long = "allow-domain")]
    allow_domains: Vec<String>,

    /// Path substring whose pages are not expanded (repeatable)
    #[arg(long = "forbid-path")]
    forbid_paths: Vec<String>,

    /// GET parameter ignored for deduplication (repeatable)
    #[arg(long = "ignore-param")]
    ignore_params: Vec<String>,

    /// Ignore any GET parameter containing an ignored name
    #[arg(long)]
    fuzzy_params: bool,

    /// Maximum page size in bytes (0 = 512 KiB, -1 = unlimited)
    #[arg(long, allow_hyphen_values = true)]
    max_content_length: Option<i64>,

    /// Milliseconds between idle checks
    #[arg(long)]
    idle_interval: Option<u64>,

    /// Basic auth user
    #[arg(long, env = "DRIFTNET_USER")]
    user: Option<String>,

    /// Basic auth password
    #[arg(long, env = "DRIFTNET_PASS", hide_env_values = true)]
    pass: Option<String>,

    /// Hide the progress spinner
    #[arg(long)]
    no_progress: bool,
}

#[derive(Serialize)]
struct VisitLine<'a> {
    linked_from: &'a str,
    url: &'a str,
    status: u16,
    cached: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let json_logs = cli
        .json
        .then(|| fmt::layer().json().with_writer(LogWriterFactory::default()));
    let text_logs = (!cli.json).then(|| fmt::layer().with_writer(LogWriterFactory::default()));

    tracing_subscriber::registry()
        .with(json_logs)
        .with(text_logs)
        .with(filter)
        .init();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "driftnet", &mut std::io::stdout());
            Ok(())
        }
        Commands::Crawl(args) => handle_crawl(cli.config, cli.json, args).await,
    }
}

async fn handle_crawl(config_path: Option<PathBuf>, json: bool, args: CrawlArgs) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => CrawlConfig::load(path)?,
        None => CrawlConfig::default(),
    };
    apply_overrides(&mut config, &args);

    let root = args
        .url
        .clone()
        .or_else(|| config.entrypoint.clone())
        .ok_or_else(|| Error::Config("no URL given and no entrypoint configured".to_string()))?;

    let mut crawler = Crawler::with_config(&root, config)?;

    let spinner = if args.no_progress {
        ProgressBar::hidden()
    } else {
        crawl_spinner()
    };

    let reporter = spinner.clone();
    crawler.handle_default(move |visit| {
        reporter.inc(1);
        reporter.suspend(|| print_visit(visit, json));
    });

    let stop = crawler.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.stop();
        }
    });

    info!("Crawling {}", crawler.root_url());
    let summary = crawler.start().await?;
    spinner.finish_and_clear();

    info!(
        "Visited {} URLs in {:.1}s",
        summary.visited,
        summary.duration.as_secs_f64()
    );
    Ok(())
}

fn apply_overrides(config: &mut CrawlConfig, args: &CrawlArgs) {
    if let Some(workers) = args.workers {
        config.worker_count = workers;
    }
    if let Some(buffer) = args.buffer {
        config.url_buffer_size = buffer;
    }
    if let Some(max) = args.max_content_length {
        config.max_content_length = max;
    }
    if let Some(interval) = args.idle_interval {
        config.idle_work_check_interval = interval;
    }
    if args.fuzzy_params {
        config.fuzzy_get_parameter_checks = true;
    }
    config.allowed_domains.extend(args.allow_domains.iter().cloned());
    config.forbidden_paths.extend(args.forbid_paths.iter().cloned());
    config
        .ignore_get_parameters
        .extend(args.ignore_params.iter().cloned());

    if let Some(user) = &args.user {
        config.auth_type = AuthType::Basic;
        config.user = user.clone();
    }
    if let Some(pass) = &args.pass {
        config.pass = pass.clone();
    }
}

fn print_visit(visit: &Visit<'_>, json: bool) {
    if json {
        let line = VisitLine {
            linked_from: visit.linked_from,
            url: visit.url,
            status: visit.status,
            cached: visit.cached,
        };
        match serde_json::to_string(&line) {
            Ok(line) => println!("{}", line),
            Err(e) => error!("Failed to serialize visit: {}", e),
        }
    } else if visit.cached {
        println!("{} {} <- {} (cached)", visit.status, visit.url, visit.linked_from);
    } else {
        println!("{} {} <- {}", visit.status, visit.url, visit.linked_from);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_json_flag_before_subcommand() {
        let cli = Cli::try_parse_from(["driftnet", "--json", "crawl", "https://a.com"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Crawl(args) => assert_eq!(args.url.as_deref(), Some("https://a.com")),
            Commands::Completions { .. } => panic!("expected crawl"),
        }
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let cli = Cli::try_parse_from([
            "driftnet",
            "crawl",
            "https://a.com",
            "--workers",
            "3",
            "--max-content-length",
            "-1",
            "--forbid-path",
            "/private",
        ])
        .unwrap();
        let Commands::Crawl(args) = cli.command else {
            panic!("expected crawl");
        };

        let mut config = CrawlConfig::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.worker_count, 3);
        assert_eq!(config.max_content_length, -1);
        assert!(config.forbidden_paths.contains(&"/private".to_string()));
    }
}
