//! blockcheck - censorship measurement CLI
//!
//! Binary entry point for the blockcheck CLI application.

#![warn(clippy::all, warnings)]
#![warn(clippy::pedantic, clippy::nursery)]

use blockcheck::cli::{Commands, OutputFormat};
use blockcheck::config::{ConfigLoader, ExperimentConfig};
use blockcheck::error::Result;
use blockcheck::experiment::{BaselineExperiment, BlockingClassifier, ExperimentReport, TargetProber};
use blockcheck::probe::{ReqwestFetcher, SystemTracer, TracerouteMethod, TrustDnsResolver};
use blockcheck::target::normalize_line;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Set up logging based on verbosity level.
///
/// # Arguments
///
/// * `verbose` - Enable debug-level logging
/// * `quiet` - Enable error-level only logging
fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"))
    } else if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().without_time().with_writer(std::io::stderr))
        .init();
}

/// Load the configuration from `--config` or the default locations.
fn load_config(path: Option<PathBuf>) -> Result<ExperimentConfig> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load_default(),
    }
}

/// Build the production HTTP fetcher and DNS resolver.
fn build_adapters(config: &ExperimentConfig) -> Result<(Arc<ReqwestFetcher>, Arc<TrustDnsResolver>)> {
    let fetcher = ReqwestFetcher::new(
        config.probe_timeout(),
        &config.user_agent,
        config.max_body_bytes,
    )?;
    let resolver = TrustDnsResolver::new(config.probe_timeout())?;
    Ok((Arc::new(fetcher), Arc::new(resolver)))
}

/// Run the baseline experiment over the given input files.
///
/// # Arguments
///
/// * `config` - Experiment configuration (CLI overrides already applied)
/// * `files` - Input files, one batch each
/// * `output` - Optional report file
/// * `unprivileged` - Force the unprivileged traceroute method set
/// * `methods` - Requested traceroute methods (empty for all available)
/// * `format` - Output format
async fn run_baseline(
    config: ExperimentConfig,
    files: Vec<PathBuf>,
    output: Option<PathBuf>,
    unprivileged: bool,
    methods: &[TracerouteMethod],
    format: OutputFormat,
) -> Result<()> {
    let batches = ConfigLoader::load_batches(&files)?;

    let privileged = !unprivileged && is_root::is_root();
    if !privileged {
        tracing::info!("Not running as root, traceroute will be limited to UDP.");
    }

    let (fetcher, resolver) = build_adapters(&config)?;
    let tracer = Arc::new(SystemTracer::new(config.traceroute.clone()));
    let prober = TargetProber::new(
        fetcher,
        resolver,
        tracer,
        TracerouteMethod::select(methods, privileged),
        config.probe_timeouts(),
    );

    let report = BaselineExperiment::new(prober, config.concurrency)
        .run(batches)
        .await;

    if let Some(path) = &output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)?;
        println!("Report written to: {}", path.display());
    }

    match format {
        OutputFormat::Json if output.is_none() => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Json => {}
        OutputFormat::Table => print_report_table(&report),
    }

    Ok(())
}

/// Print a per-target summary of a baseline report.
fn print_report_table(report: &ExperimentReport) {
    for batch in &report.batches {
        println!("\n=== {} ({} targets) ===", batch.batch_name, batch.target_count());
        println!("{:<40} {:<10} {:<12} {:<20}", "Target", "HTTP", "DNS", "Traceroute");
        println!("{}", "-".repeat(84));

        for (target, http) in &batch.http {
            let http = http
                .observation()
                .map(|o| o.status.to_string())
                .unwrap_or_else(|| "failed".to_string());

            let domain = batch.domain_of(target).unwrap_or_default();
            let dns = batch
                .dns
                .get(domain)
                .and_then(|o| o.observation())
                .map(|o| format!("{} addr", o.addresses.len()))
                .unwrap_or_else(|| "failed".to_string());

            let traceroute = batch
                .traceroute_by_method
                .get(domain)
                .map(|methods| {
                    methods
                        .iter()
                        .map(|(method, outcome)| {
                            let status = match outcome.observation() {
                                Some(trace) if trace.reached_destination() => "reached",
                                Some(_) => "incomplete",
                                None => "failed",
                            };
                            format!("{method}:{status}")
                        })
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default();

            println!("{:<40} {:<10} {:<12} {:<20}", target, http, dns, traceroute);
        }

        let (http_failed, dns_failed, trace_failed) = batch.failure_counts();
        println!(
            "\nFailed probes: HTTP {http_failed}, DNS {dns_failed}, traceroute {trace_failed}"
        );
    }
}

/// Run the blocking classifier.
///
/// # Arguments
///
/// * `config` - Experiment configuration (CLI overrides already applied)
/// * `format` - Output format
async fn run_classify(config: ExperimentConfig, format: OutputFormat) -> Result<()> {
    let (fetcher, resolver) = build_adapters(&config)?;
    let classifier =
        BlockingClassifier::new(fetcher, resolver, config.blocking.clone(), config.probe_timeout());

    println!("Checking: https://{}{}", config.blocking.host, config.blocking.path);
    let verdict = classifier.classify().await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        }
        OutputFormat::Table => {
            for evidence in &verdict.evidence {
                let address = evidence
                    .address
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let detail = evidence
                    .failure
                    .clone()
                    .or_else(|| evidence.status.map(|s| format!("HTTP {s}")))
                    .unwrap_or_default();
                println!(
                    "{:<20} {:<40} {:<8} {}",
                    evidence.resolver,
                    address,
                    if evidence.blocked { "blocked" } else { "ok" },
                    detail
                );
            }
            println!("\n{}", verdict.summary());
        }
    }

    Ok(())
}

/// Print the normalized form of one input line.
fn run_normalize(line: &str, format: OutputFormat) -> Result<()> {
    let target = normalize_line(line);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&target)?),
        OutputFormat::Table => {
            println!("Target:   {}", target.target);
            println!("TLS:      {}", target.scheme_is_tls);
            println!("Host:     {}", target.host);
            println!("Domain:   {}", target.host_no_port);
            println!("Path:     {}", target.path);
            println!("Metadata: {}", target.metadata);
            if target.is_degraded() {
                println!(
                    "Parse error: {}",
                    target.parse_error.as_deref().unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}

/// Main entry point for the blockcheck CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = blockcheck::cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("blockcheck starting...");

    match cli.command {
        Commands::Baseline {
            files,
            output,
            concurrency,
            timeout,
            unprivileged,
            methods,
        } => {
            let mut config = load_config(cli.config)?;
            if let Some(concurrency) = concurrency {
                config.concurrency = concurrency;
            }
            if let Some(timeout) = timeout {
                config.probe_timeout_secs = timeout;
            }
            run_baseline(config, files, output, unprivileged, &methods, cli.format).await?;
        }

        Commands::Classify {
            host,
            path,
            marker,
            dns_servers,
        } => {
            let mut config = load_config(cli.config)?;
            if let Some(host) = host {
                config.blocking.host = host;
            }
            if let Some(path) = path {
                config.blocking.path = path;
            }
            if let Some(marker) = marker {
                config.blocking.marker = marker;
            }
            if !dns_servers.is_empty() {
                config.blocking.alternate_resolvers =
                    ConfigLoader::resolvers_from_args(dns_servers)?;
            }
            run_classify(config, cli.format).await?;
        }

        Commands::Normalize { line } => {
            run_normalize(&line, cli.format)?;
        }
    }

    Ok(())
}
