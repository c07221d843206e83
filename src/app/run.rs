use crate::app::report::ProfileReport;
use crate::cli::app_config::Cli;
use crate::http::prober::{HttpProber, ProberConfig};
use crate::http::trials::{run_trials, TrialConfig};
use crate::rtt::handler::tcp_rtt;
use crate::stats;
use clap::Parser;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

pub async fn main_with_error() -> Result<(), anyhow::Error> {
    let cli: Cli = Cli::parse();

    run(cli).await
}

async fn run(cli: Cli) -> Result<(), anyhow::Error> {
    let log_level = match cli.verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy()
        .add_directive("hyper=off".parse()?)
        .add_directive("hyper_util=off".parse()?);
    let subscriber = tracing_subscriber::fmt()
        .without_time()
        .with_level(false)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .with_max_level(log_level)
        .with_env_filter(filter)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    ensure!(cli.iterations >= 1, "iterations must be at least 1");

    if cli.tcp_rtt {
        let durations = tcp_rtt(&cli.url, cli.iterations).await?;
        let rtt_ms: Vec<f64> = durations.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
        let summary = stats::summarize(&rtt_ms)?;
        println!(
            "TCP RTT over {} connections: median {:.2} ms, 95th {:.2} ms, 99th {:.2} ms",
            durations.len(),
            summary.median,
            summary.p95,
            summary.p99
        );
        return Ok(());
    }

    info!("{}", cli.url);
    let uri: hyper::Uri = cli.url.parse()?;
    let mut prober = HttpProber::new(&ProberConfig {
        timeout: (cli.timeout > 0).then(|| Duration::from_secs(cli.timeout)),
        certificate_path: cli.certificate_path_option.clone(),
        insecure: cli.skip_certificate_validate,
    })?;

    let trial_config = TrialConfig {
        iterations: cli.iterations,
        warmup: cli.warmup,
    };
    let (first, series) = run_trials(&mut prober, &uri, &trial_config).await?;
    ensure!(!series.is_empty(), "no samples were collected");
    debug!("collected {} samples per series", series.len());

    let report = ProfileReport {
        url: cli.url,
        body_size: stats::summarize(&series.body_bytes)?,
        ttfb: stats::summarize(&series.ttfb_ms)?,
        ttlb: stats::summarize(&series.ttlb_ms)?,
        record: first,
    };
    println!("{report}");
    Ok(())
}
