use clap::{ArgAction, Parser};

#[derive(Parser)]
#[command(author, version, about, long_about)]
pub struct Cli {
    /// The target url,like https://www.google.com
    pub url: String,
    /// Number of timed requests to send.
    #[arg(
        short = 'n',
        long = "iterations",
        value_name = "count",
        default_value_t = 100
    )]
    pub iterations: usize,
    /// Send one untimed request first to prime the connection pool.
    #[arg(short = 'w', long = "warmup")]
    pub warmup: bool,
    /// Per-request timeout in seconds, 0 waits forever.
    #[arg(
        short = 't',
        long = "timeout",
        value_name = "seconds",
        default_value_t = 0
    )]
    pub timeout: u64,
    /// The pem path.
    #[arg(short = 'c', long = "cacert", value_name = "file")]
    pub certificate_path_option: Option<String>,
    /// Allow insecure server connections
    #[arg(short = 'k', long = "insecure")]
    pub skip_certificate_validate: bool,
    /// Measure bare TCP round-trip times instead of HTTP timings.
    #[arg(long = "tcp-rtt")]
    pub tcp_rtt: bool,
    ///  Make the operation more talkative
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbosity: u8,
}
