#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate tracing;

mod app;
mod cli;
mod http;
mod rtt;
mod stats;
mod tls;
mod trace;

#[tokio::main]
async fn main() {
    if let Err(e) = app::run::main_with_error().await {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
