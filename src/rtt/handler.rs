use anyhow::Context;
use std::time::{Duration, Instant};
use tokio::net::{lookup_host, TcpStream};

/// Bare TCP connect latency against port 80 of the target host.
///
/// Resolves the host once and makes one untimed priming connection so
/// DNS lookup cost stays out of the numbers, then times N sequential
/// connections to the resolved address. Shares no state with the HTTP
/// tracer. Fails immediately on any dial error.
pub async fn tcp_rtt(url: &str, iterations: usize) -> Result<Vec<Duration>, anyhow::Error> {
    let uri: hyper::Uri = url.parse()?;
    let host = uri
        .host()
        .ok_or_else(|| anyhow!("no host in the url: {url}"))?;
    let addr = lookup_host((host, 80))
        .await
        .with_context(|| format!("resolving {host}"))?
        .next()
        .ok_or_else(|| anyhow!("no addresses found for host {host}"))?;

    TcpStream::connect(addr)
        .await
        .with_context(|| format!("priming connection to {addr}"))?;

    let mut results = Vec::with_capacity(iterations);
    for i in 0..iterations {
        let start = Instant::now();
        TcpStream::connect(addr)
            .await
            .with_context(|| format!("connection {} to {addr}", i + 1))?;
        let elapsed = start.elapsed();
        info!("TCP RTT [#{}] - {} - {} ms", i + 1, addr, elapsed.as_millis());
        results.push(elapsed);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn url_without_host_is_rejected() {
        assert!(tcp_rtt("/just/a/path", 1).await.is_err());
    }

    #[tokio::test]
    async fn unresolvable_host_fails_before_any_probe() {
        let err = tcp_rtt("http://host.invalid/", 3).await.unwrap_err();
        assert!(format!("{err:#}").contains("host.invalid"));
    }
}
