use crate::http::prober::HttpProber;
use crate::trace::record::TraceRecord;
use anyhow::Context;
use hyper::Uri;
use std::time::Duration;

pub struct TrialConfig {
    pub iterations: usize,
    pub warmup: bool,
}

/// Parallel per-trial metric series, index `i` is trial `i`. Body sizes
/// are kept as floats so all three series go through the same
/// statistics.
#[derive(Debug, Default)]
pub struct MetricSeries {
    pub ttfb_ms: Vec<f64>,
    pub ttlb_ms: Vec<f64>,
    pub body_bytes: Vec<f64>,
}

impl MetricSeries {
    fn with_capacity(n: usize) -> Self {
        Self {
            ttfb_ms: Vec::with_capacity(n),
            ttlb_ms: Vec::with_capacity(n),
            body_bytes: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.ttfb_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ttfb_ms.is_empty()
    }

    // One call per completed trial keeps the three series parallel.
    fn push(&mut self, ttfb_ms: f64, ttlb_ms: f64, body_bytes: f64) {
        self.ttfb_ms.push(ttfb_ms);
        self.ttlb_ms.push(ttlb_ms);
        self.body_bytes.push(body_bytes);
    }
}

/// Runs the configured number of strictly sequential trials and collects
/// their interval metrics.
///
/// Trials never overlap: a concurrent probe would compete for the pooled
/// connection and skew the reuse measurements. Any failing trial aborts
/// the whole run, partial statistics would be misleading. Returns the
/// first timed trial's record for protocol metadata reporting alongside
/// the series.
pub async fn run_trials(
    prober: &mut HttpProber,
    uri: &Uri,
    config: &TrialConfig,
) -> Result<(TraceRecord, MetricSeries), anyhow::Error> {
    ensure!(config.iterations >= 1, "iterations must be at least 1");

    if config.warmup {
        let record = prober.probe(uri).await.context("warm-up request failed")?;
        debug!(
            "warm-up: status=\"{}\" body={} KiB",
            record.http_status,
            record.body_size / 1024
        );
    }

    let mut series = MetricSeries::with_capacity(config.iterations);
    let mut first_record = None;

    for i in 0..config.iterations {
        let record = prober
            .probe(uri)
            .await
            .with_context(|| format!("trial {} of {} failed", i + 1, config.iterations))?;

        let ttfb_ms = record
            .ttfb_ms()
            .ok_or_else(|| anyhow!("trial {} has no first-byte timestamp", i + 1))?;
        let ttlb_ms = record
            .ttlb_ms()
            .ok_or_else(|| anyhow!("trial {} has no last-byte timestamp", i + 1))?;

        info!(
            "[#{}] reused={} status=\"{}\" body={} KiB ttfb={:.2} ms ttlb={:.2} ms connect={} quic={}",
            i + 1,
            record.reused,
            record.http_status,
            record.body_size / 1024,
            ttfb_ms,
            ttlb_ms,
            fmt_opt_ms(record.connect_duration()),
            record.quic_support.as_deref().unwrap_or("-"),
        );
        debug!(
            "[#{}] dns={} tls={}",
            i + 1,
            fmt_opt_ms(record.dns_duration()),
            fmt_opt_ms(record.tls_duration()),
        );

        series.push(ttfb_ms, ttlb_ms, record.body_size as f64);

        if first_record.is_none() {
            first_record = Some(record);
        }
    }

    let first = first_record.ok_or_else(|| anyhow!("no trials were run"))?;
    Ok((first, series))
}

fn fmt_opt_ms(duration: Option<Duration>) -> String {
    duration.map_or_else(
        || String::from("N/A"),
        |d| format!("{:.2} ms", d.as_secs_f64() * 1000.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::prober::ProberConfig;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const BODY: &[u8] = &[b'x'; 10240];

    fn test_prober() -> HttpProber {
        HttpProber::new(&ProberConfig {
            timeout: Some(Duration::from_secs(5)),
            certificate_path: None,
            insecure: false,
        })
        .unwrap()
    }

    fn response_bytes(body: &[u8], alt_svc: Option<&str>) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 200 OK\r\ncontent-length: {}\r\n",
            body.len()
        );
        if let Some(value) = alt_svc {
            head.push_str(&format!("alt-svc: {value}\r\n"));
        }
        head.push_str("\r\n");
        [head.as_bytes(), body].concat()
    }

    async fn read_request(sock: &mut TcpStream) -> bool {
        let mut buf = [0u8; 1024];
        let mut seen: Vec<u8> = Vec::new();
        loop {
            match sock.read(&mut buf).await {
                Ok(0) | Err(_) => return false,
                Ok(n) => {
                    seen.extend_from_slice(&buf[..n]);
                    if seen.windows(4).any(|w| w == b"\r\n\r\n") {
                        return true;
                    }
                }
            }
        }
    }

    /// Keep-alive server answering every request on every connection
    /// with the same canned response.
    async fn spawn_server(alt_svc: Option<&'static str>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let response = response_bytes(BODY, alt_svc);
                    while read_request(&mut sock).await {
                        if sock.write_all(&response).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn sequential_trials_fill_parallel_series() {
        let addr = spawn_server(Some("quic=\"example.com:443\"; v=\"46,43\"")).await;
        let uri: Uri = format!("http://{addr}/").parse().unwrap();
        let mut prober = test_prober();

        let config = TrialConfig {
            iterations: 3,
            warmup: false,
        };
        let (first, series) = run_trials(&mut prober, &uri, &config).await.unwrap();

        assert_eq!(series.len(), 3);
        assert!(!series.is_empty());
        assert_eq!(series.ttlb_ms.len(), 3);
        assert_eq!(series.body_bytes.len(), 3);
        for i in 0..3 {
            assert!(series.ttlb_ms[i] >= series.ttfb_ms[i]);
            assert_eq!(series.body_bytes[i], BODY.len() as f64);
        }

        assert!(!first.reused);
        assert_eq!(first.http_version, "HTTP/1.1");
        assert_eq!(first.http_status, "200 OK");
        assert_eq!(
            first.quic_support.as_deref(),
            Some("Yes, at example.com:443 with versions: 46,43")
        );
        assert_eq!(first.body_size, BODY.len() as u64);
    }

    #[tokio::test]
    async fn measured_series_track_a_known_server_delay() {
        const HEAD_DELAY: Duration = Duration::from_millis(50);
        const TAIL_DELAY: Duration = Duration::from_millis(20);

        // Hold the response head back 50 ms and the tail of the body a
        // further 20 ms, so first byte lands near 50 ms and last byte
        // near 70 ms from request start.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let head = format!(
                        "HTTP/1.1 200 OK\r\ncontent-length: {}\r\n\r\n",
                        BODY.len()
                    );
                    let (front, tail) = BODY.split_at(BODY.len() / 2);
                    while read_request(&mut sock).await {
                        tokio::time::sleep(HEAD_DELAY).await;
                        if sock.write_all(head.as_bytes()).await.is_err()
                            || sock.write_all(front).await.is_err()
                        {
                            break;
                        }
                        tokio::time::sleep(TAIL_DELAY).await;
                        if sock.write_all(tail).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        let uri: Uri = format!("http://{addr}/").parse().unwrap();
        let mut prober = test_prober();
        let config = TrialConfig {
            iterations: 5,
            warmup: false,
        };
        let (_, series) = run_trials(&mut prober, &uri, &config).await.unwrap();

        assert_eq!(series.len(), 5);
        let head_ms = HEAD_DELAY.as_secs_f64() * 1000.0;
        let tail_ms = TAIL_DELAY.as_secs_f64() * 1000.0;
        for i in 0..5 {
            // First byte arrives after the head delay but well before
            // the tail delay has elapsed.
            assert!(series.ttfb_ms[i] >= head_ms, "ttfb {} too small", series.ttfb_ms[i]);
            assert!(
                series.ttfb_ms[i] < head_ms + tail_ms,
                "ttfb {} includes the tail delay",
                series.ttfb_ms[i]
            );
            assert!(
                series.ttlb_ms[i] >= head_ms + tail_ms,
                "ttlb {} too small",
                series.ttlb_ms[i]
            );
            assert!(series.ttlb_ms[i] - series.ttfb_ms[i] >= tail_ms);
            assert_eq!(series.body_bytes[i], BODY.len() as f64);
        }

        let ttfb = crate::stats::summarize(&series.ttfb_ms).unwrap();
        assert!(ttfb.median >= head_ms && ttfb.median < head_ms + tail_ms);
        assert!(ttfb.p99 < head_ms + tail_ms);
        assert!(ttfb.median <= ttfb.p95 && ttfb.p95 <= ttfb.p99);
    }

    #[tokio::test]
    async fn second_probe_reuses_the_pooled_connection() {
        let addr = spawn_server(None).await;
        let uri: Uri = format!("http://{addr}/").parse().unwrap();
        let mut prober = test_prober();

        let first = prober.probe(&uri).await.unwrap();
        assert!(!first.reused);
        assert!(first.dns_duration().is_some());
        assert!(first.connect_duration().is_some());

        let second = prober.probe(&uri).await.unwrap();
        assert!(second.reused);
        assert!(second.dns_duration().is_none());
        assert!(second.connect_duration().is_none());
    }

    #[tokio::test]
    async fn warmup_primes_the_pool_before_the_first_timed_trial() {
        let addr = spawn_server(None).await;
        let uri: Uri = format!("http://{addr}/").parse().unwrap();
        let mut prober = test_prober();

        let config = TrialConfig {
            iterations: 2,
            warmup: true,
        };
        let (first, series) = run_trials(&mut prober, &uri, &config).await.unwrap();

        assert_eq!(series.len(), 2);
        assert!(first.reused);
    }

    #[tokio::test]
    async fn plaintext_trials_carry_no_tls_metadata() {
        let addr = spawn_server(None).await;
        let uri: Uri = format!("http://{addr}/").parse().unwrap();
        let mut prober = test_prober();

        let record = prober.probe(&uri).await.unwrap();
        assert!(record.tls_version.is_none());
        assert!(record.tls_cipher_suite.is_none());
        assert!(record.tls_duration().is_none());
        assert!(record.quic_support.is_none());
    }

    #[tokio::test]
    async fn refused_connection_aborts_the_run() {
        // Serve exactly two requests on one connection, then shut the
        // whole server down so trial 3 finds nobody listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let response = response_bytes(BODY, None);
            for _ in 0..2 {
                if read_request(&mut sock).await {
                    let _ = sock.write_all(&response).await;
                }
            }
        });

        let uri: Uri = format!("http://{addr}/").parse().unwrap();
        let mut prober = test_prober();
        let config = TrialConfig {
            iterations: 5,
            warmup: false,
        };
        let err = run_trials(&mut prober, &uri, &config).await.unwrap_err();
        assert!(format!("{err:#}").contains("trial 3"));
    }

    #[tokio::test]
    async fn dispatch_failure_returns_no_record() {
        // Bind then drop, the port is free again and connecting fails.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let uri: Uri = format!("http://{addr}/").parse().unwrap();
        let mut prober = test_prober();
        assert!(prober.probe(&uri).await.is_err());
    }

    #[tokio::test]
    async fn zero_iterations_is_rejected() {
        let uri: Uri = "http://127.0.0.1:1/".parse().unwrap();
        let mut prober = test_prober();
        let config = TrialConfig {
            iterations: 0,
            warmup: false,
        };
        assert!(run_trials(&mut prober, &uri, &config).await.is_err());
    }
}
