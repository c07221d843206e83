use crate::tls::client_tls_config;
use crate::trace::altsvc::parse_alt_svc;
use crate::trace::record::TraceRecord;
use crate::trace::recorder::Recorder;
use anyhow::Context;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1::{self, SendRequest};
use hyper::header::{HeaderValue, ACCEPT, ACCEPT_ENCODING, ALT_SVC, HOST, USER_AGENT};
use hyper::{Request, Uri};
use hyper_util::rt::TokioIo;
use pki_types::ServerName;
use rustls::ClientConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;
use tokio_rustls::TlsConnector;

pub struct ProberConfig {
    /// None waits forever.
    pub timeout: Option<Duration>,
    pub certificate_path: Option<String>,
    pub insecure: bool,
}

/// Issues one instrumented request per call against a single target.
///
/// Keeps at most one idle connection between calls so that repeated
/// probes against the same host exercise connection reuse, which is
/// part of what gets measured.
pub struct HttpProber {
    tls_config: Arc<ClientConfig>,
    timeout: Option<Duration>,
    pooled: Option<SendRequest<Full<Bytes>>>,
}

struct ProbeTarget {
    host: String,
    port: u16,
    https: bool,
    path_and_query: String,
}

impl ProbeTarget {
    fn from_uri(uri: &Uri) -> Result<Self, anyhow::Error> {
        let scheme = uri
            .scheme_str()
            .ok_or_else(|| anyhow!("no scheme in the url: {uri}"))?;
        let https = match scheme {
            "https" => true,
            "http" => false,
            other => bail!("unsupported scheme: {other}"),
        };
        let host = uri
            .host()
            .ok_or_else(|| anyhow!("no host in the url: {uri}"))?
            .to_string();
        let port = uri.port_u16().unwrap_or(if https { 443 } else { 80 });
        let path_and_query = uri
            .path_and_query()
            .map_or_else(|| String::from("/"), |pq| pq.as_str().to_string());
        Ok(Self {
            host,
            port,
            https,
            path_and_query,
        })
    }
}

impl HttpProber {
    pub fn new(config: &ProberConfig) -> Result<Self, anyhow::Error> {
        let tls_config =
            client_tls_config(config.certificate_path.as_deref(), config.insecure)?;
        Ok(Self {
            tls_config: Arc::new(tls_config),
            timeout: config.timeout,
            pooled: None,
        })
    }

    /// Runs one trial: acquire a connection (pooled or fresh), send the
    /// request, drain the body counting bytes, and return the completed
    /// record. Any dispatch or stream failure surfaces as an error with
    /// no partial record.
    pub async fn probe(&mut self, uri: &Uri) -> Result<TraceRecord, anyhow::Error> {
        match self.timeout {
            Some(limit) => match timeout(limit, self.probe_inner(uri)).await {
                Ok(result) => result,
                Err(_) => {
                    self.pooled = None;
                    bail!("request timed out after {} seconds", limit.as_secs())
                }
            },
            None => self.probe_inner(uri).await,
        }
    }

    async fn probe_inner(&mut self, uri: &Uri) -> Result<TraceRecord, anyhow::Error> {
        let target = ProbeTarget::from_uri(uri)?;
        let mut record = TraceRecord::default();
        let mut recorder = Recorder::new(&mut record);
        recorder.connection_start();

        // A pooled sender counts as reused only if it is still open and
        // ready to take another request.
        let mut idle = None;
        if let Some(mut pooled) = self.pooled.take() {
            if !pooled.is_closed() && pooled.ready().await.is_ok() {
                idle = Some(pooled);
            }
        }
        let (mut sender, reused) = match idle {
            Some(sender) => (sender, true),
            None => (self.dial(&target, &mut recorder).await?, false),
        };
        recorder.connection_acquired(reused);

        let request = build_request(&target)?;
        sender.ready().await.context("connection not ready")?;
        let res = sender
            .send_request(request)
            .await
            .context("dispatching request")?;
        recorder.first_byte();

        let http_version = format!("{:?}", res.version());
        let http_status = res.status().to_string();
        let quic_support = res
            .headers()
            .get(ALT_SVC)
            .and_then(|v| v.to_str().ok())
            .map(parse_alt_svc);

        // Drain frame by frame, counting. Large bodies never get
        // buffered whole.
        let mut body = res.into_body();
        let mut body_size: u64 = 0;
        while let Some(frame) = body.frame().await {
            let frame = frame.context("reading response body")?;
            if let Some(data) = frame.data_ref() {
                body_size += data.len() as u64;
            }
        }
        recorder.last_byte();

        record.body_size = body_size;
        record.http_version = http_version;
        record.http_status = http_status;
        record.quic_support = quic_support;

        // Hand the connection back for the next trial.
        if !sender.is_closed() {
            self.pooled = Some(sender);
        }
        Ok(record)
    }

    async fn dial(
        &self,
        target: &ProbeTarget,
        recorder: &mut Recorder<'_>,
    ) -> Result<SendRequest<Full<Bytes>>, anyhow::Error> {
        recorder.dns_start();
        let addr = lookup_host((target.host.as_str(), target.port))
            .await
            .with_context(|| format!("resolving {}", target.host))?
            .next()
            .ok_or_else(|| anyhow!("no addresses found for host {}", target.host))?;
        recorder.dns_done();

        recorder.connect_start();
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("connecting to {addr}"))?;
        recorder.connect_done();

        if target.https {
            let connector = TlsConnector::from(self.tls_config.clone());
            let domain = ServerName::try_from(target.host.clone())
                .map_err(|_| anyhow!("invalid server name: {}", target.host))?;
            recorder.tls_start();
            let tls_stream = connector
                .connect(domain, stream)
                .await
                .with_context(|| format!("tls handshake with {}", target.host))?;
            {
                let (_, session) = tls_stream.get_ref();
                recorder.tls_done(
                    session.protocol_version(),
                    session.negotiated_cipher_suite().map(|s| s.suite()),
                );
            }
            let (sender, conn) = http1::handshake(TokioIo::new(tls_stream)).await?;
            tokio::task::spawn(async move {
                if let Err(err) = conn.await {
                    debug!("connection closed: {err:?}");
                }
            });
            Ok(sender)
        } else {
            let (sender, conn) = http1::handshake(TokioIo::new(stream)).await?;
            tokio::task::spawn(async move {
                if let Err(err) = conn.await {
                    debug!("connection closed: {err:?}");
                }
            });
            Ok(sender)
        }
    }
}

fn build_request(target: &ProbeTarget) -> Result<Request<Full<Bytes>>, anyhow::Error> {
    let mut request = Request::builder()
        .method("GET")
        .uri(target.path_and_query.clone())
        .body(Full::new(Bytes::new()))?;
    let headers = request.headers_mut();
    headers.insert(HOST, HeaderValue::from_str(&target.host)?);
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("rlat/", env!("CARGO_PKG_VERSION"))),
    );
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    // Explicit so the byte count stays a wire-size measurement and
    // nothing upstream decompresses transparently.
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    Ok(request)
}
