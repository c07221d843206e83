use crate::trace::record::TraceRecord;
use rustls::{CipherSuite, ProtocolVersion};
use std::time::Instant;

/// Lifecycle hooks for a single in-flight request.
///
/// The prober invokes each hook at most once per trial, in connection
/// order: `connection_start` → (`dns_start` → `dns_done`)? →
/// (`connect_start` → `connect_done`)? → (`tls_start` → `tls_done`)? →
/// `connection_acquired` → `first_byte` → `last_byte`. Hooks for events
/// that do not occur are never invoked. The exclusive borrow of the
/// record is the whole synchronization story: only one trial is in
/// flight at a time.
pub struct Recorder<'a> {
    record: &'a mut TraceRecord,
}

impl<'a> Recorder<'a> {
    pub fn new(record: &'a mut TraceRecord) -> Self {
        Self { record }
    }

    pub fn connection_start(&mut self) {
        self.record.start = Some(Instant::now());
    }

    pub fn dns_start(&mut self) {
        self.record.dns_start = Some(Instant::now());
    }

    pub fn dns_done(&mut self) {
        self.record.dns_done = Some(Instant::now());
    }

    pub fn connect_start(&mut self) {
        self.record.connect_start = Some(Instant::now());
    }

    pub fn connect_done(&mut self) {
        self.record.connect_done = Some(Instant::now());
    }

    pub fn tls_start(&mut self) {
        self.record.tls_start = Some(Instant::now());
    }

    /// Stamps the handshake end and resolves the negotiated parameters
    /// to their display names.
    pub fn tls_done(&mut self, version: Option<ProtocolVersion>, suite: Option<CipherSuite>) {
        self.record.tls_done = Some(Instant::now());
        self.record.tls_version = Some(version.map_or("Unknown", tls_version_name).to_string());
        self.record.tls_cipher_suite = Some(suite.map_or("Unknown", cipher_suite_name).to_string());
    }

    pub fn connection_acquired(&mut self, reused: bool) {
        self.record.reused = reused;
    }

    pub fn first_byte(&mut self) {
        self.record.first_byte = Some(Instant::now());
    }

    pub fn last_byte(&mut self) {
        self.record.last_byte = Some(Instant::now());
    }
}

pub fn tls_version_name(version: ProtocolVersion) -> &'static str {
    match version {
        ProtocolVersion::SSLv3 => "SSL/3.0",
        ProtocolVersion::TLSv1_0 => "TLS/1.0",
        ProtocolVersion::TLSv1_1 => "TLS/1.1",
        ProtocolVersion::TLSv1_2 => "TLS/1.2",
        ProtocolVersion::TLSv1_3 => "TLS/1.3",
        _ => "Unknown",
    }
}

/// Display names for the suites the ring provider can negotiate.
pub fn cipher_suite_name(suite: CipherSuite) -> &'static str {
    match suite {
        CipherSuite::TLS13_AES_128_GCM_SHA256 => "TLS_AES_128_GCM_SHA256",
        CipherSuite::TLS13_AES_256_GCM_SHA384 => "TLS_AES_256_GCM_SHA384",
        CipherSuite::TLS13_CHACHA20_POLY1305_SHA256 => "TLS_CHACHA20_POLY1305_SHA256",
        CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256 => {
            "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256"
        }
        CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384 => {
            "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384"
        }
        CipherSuite::TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256 => {
            "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256"
        }
        CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256 => {
            "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256"
        }
        CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384 => {
            "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384"
        }
        CipherSuite::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256 => {
            "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256"
        }
        _ => "Unknown",
    }
}
