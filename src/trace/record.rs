use std::time::{Duration, Instant};

/// Timestamps and protocol metadata captured over one request.
///
/// A record belongs to exactly one trial. It is mutated only through the
/// [`Recorder`](crate::trace::recorder::Recorder) bound to that trial and
/// must not be read until the trial's blocking probe call has returned;
/// the hooks that fill it may run on the transport's own tasks.
///
/// Instants for lifecycle events that never happened (DNS on a reused
/// connection, TLS on plaintext) stay `None` and never produce a duration.
#[derive(Debug, Default, Clone)]
pub struct TraceRecord {
    pub start: Option<Instant>,
    pub dns_start: Option<Instant>,
    pub dns_done: Option<Instant>,
    pub connect_start: Option<Instant>,
    pub connect_done: Option<Instant>,
    pub tls_start: Option<Instant>,
    pub tls_done: Option<Instant>,
    pub first_byte: Option<Instant>,
    pub last_byte: Option<Instant>,

    /// False when a new connection was established for this trial.
    pub reused: bool,
    /// Size of the response body in bytes.
    pub body_size: u64,

    pub tls_version: Option<String>,
    pub tls_cipher_suite: Option<String>,
    pub http_version: String,
    pub http_status: String,
    pub quic_support: Option<String>,
}

impl TraceRecord {
    pub fn ttfb(&self) -> Option<Duration> {
        Some(self.first_byte?.duration_since(self.start?))
    }

    pub fn ttlb(&self) -> Option<Duration> {
        Some(self.last_byte?.duration_since(self.start?))
    }

    pub fn dns_duration(&self) -> Option<Duration> {
        Some(self.dns_done?.duration_since(self.dns_start?))
    }

    pub fn connect_duration(&self) -> Option<Duration> {
        Some(self.connect_done?.duration_since(self.connect_start?))
    }

    pub fn tls_duration(&self) -> Option<Duration> {
        Some(self.tls_done?.duration_since(self.tls_start?))
    }

    pub fn ttfb_ms(&self) -> Option<f64> {
        self.ttfb().map(|d| d.as_secs_f64() * 1000.0)
    }

    pub fn ttlb_ms(&self) -> Option<f64> {
        self.ttlb().map(|d| d.as_secs_f64() * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_instants_yield_no_duration() {
        let record = TraceRecord::default();
        assert!(record.ttfb().is_none());
        assert!(record.ttlb().is_none());
        assert!(record.dns_duration().is_none());
        assert!(record.connect_duration().is_none());
        assert!(record.tls_duration().is_none());
    }

    #[test]
    fn partial_pair_yields_no_duration() {
        let record = TraceRecord {
            dns_start: Some(Instant::now()),
            ..Default::default()
        };
        assert!(record.dns_duration().is_none());
    }

    #[test]
    fn derives_intervals_from_stamped_instants() {
        let start = Instant::now();
        let record = TraceRecord {
            start: Some(start),
            first_byte: Some(start + Duration::from_millis(50)),
            last_byte: Some(start + Duration::from_millis(70)),
            ..Default::default()
        };
        let ttfb = record.ttfb_ms().unwrap();
        let ttlb = record.ttlb_ms().unwrap();
        assert!((ttfb - 50.0).abs() < 1e-6);
        assert!((ttlb - 70.0).abs() < 1e-6);
        assert!(ttlb >= ttfb);
    }
}
