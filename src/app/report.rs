use crate::stats::Summary;
use crate::trace::record::TraceRecord;
use std::fmt;

/// Final run summary. Protocol metadata comes from the first timed
/// trial's record, the distributions from all trials.
pub struct ProfileReport {
    pub url: String,
    pub record: TraceRecord,
    pub body_size: Summary,
    pub ttfb: Summary,
    pub ttlb: Summary,
}

impl fmt::Display for ProfileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Statistics:")?;
        writeln!(f, "  URL: {}", self.url)?;
        writeln!(f, "  Body Size: {:.0} KiB", self.body_size.median / 1024.0)?;
        if let (Some(version), Some(suite)) =
            (&self.record.tls_version, &self.record.tls_cipher_suite)
        {
            writeln!(f, "  TLS: {} with {}", version, suite)?;
        }
        writeln!(
            f,
            "  HTTP: {} {}",
            self.record.http_version, self.record.http_status
        )?;
        if let Some(quic) = &self.record.quic_support {
            writeln!(f, "  QUIC Support: {}", quic)?;
        }
        writeln!(f, "  Time to First Byte:")?;
        writeln!(f, "    Median: {:.2} ms", self.ttfb.median)?;
        writeln!(f, "    95th:   {:.2} ms", self.ttfb.p95)?;
        writeln!(f, "    99th:   {:.2} ms", self.ttfb.p99)?;
        writeln!(f, "  Time to Last Byte:")?;
        writeln!(f, "    Median: {:.2} ms", self.ttlb.median)?;
        writeln!(f, "    95th:   {:.2} ms", self.ttlb.p95)?;
        writeln!(f, "    99th:   {:.2} ms", self.ttlb.p99)?;
        Ok(())
    }
}
