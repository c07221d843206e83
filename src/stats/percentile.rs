/// Median and tail percentiles for one metric series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub median: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Percentile by linear interpolation between closest ranks: for
/// percentile `p` over `n` sorted values the rank is `p/100 * (n-1)`,
/// interpolating between the two bounding elements.
///
/// An empty series is an error. Reporting a default of zero here would
/// read as "0 ms" downstream.
pub fn percentile(values: &[f64], pct: f64) -> Result<f64, anyhow::Error> {
    ensure!(
        !values.is_empty(),
        "cannot compute percentile of an empty series"
    );
    ensure!(
        (0.0..=100.0).contains(&pct),
        "percentile {} out of range",
        pct
    );

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Ok(sorted[lo]);
    }
    let weight = rank - lo as f64;
    Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * weight)
}

pub fn median(values: &[f64]) -> Result<f64, anyhow::Error> {
    percentile(values, 50.0)
}

pub fn summarize(values: &[f64]) -> Result<Summary, anyhow::Error> {
    Ok(Summary {
        median: median(values)?,
        p95: percentile(values, 95.0)?,
        p99: percentile(values, 99.0)?,
    })
}
