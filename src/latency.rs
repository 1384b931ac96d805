//! Summaries of round-trip latencies gathered by the load generator.

use std::fmt;
use std::time::Duration;

/// Percentiles reported, in thousandths, with their labels.
const PERCENTILES: [(u64, &str); 15] = [
    (0, "0th"),
    (100, "10th"),
    (200, "20th"),
    (300, "30th"),
    (400, "40th"),
    (500, "50th"),
    (600, "60th"),
    (700, "70th"),
    (800, "80th"),
    (900, "90th"),
    (950, "95th"),
    (990, "99th"),
    (995, "99.5th"),
    (999, "99.9th"),
    (1000, "100th"),
];

/// Throughput and latency distribution of a benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyReport {
    requests: usize,
    elapsed: Duration,
    mean: Duration,
    percentiles: Vec<(&'static str, Duration)>,
}

impl LatencyReport {
    /// Summarize `samples`, one per request, collected over `elapsed` of wall time.
    ///
    /// Returns `None` if there are no samples.
    pub fn new(mut samples: Vec<Duration>, elapsed: Duration) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        samples.sort_unstable();

        let requests = samples.len();
        let total = samples.iter().map(Duration::as_nanos).sum::<u128>();
        let mean = Duration::from_nanos((total / requests as u128) as u64);
        let percentiles = PERCENTILES
            .iter()
            .map(|&(thousandths, label)| {
                let index = (requests as u64 * thousandths / 1000) as usize;
                (label, samples[index.min(requests - 1)])
            })
            .collect();

        Some(Self {
            requests,
            elapsed,
            mean,
            percentiles,
        })
    }

    /// The number of requests measured.
    #[inline]
    pub const fn requests(&self) -> usize {
        self.requests
    }

    /// Requests completed per second of wall time.
    pub fn throughput(&self) -> f64 {
        self.requests as f64 / self.elapsed.as_secs_f64()
    }

    /// The mean round-trip time.
    #[inline]
    pub const fn mean(&self) -> Duration {
        self.mean
    }

    /// The latency at the given label, e.g. `"99.9th"`.
    pub fn percentile(&self, label: &str) -> Option<Duration> {
        self.percentiles
            .iter()
            .find(|(l, _)| *l == label)
            .map(|&(_, latency)| latency)
    }
}

/// `duration` as fractional milliseconds.
fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

impl fmt::Display for LatencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} requests in {:.3}s ({:.2} req/s)",
            self.requests,
            self.elapsed.as_secs_f64(),
            self.throughput(),
        )?;
        writeln!(f, "{:.<9}{:.2}ms", "mean", millis(self.mean))?;
        for (label, latency) in &self.percentiles {
            writeln!(f, "{label:.<9}{:.2}ms", millis(*latency))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_empty_samples() {
        assert_eq!(LatencyReport::new(Vec::new(), Duration::from_secs(1)), None);
    }

    #[test]
    fn test_percentiles_of_uniform_samples() {
        // Deliberately unsorted.
        let samples = (1..=1000).rev().map(ms).collect();
        let report = LatencyReport::new(samples, Duration::from_secs(2)).unwrap();

        assert_eq!(report.requests(), 1000);
        assert_eq!(report.throughput(), 500.0);
        assert_eq!(report.mean(), Duration::from_micros(500_500));
        assert_eq!(report.percentile("0th"), Some(ms(1)));
        assert_eq!(report.percentile("50th"), Some(ms(501)));
        assert_eq!(report.percentile("99.9th"), Some(ms(1000)));
        assert_eq!(report.percentile("100th"), Some(ms(1000)));
        assert_eq!(report.percentile("42nd"), None);
    }

    #[test]
    fn test_single_sample() {
        let report = LatencyReport::new(vec![ms(3)], Duration::from_millis(3)).unwrap();

        for (_, latency) in &report.percentiles {
            assert_eq!(*latency, ms(3));
        }
    }

    #[test]
    fn test_display() {
        let report = LatencyReport::new(vec![ms(1), ms(3)], Duration::from_secs(1)).unwrap();
        let text = report.to_string();

        assert!(text.starts_with("2 requests in 1.000s (2.00 req/s)\n"));
        assert!(text.contains("mean.....2.00ms\n"));
        assert!(text.contains("0th......1.00ms\n"));
        assert!(text.contains("99.5th...3.00ms\n"));
        assert!(text.ends_with("100th....3.00ms\n"));
    }
}
