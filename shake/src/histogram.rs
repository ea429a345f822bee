/// Upper bound of the last bucket, in microseconds.
const MAX_US: f64 = 60_000_000.0;
/// Ratio between adjacent bucket bounds.
const FACTOR: f64 = 1.5;

/// Logarithmic latency histogram.
///
/// Owned by a single worker, so no synchronization is needed. Histograms of
/// different workers are combined with [`LogHistogram::merge`] once the
/// workers are joined.
#[derive(Debug, Clone)]
pub struct LogHistogram {
    buckets: Vec<u64>,
}

impl Default for LogHistogram {
    fn default() -> Self {
        let mut len = 0;
        let mut curr = 1.0;
        while curr < MAX_US {
            len += 1;
            curr *= FACTOR;
        }

        Self { buckets: vec![0; len] }
    }
}

impl LogHistogram {
    /// Records the given duration in microseconds.
    #[inline]
    pub fn record(&mut self, us: u64) {
        let idx = (us as f64).log(FACTOR) as usize;
        let idx = idx.min(self.buckets.len() - 1);
        self.buckets[idx] += 1;
    }

    /// Adds all samples of the other histogram to this one.
    pub fn merge(&mut self, other: &LogHistogram) {
        if other.buckets.len() > self.buckets.len() {
            self.buckets.resize(other.buckets.len(), 0);
        }

        for (idx, b) in other.buckets.iter().enumerate() {
            self.buckets[idx] += b;
        }
    }

    /// Returns the number of recorded samples.
    #[inline]
    pub fn len(&self) -> u64 {
        self.buckets.iter().sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Estimates the given quantile in microseconds.
    ///
    /// Bucket "i" holds samples in range [f^i; f^(i+1)). Having found the
    /// first bucket where the cumulative count reaches "q * N", the result is
    /// interpolated linearly inside this bucket in logarithmic coordinates
    /// and then converted back with "f^x".
    ///
    /// Returns `None` if nothing was recorded.
    pub fn quantile(&self, q: f64) -> Option<u64> {
        assert!((0.0..=1.0).contains(&q));

        let size = self.len();
        if size == 0 {
            return None;
        }

        let target = q * size as f64;
        let mut sum = 0;
        for (idx, &b) in self.buckets.iter().enumerate() {
            if ((sum + b) as f64) >= target && b > 0 {
                let x = (target - sum as f64) / b as f64 + idx as f64;
                return Some(FACTOR.powf(x) as u64);
            }
            sum += b;
        }

        Some(MAX_US as u64)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_empty_quantile() {
        let h = LogHistogram::default();

        assert!(h.is_empty());
        assert_eq!(None, h.quantile(0.5));
    }

    #[test]
    fn test_zero_quantile() {
        let mut h = LogHistogram::default();
        h.record(1000);

        // 1000us falls into [1.5^17; 1.5^18).
        assert_eq!(Some(FACTOR.powi(17) as u64), h.quantile(0.0));
    }

    #[test]
    fn test_quantile_within_bucket_bounds() {
        let mut h = LogHistogram::default();
        for _ in 0..90 {
            h.record(100);
        }
        for _ in 0..10 {
            h.record(100_000);
        }

        let p50 = h.quantile(0.5).unwrap();
        assert!((FACTOR.powi(11) as u64..=FACTOR.powi(12) as u64).contains(&p50), "{p50}");

        let p99 = h.quantile(0.99).unwrap();
        assert!((FACTOR.powi(28) as u64..=FACTOR.powi(29) as u64).contains(&p99), "{p99}");
    }

    #[test]
    fn test_overflow_goes_to_last_bucket() {
        let mut h = LogHistogram::default();
        h.record(u64::MAX);

        assert_eq!(1, h.len());
        assert_eq!(1, *h.buckets.last().unwrap());
    }

    #[test]
    fn test_merge() {
        let mut a = LogHistogram::default();
        let mut b = LogHistogram::default();
        a.record(10);
        b.record(10);
        b.record(5_000);

        a.merge(&b);

        assert_eq!(3, a.len());
        assert_eq!(2, b.len());
    }
}
