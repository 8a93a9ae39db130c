use std::fmt;
use std::time::Duration;

const BINS: usize = 65;
const BARS: &[char; 9] = &['_', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const BARS_MAX: i32 = 8;

fn format_nanos(t: f64) -> String {
    if t < 500.0 {
        format!("{:0.3}ns", t)
    } else if t < 500_000.0 {
        format!("{:0.3}us", t / 1_000.0)
    } else if t < 500_000_000.0 {
        format!("{:0.3}ms", t / 1_000_000.0)
    } else {
        format!("{:0.3}s", t / 1_000_000_000.0)
    }
}

fn log2_bin(value: u64) -> usize {
    (64 - value.leading_zeros()) as usize
}

/// Duration histogram with one bin per power of two nanoseconds.
///
/// Used to summarise how long the counting tasks of a run took.
#[derive(Clone)]
pub struct LogHistogram {
    min: u64,
    max: u64,
    sum: u64,
    hist: [u64; BINS],
}

impl LogHistogram {
    pub fn new() -> Self {
        LogHistogram {
            min: u64::MAX,
            max: 0,
            sum: 0,
            hist: [0; BINS],
        }
    }

    pub fn add_sample_ns(&mut self, value: u64) {
        self.sum = self.sum.saturating_add(value);
        self.max = value.max(self.max);
        self.min = value.min(self.min);
        self.hist[log2_bin(value)] += 1;
    }

    pub fn add_duration(&mut self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.add_sample_ns(nanos);
    }

    pub fn count(&self) -> u64 {
        self.hist.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn mean_ns(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            n => self.sum as f64 / n as f64,
        }
    }

    /// Approximate `p`-quantile in nanoseconds, interpolated inside the
    /// log2 bin. Exact only to within a factor of two.
    pub fn percentile(&self, p: f64) -> f64 {
        assert!((0.0..=1.0).contains(&p), "percentile out of range: {}", p);
        let n = self.count();
        if n == 0 {
            return 0.0;
        }

        let p_count = n as f64 * p;
        let mut samples: u64 = 0;
        for (i, &c_bin) in self.hist.iter().enumerate() {
            let samples_incl = samples + c_bin;
            if samples_incl as f64 > p_count {
                if i == 0 {
                    return 0.0;
                }
                let d_bin = (p_count - samples as f64) / c_bin as f64;
                let estimate = ((i - 1) as f64 + d_bin).exp2();
                return estimate.clamp(self.min as f64, self.max as f64);
            }
            samples = samples_incl;
        }
        self.max as f64
    }

    fn sparkline(&self) -> String {
        let f_max = self.hist.iter().copied().max().unwrap_or(0);
        let log_f_max = log2_bin(f_max) as i32;
        let mut spark_line = String::with_capacity(BINS);
        for (i, &f) in self.hist.iter().enumerate().skip(1) {
            let bin_time = 1u128 << (i - 1);
            if (self.min as u128) > bin_time * 2 || (self.max as u128) * 2 < bin_time {
                continue;
            }
            let log_f = log2_bin(f) as i32;
            let b = if log_f_max > BARS_MAX {
                log_f - (log_f_max - BARS_MAX)
            } else {
                log_f
            };
            if b < 0 {
                spark_line.push(if f > 0 { '.' } else { ' ' });
            } else {
                spark_line.push(BARS[b as usize]);
            }
        }
        spark_line
    }
}

impl Default for LogHistogram {
    fn default() -> Self {
        LogHistogram::new()
    }
}

impl fmt::Display for LogHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "ops: 0");
        }
        write!(
            f,
            "ops: {} acc_time: {} mean_time: {} 5%: {} med: {} 95%: {} min: {} |{}| max: {}",
            self.count(),
            format_nanos(self.sum as f64),
            format_nanos(self.mean_ns()),
            format_nanos(self.percentile(0.05)),
            format_nanos(self.percentile(0.5)),
            format_nanos(self.percentile(0.95)),
            format_nanos(self.min as f64),
            self.sparkline(),
            format_nanos(self.max as f64),
        )
    }
}

impl fmt::Debug for LogHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogHistogram")
            .field("min", &self.min)
            .field("max", &self.max)
            .field("sum", &self.sum)
            .field("hist", &format_args!("{}", self.sparkline()))
            .finish()
    }
}
