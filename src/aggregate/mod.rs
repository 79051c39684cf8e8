use crate::error::BenchmarkError;
use crate::extract::DurationExtractor;
use crate::runner::TrialRunner;

/// Mean duration and derived throughput for one (size, version) measurement.
///
/// Both fields are already rounded to 4 fractional digits, the precision
/// stored in the result table. Intermediate arithmetic keeps full precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VersionMetric {
    /// Throughput in billions of floating-point operations per second.
    pub gflops: f64,
    /// Mean elapsed time in seconds.
    pub time: f64,
}

/// Rounds to 4 fractional digits.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Runs repeated trials for one problem size and reduces them to a
/// [`VersionMetric`].
///
/// Trials run strictly sequentially: concurrent invocations would contend
/// for the CPU and corrupt the very timings being measured.
pub struct MetricAggregator<R> {
    runner: R,
    extractor: DurationExtractor,
    repeats: usize,
}

impl<R: TrialRunner> MetricAggregator<R> {
    pub fn new(runner: R, repeats: usize) -> Self {
        assert!(repeats >= 1, "repeat count must be at least 1");
        MetricAggregator {
            runner,
            extractor: DurationExtractor::new(),
            repeats,
        }
    }

    /// Measures one problem size.
    ///
    /// Any failed trial aborts the whole size so a missing measurement is
    /// never recorded as a fabricated value. The throughput uses the dense
    /// matrix-multiply operation count: one multiply and one add per output
    /// element per reduction step, i.e. `2 * size^3` operations.
    pub fn measure(&self, size: usize) -> Result<VersionMetric, BenchmarkError> {
        let mut durations = Vec::with_capacity(self.repeats);
        for trial in 0..self.repeats {
            let output = self
                .runner
                .run(size)
                .map_err(|e| annotate(e, size, trial, self.repeats))?;
            let seconds = self
                .extractor
                .extract(&output)
                .map_err(|e| annotate(e, size, trial, self.repeats))?;
            durations.push(seconds);
        }
        let mean = durations.iter().sum::<f64>() / durations.len() as f64;
        let gflops = 2.0 * (size as f64).powi(3) / mean / 1e9;
        Ok(VersionMetric {
            gflops: round4(gflops),
            time: round4(mean),
        })
    }
}

/// Prefixes trial context so the operator can tell which measurement failed.
fn annotate(err: BenchmarkError, size: usize, trial: usize, repeats: usize) -> BenchmarkError {
    let tag = format!("size {}, trial {}/{}", size, trial + 1, repeats);
    match err {
        BenchmarkError::Execution(msg) => BenchmarkError::Execution(format!("{}: {}", tag, msg)),
        BenchmarkError::Extraction(msg) => BenchmarkError::Extraction(format!("{}: {}", tag, msg)),
        other => other,
    }
}
