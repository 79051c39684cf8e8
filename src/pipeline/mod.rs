use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::aggregate::MetricAggregator;
use crate::error::BenchmarkError;
use crate::results::ResultTable;
use crate::runner::{Layout, ProcessRunner, TrialRunner, DEFAULT_TRIAL_TIMEOUT};

/// Size set and output path of the single-trial comparison runs.
pub const SINGLE_TRIAL_SIZES: [usize; 9] = [4, 8, 16, 32, 64, 128, 256, 512, 1024];
pub const SINGLE_TRIAL_OUTPUT: &str = "assets/datas/results_comparaison4-1024.csv";

/// Size set and output path of the repeated-trial layout runs.
pub const MULTI_TRIAL_SIZES: [usize; 7] = [128, 192, 256, 384, 512, 768, 1024];
pub const MULTI_TRIAL_OUTPUT: &str = "assets/datas/results_multi128-1024.csv";

/// Everything one pipeline run needs. The fixed size lists and output paths
/// above only exist inside the two preset constructors, so alternative size
/// sets and output targets can be configured and tested independently.
pub struct PipelineConfig {
    pub executable: PathBuf,
    pub version_label: String,
    pub repeats: usize,
    pub layout: Option<Layout>,
    pub sizes: Vec<usize>,
    pub output_path: PathBuf,
    pub trial_timeout: Duration,
}

impl PipelineConfig {
    /// One trial per size over the full 4..1024 comparison size set.
    pub fn single_trial(executable: &str, version_label: &str) -> Self {
        PipelineConfig {
            executable: PathBuf::from(executable),
            version_label: version_label.to_string(),
            repeats: 1,
            layout: None,
            sizes: SINGLE_TRIAL_SIZES.to_vec(),
            output_path: PathBuf::from(SINGLE_TRIAL_OUTPUT),
            trial_timeout: DEFAULT_TRIAL_TIMEOUT,
        }
    }

    /// Repeated trials per size over the 128..1024 size set, with an
    /// explicit memory layout forwarded to the benchmark.
    pub fn multi_trial(executable: &str, version_label: &str, repeats: usize, layout: Layout) -> Self {
        PipelineConfig {
            executable: PathBuf::from(executable),
            version_label: version_label.to_string(),
            repeats,
            layout: Some(layout),
            sizes: MULTI_TRIAL_SIZES.to_vec(),
            output_path: PathBuf::from(MULTI_TRIAL_OUTPUT),
            trial_timeout: DEFAULT_TRIAL_TIMEOUT,
        }
    }
}

/// Runs the whole benchmark-and-merge pipeline against the external
/// benchmark executable.
pub fn run(config: &PipelineConfig) -> Result<(), BenchmarkError> {
    let runner = ProcessRunner::new(config.executable.clone(), config.layout, config.trial_timeout);
    run_with_runner(config, runner)
}

/// Pipeline body, generic over the trial runner seam.
///
/// Sizes are processed in ascending order so partial progress shows up for
/// the cheap cases first. The table on disk is only touched once every size
/// has a complete result; any earlier failure leaves it exactly as it was.
pub fn run_with_runner<R: TrialRunner>(
    config: &PipelineConfig,
    runner: R,
) -> Result<(), BenchmarkError> {
    let aggregator = MetricAggregator::new(runner, config.repeats);
    let mut sizes = config.sizes.clone();
    sizes.sort_unstable();

    let mut measured = BTreeMap::new();
    for (index, &size) in sizes.iter().enumerate() {
        println!("({}/{}) Benchmarking size {}", index + 1, sizes.len(), size);
        let metric = aggregator.measure(size)?;
        println!(
            "  mean time: {} s, throughput: {} GFLOP/s",
            metric.time, metric.gflops
        );
        measured.insert(size, metric);
    }

    let mut table = ResultTable::load(&config.output_path)?;
    table.merge(&config.version_label, &measured);
    table.save(&config.output_path)?;

    table.print();
    println!("\nResults updated in {}", config.output_path.display());
    Ok(())
}

/// Pins the current process, and the benchmark children it spawns, to one
/// core to keep timings stable across trials.
#[cfg(target_os = "linux")]
pub fn set_affinity(core_id: usize) {
    use std::mem;

    unsafe {
        let mut cpu_set: libc::cpu_set_t = mem::zeroed();
        libc::CPU_ZERO(&mut cpu_set);
        libc::CPU_SET(core_id, &mut cpu_set);
        let result = libc::sched_setaffinity(0, mem::size_of::<libc::cpu_set_t>(), &cpu_set);
        if result != 0 {
            eprintln!("Warning: failed to set CPU affinity to core {}", core_id);
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub fn set_affinity(_core_id: usize) {}
