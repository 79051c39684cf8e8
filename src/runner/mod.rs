use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::BenchmarkError;

/// Default per-trial timeout. Large sizes on a slow machine take a while,
/// but a benchmark stuck past this is considered hung.
pub const DEFAULT_TRIAL_TIMEOUT: Duration = Duration::from_secs(300);

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Memory-access-order variant forwarded verbatim to the external benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Left,
    Right,
}

impl Layout {
    pub fn parse(token: &str) -> Option<Layout> {
        match token {
            "left" => Some(Layout::Left),
            "right" => Some(Layout::Right),
            _ => None,
        }
    }

    pub fn as_arg(&self) -> &'static str {
        match self {
            Layout::Left => "left",
            Layout::Right => "right",
        }
    }
}

/// One benchmark execution for a given problem size.
///
/// The aggregator only depends on this trait, so repeated-measurement logic
/// can be exercised with scripted outputs instead of a real child process.
pub trait TrialRunner {
    /// Runs a single trial and returns the captured standard output.
    fn run(&self, size: usize) -> Result<String, BenchmarkError>;
}

impl<R: TrialRunner + ?Sized> TrialRunner for &R {
    fn run(&self, size: usize) -> Result<String, BenchmarkError> {
        (**self).run(size)
    }
}

/// Runs the external matrix-multiplication benchmark as a child process,
/// invoked as `<executable> <size> <size> <size> [layout]`.
pub struct ProcessRunner {
    executable: PathBuf,
    layout: Option<Layout>,
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(executable: PathBuf, layout: Option<Layout>, timeout: Duration) -> Self {
        ProcessRunner { executable, layout, timeout }
    }
}

impl TrialRunner for ProcessRunner {
    fn run(&self, size: usize) -> Result<String, BenchmarkError> {
        let mut cmd = Command::new(&self.executable);
        cmd.arg(size.to_string())
            .arg(size.to_string())
            .arg(size.to_string());
        if let Some(layout) = self.layout {
            cmd.arg(layout.as_arg());
        }
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            BenchmarkError::Execution(format!(
                "failed to launch '{}': {}",
                self.executable.display(),
                e
            ))
        })?;

        // Drain both pipes on threads so a chatty benchmark cannot fill a
        // pipe buffer and deadlock against the wait loop below.
        let mut stdout_pipe = child.stdout.take().unwrap();
        let stdout_handle = thread::spawn(move || {
            let mut buf = String::new();
            stdout_pipe.read_to_string(&mut buf).map(|_| buf)
        });
        let mut stderr_pipe = child.stderr.take().unwrap();
        let stderr_handle = thread::spawn(move || {
            let mut buf = String::new();
            stderr_pipe.read_to_string(&mut buf).map(|_| buf)
        });

        // Poll the child instead of blocking so a hung benchmark can be
        // killed once the timeout expires.
        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    return Err(BenchmarkError::Execution(format!(
                        "failed to wait on '{}': {}",
                        self.executable.display(),
                        e
                    )))
                }
            }
            if start.elapsed() > self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(BenchmarkError::Execution(format!(
                    "'{}' exceeded timeout of {:?}",
                    self.executable.display(),
                    self.timeout
                )));
            }
            thread::sleep(WAIT_POLL_INTERVAL);
        };

        let stdout = stdout_handle.join().unwrap().map_err(|e| {
            BenchmarkError::Execution(format!("failed to read benchmark output: {}", e))
        })?;
        let stderr = stderr_handle.join().unwrap().unwrap_or_default();

        if !status.success() {
            let detail = match stderr.lines().last() {
                Some(last) => format!(", last line of stderr: {}", last),
                None => String::new(),
            };
            return Err(BenchmarkError::Execution(format!(
                "'{}' exited with {}{}",
                self.executable.display(),
                status,
                detail
            )));
        }
        Ok(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_tokens() {
        assert_eq!(Layout::parse("left"), Some(Layout::Left));
        assert_eq!(Layout::parse("right"), Some(Layout::Right));
        assert_eq!(Layout::parse("diagonal"), None);
        assert_eq!(Layout::Left.as_arg(), "left");
        assert_eq!(Layout::Right.as_arg(), "right");
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;

        fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
            let path = dir.join(name);
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn captures_stdout_on_success() {
            let dir = tempfile::tempdir().unwrap();
            let exe = script(dir.path(), "ok.sh", "echo \"Time: 0.001 s\"");
            let runner = ProcessRunner::new(exe, None, Duration::from_secs(5));
            let output = runner.run(16).unwrap();
            assert!(output.contains("Time: 0.001 s"));
        }

        #[test]
        fn forwards_size_and_layout_arguments() {
            let dir = tempfile::tempdir().unwrap();
            let exe = script(dir.path(), "args.sh", "echo \"$1 $2 $3 $4\"");
            let runner = ProcessRunner::new(exe, Some(Layout::Right), Duration::from_secs(5));
            let output = runner.run(64).unwrap();
            assert_eq!(output.trim(), "64 64 64 right");
        }

        #[test]
        fn omits_layout_argument_when_unset() {
            let dir = tempfile::tempdir().unwrap();
            let exe = script(dir.path(), "count.sh", "echo \"$#\"");
            let runner = ProcessRunner::new(exe, None, Duration::from_secs(5));
            let output = runner.run(32).unwrap();
            assert_eq!(output.trim(), "3");
        }

        #[test]
        fn non_zero_exit_fails_with_stderr_tail() {
            let dir = tempfile::tempdir().unwrap();
            let exe = script(dir.path(), "boom.sh", "echo \"allocation failed\" >&2\nexit 3");
            let runner = ProcessRunner::new(exe, None, Duration::from_secs(5));
            match runner.run(16) {
                Err(BenchmarkError::Execution(msg)) => {
                    assert!(msg.contains("allocation failed"), "got: {}", msg);
                }
                other => panic!("expected execution error, got {:?}", other.map(|_| ())),
            }
        }

        #[test]
        fn missing_executable_fails() {
            let runner = ProcessRunner::new(
                PathBuf::from("/no/such/benchmark"),
                None,
                Duration::from_secs(5),
            );
            assert!(matches!(runner.run(8), Err(BenchmarkError::Execution(_))));
        }

        #[test]
        fn hung_benchmark_times_out() {
            let dir = tempfile::tempdir().unwrap();
            let exe = script(dir.path(), "hang.sh", "sleep 5");
            let runner = ProcessRunner::new(exe, None, Duration::from_millis(200));
            match runner.run(16) {
                Err(BenchmarkError::Execution(msg)) => {
                    assert!(msg.contains("timeout"), "got: {}", msg);
                }
                other => panic!("expected timeout error, got {:?}", other.map(|_| ())),
            }
        }
    }
}
