// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/kapsel

//! External media tool invocation.
//!
//! Container demuxing and the final audio remux are delegated to an external
//! tool (ffmpeg). The tool sits behind the narrow [`MediaRunner`] trait so
//! tests can substitute a fake without a real binary on the machine.
//!
//! The real runner blocks on the child process but bounds the wait: when the
//! timeout expires the child is killed and the result reports a timeout,
//! which callers treat exactly like a non-zero exit. The child's error
//! stream is drained on a separate thread — ffmpeg is chatty on stderr and
//! would otherwise deadlock against a full pipe.

use std::ffi::OsString;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::debug;

/// Poll interval while waiting on the child process.
const WAIT_POLL: Duration = Duration::from_millis(50);

/// Outcome of one external tool invocation.
#[derive(Debug, Clone)]
pub struct ExitResult {
    /// Exit code, if the process exited on its own.
    pub status: Option<i32>,
    /// True when the process hit the timeout and was killed.
    pub timed_out: bool,
    /// Captured error-stream output.
    pub stderr: String,
}

impl ExitResult {
    pub fn success(&self) -> bool {
        !self.timed_out && self.status == Some(0)
    }

    /// One-line description for error messages.
    pub fn describe(&self) -> String {
        if self.timed_out {
            "timed out".to_string()
        } else {
            match self.status {
                Some(code) => format!("exit status {code}"),
                None => "killed by signal".to_string(),
            }
        }
    }
}

/// Narrow seam around the external media tool: run to completion, bounded.
pub trait MediaRunner: Send + Sync {
    fn run(&self, args: &[OsString], timeout: Duration) -> std::io::Result<ExitResult>;
}

/// Runs a real ffmpeg binary as a blocking child process.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    binary: PathBuf,
}

impl FfmpegRunner {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }
}

impl MediaRunner for FfmpegRunner {
    fn run(&self, args: &[OsString], timeout: Duration) -> std::io::Result<ExitResult> {
        debug!("running {} with {} args", self.binary.display(), args.len());
        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stderr_pipe = child.stderr.take().expect("stderr was piped");
        let drain = std::thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr_pipe.read_to_string(&mut buf);
            buf
        });

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait()? {
                Some(status) => break Some(status),
                None if Instant::now() >= deadline => {
                    // The child may exit between try_wait and kill; either way
                    // it gets reaped below.
                    let _ = child.kill();
                    let _ = child.wait();
                    break None;
                }
                None => std::thread::sleep(WAIT_POLL),
            }
        };

        let stderr = drain.join().unwrap_or_default();
        Ok(match status {
            Some(status) => ExitResult {
                status: status.code(),
                timed_out: false,
                stderr,
            },
            None => ExitResult {
                status: None,
                timed_out: true,
                stderr,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os_args(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn successful_exit_reported() {
        let runner = FfmpegRunner::new("/bin/sh");
        let result = runner
            .run(&os_args(&["-c", "exit 0"]), Duration::from_secs(5))
            .unwrap();
        assert!(result.success());
        assert_eq!(result.status, Some(0));
    }

    #[test]
    fn nonzero_exit_with_stderr_captured() {
        let runner = FfmpegRunner::new("/bin/sh");
        let result = runner
            .run(&os_args(&["-c", "echo boom >&2; exit 3"]), Duration::from_secs(5))
            .unwrap();
        assert!(!result.success());
        assert_eq!(result.status, Some(3));
        assert!(result.stderr.contains("boom"));
        assert_eq!(result.describe(), "exit status 3");
    }

    #[test]
    fn timeout_kills_child() {
        let runner = FfmpegRunner::new("/bin/sh");
        let started = Instant::now();
        let result = runner
            .run(&os_args(&["-c", "sleep 30"]), Duration::from_millis(200))
            .unwrap();
        assert!(result.timed_out);
        assert!(!result.success());
        assert!(started.elapsed() < Duration::from_secs(10), "child not killed promptly");
        assert_eq!(result.describe(), "timed out");
    }

    #[test]
    fn missing_binary_is_io_error() {
        let runner = FfmpegRunner::new("/no/such/binary");
        assert!(runner.run(&[], Duration::from_secs(1)).is_err());
    }
}
