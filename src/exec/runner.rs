/// Execution runner: one program, one input, hard limits.
///
/// The runner knows nothing about verdicts. It spawns the command as the
/// leader of a fresh process group, feeds stdin from a writer thread, drains
/// stdout/stderr through bounded collectors, and kills the whole group on
/// timeout, on output overflow, and after the leader exits. Live groups are
/// tracked so a judge shutdown can kill them.
use crate::config::types::{JudgeError, Result, RunOutcome};
use crate::exec::reap::{has_exited, kill_group, shutting_down, track_group, wait_child, Reaped};
use crate::utils::env_hygiene::EnvPolicy;
use crate::utils::output::{combine_integrity, OutputCollector};
use std::io::{self, Write};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Upper bound on waiting for collectors after the group is dead
const COLLECT_GRACE: Duration = Duration::from_secs(2);

/// A single execution request
#[derive(Debug, Clone)]
pub struct RunRequest<'a> {
    /// argv; the first element is the program
    pub command: &'a [String],
    pub workdir: &'a Path,
    pub stdin: &'a str,
    pub time_limit_ms: u64,
    /// Per-stream byte ceiling for stdout and stderr
    pub output_limit_bytes: usize,
}

/// Execution backend. Implementations hold no per-run shared state and are
/// called concurrently from many judging threads.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, request: &RunRequest<'_>) -> Result<RunOutcome>;
}

/// Plain process-group backend
#[derive(Debug, Clone, Default)]
pub struct ProcessGroupRunner {
    env_policy: EnvPolicy,
}

impl ProcessGroupRunner {
    pub fn new(env_policy: EnvPolicy) -> Self {
        Self { env_policy }
    }
}

impl ProcessRunner for ProcessGroupRunner {
    fn run(&self, request: &RunRequest<'_>) -> Result<RunOutcome> {
        let (program, args) = request
            .command
            .split_first()
            .ok_or_else(|| JudgeError::Process("Empty command provided".to_string()))?;

        let mut child = Command::new(program)
            .args(args)
            .current_dir(request.workdir)
            .env_clear()
            .envs(self.env_policy.for_workdir(request.workdir))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .spawn()
            .map_err(|e| JudgeError::Process(format!("failed to spawn `{}`: {}", program, e)))?;

        let started = Instant::now();
        let pid = child.id() as i32;
        let mut group = track_group(pid);
        if shutting_down() {
            if let Err(e) = kill_group(pid) {
                log::warn!("failed to kill process group {} during shutdown: {}", pid, e);
            }
        }

        let collector = OutputCollector::new(request.output_limit_bytes);
        let stdout = child.stdout.take().map(|s| collector.spawn(s));
        let stderr = child.stderr.take().map(|s| collector.spawn(s));

        if let Some(mut stdin) = child.stdin.take() {
            let input = request.stdin.to_string();
            thread::spawn(move || {
                if let Err(e) = stdin.write_all(input.as_bytes()) {
                    if e.kind() != io::ErrorKind::BrokenPipe {
                        log::debug!("stdin writer for pid {} failed: {}", pid, e);
                    }
                }
                // stdin closes on drop
            });
        }

        let deadline = started + Duration::from_millis(request.time_limit_ms);
        let mut timed_out = false;
        let mut output_exceeded = false;

        // Exit is observed without reaping, so the group id cannot be
        // recycled before the sweep below.
        let exited = loop {
            if has_exited(pid)? {
                break true;
            }
            if collector.overflowed() {
                output_exceeded = true;
            } else if Instant::now() >= deadline {
                timed_out = true;
            }
            if timed_out || output_exceeded {
                break false;
            }
            thread::sleep(POLL_INTERVAL);
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        // Kills the leader on a limit and any descendants left in the group
        if let Err(e) = kill_group(pid) {
            if !exited {
                return Err(e);
            }
            log::warn!("failed to sweep process group {}: {}", pid, e);
        }
        group.release();
        let reaped: Reaped = wait_child(pid, true)?.ok_or_else(|| {
            JudgeError::Process(format!("wait4({}) returned without a status", pid))
        })?;

        let stdout = stdout.map(|p| p.finish(COLLECT_GRACE)).unwrap_or_default();
        let stderr = stderr.map(|p| p.finish(COLLECT_GRACE)).unwrap_or_default();
        // Overflow noticed only while draining still counts
        output_exceeded |= collector.overflowed();

        let exited_normally = reaped.exit_code == Some(0) && !timed_out && !output_exceeded;

        Ok(RunOutcome {
            exited_normally,
            exit_code: reaped.exit_code,
            signal: reaped.signal,
            stdout: stdout.text(),
            stderr: stderr.text(),
            elapsed_ms,
            timed_out,
            output_exceeded,
            memory_kb: reaped.memory_kb,
            output_integrity: combine_integrity(stdout.integrity, stderr.integrity),
        })
    }
}
