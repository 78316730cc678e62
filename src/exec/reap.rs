/// Child reaping and process-group termination
use crate::config::types::{JudgeError, Result};
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Process groups of judged programs that have not been reaped yet
static LIVE_GROUPS: Lazy<Mutex<HashSet<i32>>> = Lazy::new(|| Mutex::new(HashSet::new()));

static SHUTTING_DOWN: AtomicBool = AtomicBool::new(false);

/// Exit information of a reaped child
#[derive(Debug, Clone, Copy)]
pub struct Reaped {
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub memory_kb: Option<u64>,
}

/// `wait4` the child. With `block == false` returns `Ok(None)` while the
/// child is still running.
pub fn wait_child(pid: i32, block: bool) -> Result<Option<Reaped>> {
    let flags = if block { 0 } else { libc::WNOHANG };
    let mut status: libc::c_int = 0;
    // SAFETY: rusage is plain old data; an all-zero value is valid.
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };

    loop {
        // SAFETY: both out-pointers reference live locals.
        let rc = unsafe { libc::wait4(pid, &mut status, flags, &mut usage) };
        if rc == pid {
            return Ok(Some(decode(status, &usage)));
        }
        if rc == 0 {
            return Ok(None);
        }
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            continue;
        }
        return Err(JudgeError::Process(format!("wait4({}) failed: {}", pid, err)));
    }
}

/// Whether the child has exited, without reaping it. The zombie leader keeps
/// its pid and process-group id reserved until [`wait_child`] collects it.
pub fn has_exited(pid: i32) -> Result<bool> {
    loop {
        // SAFETY: siginfo_t is plain old data; si_pid must start zeroed to
        // tell "nothing waitable" apart under WNOHANG.
        let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
        // SAFETY: `info` is a live local.
        let rc = unsafe {
            libc::waitid(
                libc::P_PID,
                pid as libc::id_t,
                &mut info,
                libc::WEXITED | libc::WNOHANG | libc::WNOWAIT,
            )
        };
        if rc == 0 {
            // SAFETY: waitid filled (or left zeroed) a SIGCHLD-shaped siginfo.
            return Ok(unsafe { info.si_pid() } == pid);
        }
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            continue;
        }
        return Err(JudgeError::Process(format!("waitid({}) failed: {}", pid, err)));
    }
}

fn decode(status: libc::c_int, usage: &libc::rusage) -> Reaped {
    let (exit_code, signal) = if libc::WIFEXITED(status) {
        (Some(libc::WEXITSTATUS(status)), None)
    } else if libc::WIFSIGNALED(status) {
        (None, Some(libc::WTERMSIG(status)))
    } else {
        (None, None)
    };

    Reaped {
        exit_code,
        signal,
        memory_kb: peak_rss_kb(usage),
    }
}

#[cfg(target_os = "linux")]
fn peak_rss_kb(usage: &libc::rusage) -> Option<u64> {
    // Linux reports ru_maxrss in KiB
    u64::try_from(usage.ru_maxrss).ok().filter(|&kb| kb > 0)
}

#[cfg(target_os = "macos")]
fn peak_rss_kb(usage: &libc::rusage) -> Option<u64> {
    // macOS reports bytes
    u64::try_from(usage.ru_maxrss)
        .ok()
        .filter(|&bytes| bytes > 0)
        .map(|bytes| bytes / 1024)
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn peak_rss_kb(_usage: &libc::rusage) -> Option<u64> {
    None
}

/// SIGKILL the whole process group led by `pgid`. A group that is already
/// gone is not an error.
pub fn kill_group(pgid: i32) -> Result<()> {
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        // EPERM after the leader is reaped means the id was recycled
        Err(Errno::EPERM) => {
            log::debug!("killpg({}) denied, group already gone", pgid);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn live_groups() -> std::sync::MutexGuard<'static, HashSet<i32>> {
    LIVE_GROUPS.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Registration of a running process group, released once the leader is
/// about to be reaped.
#[derive(Debug)]
pub struct TrackedGroup {
    pgid: i32,
    released: bool,
}

/// Record `pgid` as live so a shutdown can kill it.
pub fn track_group(pgid: i32) -> TrackedGroup {
    live_groups().insert(pgid);
    TrackedGroup {
        pgid,
        released: false,
    }
}

impl TrackedGroup {
    /// Call before reaping the leader; afterwards the id may be recycled.
    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            live_groups().remove(&self.pgid);
        }
    }
}

impl Drop for TrackedGroup {
    fn drop(&mut self) {
        self.release();
    }
}

pub(crate) fn is_tracked(pgid: i32) -> bool {
    live_groups().contains(&pgid)
}

/// The judge is exiting; runners kill anything they start from now on.
pub fn shutting_down() -> bool {
    SHUTTING_DOWN.load(Ordering::SeqCst)
}

/// Enter shutdown and SIGKILL every tracked process group. Returns how many
/// groups were signalled.
pub fn kill_tracked_groups() -> usize {
    SHUTTING_DOWN.store(true, Ordering::SeqCst);
    let groups: Vec<i32> = live_groups().iter().copied().collect();
    for &pgid in &groups {
        if let Err(e) = kill_group(pgid) {
            log::warn!("failed to kill process group {} on shutdown: {}", pgid, e);
        }
    }
    groups.len()
}
