//! Best-effort process CPU accounting.

use std::time::Duration;

/// User and system CPU time consumed by the process so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: Duration,
    pub system: Duration,
}

impl CpuTimes {
    pub fn total(&self) -> Duration {
        self.user + self.system
    }

    /// CPU time spent between `earlier` and `self`.
    pub fn since(&self, earlier: &CpuTimes) -> CpuTimes {
        CpuTimes {
            user: self.user.saturating_sub(earlier.user),
            system: self.system.saturating_sub(earlier.system),
        }
    }
}

#[cfg(unix)]
fn rusage_times(who: libc::c_int) -> Option<CpuTimes> {
    use libc::{getrusage, rusage, timeval};

    fn to_duration(tv: timeval) -> Duration {
        Duration::from_secs(tv.tv_sec as u64) + Duration::from_micros(tv.tv_usec as u64)
    }

    // SAFETY: rusage is plain old data; all-zero is a valid value and
    // getrusage overwrites it on success.
    let mut usage: rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { getrusage(who, &mut usage) };
    if rc != 0 {
        return None;
    }
    Some(CpuTimes {
        user: to_duration(usage.ru_utime),
        system: to_duration(usage.ru_stime),
    })
}

/// CPU user/system time snapshot for the whole process on Unix platforms.
#[cfg(unix)]
pub fn cpu_times() -> Option<CpuTimes> {
    rusage_times(libc::RUSAGE_SELF)
}

/// Stub on non-Unix platforms.
#[cfg(not(unix))]
pub fn cpu_times() -> Option<CpuTimes> {
    None
}

/// CPU time consumed by the calling thread only (Linux).
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn thread_cpu_times() -> Option<CpuTimes> {
    rusage_times(libc::RUSAGE_THREAD)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub fn thread_cpu_times() -> Option<CpuTimes> {
    None
}
