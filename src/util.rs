use std::{io, str};
use std::time::Duration;

use libc::{getrusage, rusage, RUSAGE_SELF};

/// User and system CPU time consumed by this process so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTime {
    pub user: Duration,
    pub system: Duration,
}

fn timeval_duration(tv: libc::timeval) -> Duration {
    Duration::from_secs(tv.tv_sec.max(0) as u64) + Duration::from_micros(tv.tv_usec.max(0) as u64)
}

impl CpuTime {
    pub fn now() -> CpuTime {
        // SAFETY: rusage is plain old data and getrusage fills it completely.
        let mut usage: rusage = unsafe { std::mem::zeroed() };
        let rc = unsafe { getrusage(RUSAGE_SELF, &mut usage as *mut rusage) };
        if rc != 0 {
            return CpuTime::default();
        }
        CpuTime {
            user: timeval_duration(usage.ru_utime),
            system: timeval_duration(usage.ru_stime),
        }
    }

    /// CPU time spent between `start` and `self`.
    pub fn since(&self, start: &CpuTime) -> CpuTime {
        CpuTime {
            user: self.user.saturating_sub(start.user),
            system: self.system.saturating_sub(start.system),
        }
    }
}

pub fn utf8(buf: &[u8]) -> Result<&str, io::Error> {
    str::from_utf8(buf)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "Unable to decode input as UTF8"))
}

/// Wall-clock seconds rounded to two decimals, as stored in the report.
pub fn round_secs(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100.0).round() / 100.0
}
