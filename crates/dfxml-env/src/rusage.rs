//! Process resource usage (`getrusage(RUSAGE_SELF)`), Unix only.

use std::time::Duration;

use dfxml_core::{DfxmlWriter, Elapsed};
use serde::Serialize;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceUsage {
    pub utime: Duration,
    pub stime: Duration,
    pub maxrss: i64,
    pub minflt: i64,
    pub majflt: i64,
    pub nswap: i64,
    pub inblock: i64,
    pub oublock: i64,
}

#[cfg(unix)]
fn timeval_duration(tv: libc::timeval) -> Duration {
    let secs = u64::try_from(tv.tv_sec).unwrap_or(0);
    let micros = u32::try_from(tv.tv_usec).unwrap_or(0);
    Duration::from_secs(secs) + Duration::from_micros(u64::from(micros))
}

#[cfg(unix)]
pub fn collect() -> Option<ResourceUsage> {
    // SAFETY: getrusage only writes into the zeroed struct we hand it.
    let usage = unsafe {
        let mut usage: libc::rusage = std::mem::zeroed();
        if libc::getrusage(libc::RUSAGE_SELF, &mut usage) != 0 {
            tracing::debug!("getrusage failed: {}", std::io::Error::last_os_error());
            return None;
        }
        usage
    };

    Some(ResourceUsage {
        utime: timeval_duration(usage.ru_utime),
        stime: timeval_duration(usage.ru_stime),
        maxrss: i64::from(usage.ru_maxrss),
        minflt: i64::from(usage.ru_minflt),
        majflt: i64::from(usage.ru_majflt),
        nswap: i64::from(usage.ru_nswap),
        inblock: i64::from(usage.ru_inblock),
        oublock: i64::from(usage.ru_oublock),
    })
}

#[cfg(not(unix))]
pub fn collect() -> Option<ResourceUsage> {
    None
}

impl ResourceUsage {
    /// Write a `<rusage>` block; `clocktime` is the wall time since the
    /// document (or process) started.
    pub fn write_dfxml(&self, writer: &DfxmlWriter, clocktime: Elapsed) -> Result<()> {
        writer.push("rusage", "")?;
        writer.write_duration("utime", self.utime)?;
        writer.write_duration("stime", self.stime)?;
        writer.write_value("maxrss", self.maxrss)?;
        writer.write_value("minflt", self.minflt)?;
        writer.write_value("majflt", self.majflt)?;
        writer.write_value("nswap", self.nswap)?;
        writer.write_value("inblock", self.inblock)?;
        writer.write_value("oublock", self.oublock)?;
        writer.write_value("clocktime", clocktime)?;
        writer.pop()?;
        Ok(())
    }
}

/// Collect resource usage and write it, timing `clocktime` from the
/// document's creation. Writes nothing where usage is unavailable.
pub fn add_rusage(writer: &DfxmlWriter) -> Result<()> {
    if let Some(usage) = collect() {
        usage.write_dfxml(writer, writer.elapsed())?;
    }
    Ok(())
}
