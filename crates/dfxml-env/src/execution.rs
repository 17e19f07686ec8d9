//! Facts about the machine and process doing the work.

use dfxml_core::DfxmlWriter;
use serde::Serialize;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::cpuid::{self, CpuId};
use crate::error::Result;
use crate::WriteDfxml;

/// Operating system identification, as reported by `uname`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OsInfo {
    pub sysname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub arch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionEnvironment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpuid: Option<CpuId>,
    pub os: OsInfo,
    pub command_line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// UTC, `YYYY-MM-DDTHH:MM:SSZ`.
    pub start_time: String,
}

impl ExecutionEnvironment {
    pub fn collect(command_line: impl Into<String>) -> Result<Self> {
        Ok(Self {
            cpuid: cpuid::collect(),
            os: os_info(),
            command_line: command_line.into(),
            uid: current_uid(),
            username: current_username(),
            start_time: format_start_time(OffsetDateTime::now_utc())?,
        })
    }
}

pub fn format_start_time(now: OffsetDateTime) -> Result<String> {
    let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");
    Ok(now.to_offset(time::UtcOffset::UTC).format(&format)?)
}

#[cfg(unix)]
fn field(raw: &[libc::c_char]) -> String {
    let bytes: Vec<u8> = raw
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(unix)]
fn os_info() -> OsInfo {
    // SAFETY: uname fills the zeroed struct; fields are NUL-terminated.
    unsafe {
        let mut name: libc::utsname = std::mem::zeroed();
        if libc::uname(&mut name) == 0 {
            return OsInfo {
                sysname: field(&name.sysname),
                release: Some(field(&name.release)),
                version: Some(field(&name.version)),
                host: Some(field(&name.nodename)),
                arch: field(&name.machine),
            };
        }
    }
    tracing::debug!("uname failed: {}", std::io::Error::last_os_error());
    fallback_os_info()
}

#[cfg(not(unix))]
fn os_info() -> OsInfo {
    fallback_os_info()
}

fn fallback_os_info() -> OsInfo {
    OsInfo {
        sysname: std::env::consts::OS.to_owned(),
        release: None,
        version: None,
        host: None,
        arch: std::env::consts::ARCH.to_owned(),
    }
}

#[cfg(unix)]
fn current_uid() -> Option<u32> {
    // SAFETY: getuid has no failure mode.
    Some(unsafe { libc::getuid() })
}

#[cfg(not(unix))]
fn current_uid() -> Option<u32> {
    None
}

#[cfg(unix)]
fn current_username() -> Option<String> {
    // SAFETY: the passwd entry is read before any other call could reuse
    // the static buffer getpwuid returns.
    unsafe {
        let entry = libc::getpwuid(libc::getuid());
        if entry.is_null() || (*entry).pw_name.is_null() {
            return None;
        }
        let name = std::ffi::CStr::from_ptr((*entry).pw_name);
        Some(name.to_string_lossy().into_owned())
    }
}

#[cfg(not(unix))]
fn current_username() -> Option<String> {
    std::env::var("USERNAME").ok()
}

impl WriteDfxml for ExecutionEnvironment {
    fn write_dfxml(&self, writer: &DfxmlWriter) -> Result<()> {
        writer.push("execution_environment", "")?;
        if let Some(cpu) = &self.cpuid {
            cpu.write_dfxml(writer)?;
        }
        writer.write_element("os_sysname", &self.os.sysname, "")?;
        if let Some(release) = &self.os.release {
            writer.write_element("os_release", release, "")?;
        }
        if let Some(version) = &self.os.version {
            writer.write_element("os_version", version, "")?;
        }
        if let Some(host) = &self.os.host {
            writer.write_element("host", host, "")?;
        }
        writer.write_element("arch", &self.os.arch, "")?;
        writer.write_element("command_line", &self.command_line, "")?;
        if let Some(uid) = self.uid {
            writer.write_formatted("uid", "", format_args!("{uid}"))?;
        }
        if let Some(username) = &self.username {
            writer.write_element("username", username, "")?;
        }
        writer.write_element("start_time", &self.start_time, "")?;
        writer.pop()?;
        Ok(())
    }
}
