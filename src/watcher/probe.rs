//! Resource probes untuk resource watcher

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::protocol::ResourceInfo;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("statvfs({path}) failed: {source}")]
    Disk {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("mount path {0} contains a NUL byte")]
    InvalidPath(PathBuf),
    #[error("sysconf({name}) failed: {source}")]
    Sysconf {
        name: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

/// Sumber data disk dan memory
pub trait ResourceProbe {
    fn measure_disk(&self) -> Result<ResourceInfo, ProbeError>;
    fn measure_memory(&self) -> Result<ResourceInfo, ProbeError>;
}

/// Probe dari OS: `statvfs` untuk disk, `sysconf` untuk memory
#[cfg(unix)]
#[derive(Debug, Clone)]
pub struct SystemProbe {
    mount: PathBuf,
}

#[cfg(unix)]
impl Default for SystemProbe {
    fn default() -> Self {
        Self::new("/")
    }
}

#[cfg(unix)]
impl SystemProbe {
    pub fn new(mount: impl Into<PathBuf>) -> Self {
        Self {
            mount: mount.into(),
        }
    }

    pub fn mount(&self) -> &Path {
        &self.mount
    }
}

#[cfg(unix)]
impl ResourceProbe for SystemProbe {
    fn measure_disk(&self) -> Result<ResourceInfo, ProbeError> {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(self.mount.as_os_str().as_bytes())
            .map_err(|_| ProbeError::InvalidPath(self.mount.clone()))?;

        // SAFETY: statvfs is plain old data and filled by the call below
        let mut stats: libc::statvfs = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stats) };
        if rc != 0 {
            return Err(ProbeError::Disk {
                path: self.mount.clone(),
                source: io::Error::last_os_error(),
            });
        }

        let frsize = stats.f_frsize as u64;
        Ok(ResourceInfo::new(
            frsize.saturating_mul(stats.f_blocks as u64),
            frsize.saturating_mul(stats.f_bfree as u64),
        ))
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    fn measure_memory(&self) -> Result<ResourceInfo, ProbeError> {
        let page = sysconf(libc::_SC_PAGESIZE, "_SC_PAGESIZE")?;
        let total = sysconf(libc::_SC_PHYS_PAGES, "_SC_PHYS_PAGES")?;
        let avail = sysconf(libc::_SC_AVPHYS_PAGES, "_SC_AVPHYS_PAGES")?;

        Ok(ResourceInfo::new(
            total.saturating_mul(page),
            avail.saturating_mul(page),
        ))
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    fn measure_memory(&self) -> Result<ResourceInfo, ProbeError> {
        Err(ProbeError::Unsupported("available memory probe"))
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn sysconf(name: libc::c_int, label: &'static str) -> Result<u64, ProbeError> {
    // SAFETY: sysconf has no memory side effects
    let v = unsafe { libc::sysconf(name) };
    if v < 0 {
        return Err(ProbeError::Sysconf {
            name: label,
            source: io::Error::last_os_error(),
        });
    }
    Ok(v as u64)
}
