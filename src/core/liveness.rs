//! Process liveness check
//!
//! Registry hanya menyimpan process id; apakah process itu masih hidup
//! ditanyakan ke OS lewat trait ini.

/// Answers "does a process with this id currently exist?"
///
/// Any failure to answer must be reported as `false`.
pub trait Liveness {
    fn process_exists(&self, pid: u32) -> bool;
}

/// Liveness dari process table OS, via `kill(pid, 0)`
#[cfg(unix)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessTable;

#[cfg(unix)]
impl Liveness for ProcessTable {
    fn process_exists(&self, pid: u32) -> bool {
        // pid 0 and negative values address process groups, never a single process
        let pid = match libc::pid_t::try_from(pid) {
            Ok(p) if p > 0 => p,
            _ => return false,
        };

        // SAFETY: signal 0 performs only the existence and permission check
        let rc = unsafe { libc::kill(pid, 0) };
        if rc == 0 {
            return true;
        }

        // EPERM: the process exists but belongs to someone else
        std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
    }
}

impl<F> Liveness for F
where
    F: Fn(u32) -> bool,
{
    fn process_exists(&self, pid: u32) -> bool {
        self(pid)
    }
}
