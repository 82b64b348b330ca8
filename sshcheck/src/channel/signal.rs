//! Process-group signalling for pty children.
//!
//! A pty child is a session leader, so its pid is also its process group id
//! and `kill(-pid, ..)` reaches everything it started in that group.

use std::io;

fn as_pid(pid: u32) -> io::Result<libc::pid_t> {
    libc::pid_t::try_from(pid)
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("bad pid {}", pid)))
}

/// Send `signal` to the process group led by `pid`, falling back to the pid
/// alone. A process that is already gone counts as success.
pub(crate) fn signal_group(pid: u32, signal: libc::c_int) -> io::Result<()> {
    let pid = as_pid(pid)?;

    // SAFETY: kill has no memory-safety preconditions.
    if unsafe { libc::kill(-pid, signal) } == 0 {
        return Ok(());
    }
    let group_err = io::Error::last_os_error();

    // SAFETY: as above.
    if unsafe { libc::kill(pid, signal) } == 0 {
        return Ok(());
    }
    let pid_err = io::Error::last_os_error();

    if is_no_such_process(&group_err) && is_no_such_process(&pid_err) {
        return Ok(());
    }
    Err(pid_err)
}

/// Whether a process with this pid exists (zombies included).
pub(crate) fn is_running(pid: u32) -> bool {
    match as_pid(pid) {
        // SAFETY: signal 0 only checks for existence.
        Ok(pid) => (unsafe { libc::kill(pid, 0) }) == 0,
        Err(_) => false,
    }
}

fn is_no_such_process(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::ESRCH)
}
