//! Pseudo-terminal sessions for interactive child processes.
//!
//! Programs like `scp` only read a password from a terminal, so the child is
//! started with the slave side of a pty as its stdin, stdout and stderr and
//! as its controlling terminal. The caller talks to it through the master.
//!
//! [`PtyBackend`] is the small capability seam (`open`/`attach`/`start`/
//! `close`) the rest of the crate is written against. [`NativePty`] is the
//! OS implementation.

use std::ffi::OsString;
use std::fmt;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use indexmap::IndexMap;
use log::{debug, warn};
use portable_pty::{
    Child as PtyChild, ChildKiller as PtyChildKiller, CommandBuilder, MasterPty, PtySize, SlavePty,
    native_pty_system,
};

use super::signal::signal_group;
use crate::error::PtyError;

/// EIO on Linux and macOS; reported by the master once the slave hangs up.
const EIO: i32 = 5;

/// Description of the child process to run behind the pty.
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    /// Program path.
    pub program: PathBuf,

    /// Arguments, in order.
    pub args: Vec<OsString>,

    /// Extra environment, applied in insertion order on top of the inherited one.
    pub env: IndexMap<OsString, OsString>,

    /// Working directory (inherited when unset).
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    /// Create a command for `program` with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child.
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Render the command line for logs.
    pub fn display(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// A child process whose stdio is the slave side of a pty.
pub trait ChildHandle: Send {
    /// Block until the child exits and return its exit code.
    fn wait(&mut self) -> io::Result<u32>;

    /// A handle that can terminate the child from another thread.
    fn killer(&self) -> Box<dyn ProcessKiller>;

    /// OS process id, if there is one.
    fn process_id(&self) -> Option<u32>;
}

/// Terminates a running child.
pub trait ProcessKiller: Send + Sync {
    /// Ask the child to stop.
    fn kill(&mut self) -> io::Result<()>;

    /// Stop the child and its process group unconditionally.
    fn force_kill(&mut self) -> io::Result<()> {
        self.kill()
    }
}

/// Master-side handles and the child, returned by [`PtyBackend::start`].
pub struct PtyHandles {
    /// Reads the child's output.
    pub reader: Box<dyn Read + Send>,

    /// Writes the child's input.
    pub writer: Box<dyn Write + Send>,

    /// The running child.
    pub child: Box<dyn ChildHandle>,
}

impl fmt::Debug for PtyHandles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PtyHandles")
            .field("pid", &self.child.process_id())
            .finish_non_exhaustive()
    }
}

/// Capability interface for pseudo-terminal sessions.
///
/// The call order is `open`, `attach`, `start`, then `close` once the session
/// is over. Failures are fatal to the session; nothing is retried.
pub trait PtyBackend: Send {
    /// Allocate the pty pair.
    fn open(&mut self) -> Result<(), PtyError>;

    /// Bind the slave as the child's stdio and controlling terminal.
    fn attach(&mut self, command: &CommandSpec) -> Result<(), PtyError>;

    /// Spawn the child and drop our slave reference.
    fn start(&mut self) -> Result<PtyHandles, PtyError>;

    /// Release the master. Idempotent.
    fn close(&mut self);
}

/// Configuration for pty allocation.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Terminal width.
    pub terminal_width: u16,

    /// Terminal height.
    pub terminal_height: u16,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            terminal_width: 511,
            terminal_height: 24,
        }
    }
}

/// OS pseudo-terminal backed by `portable-pty`.
///
/// `portable-pty` runs `setsid` and `TIOCSCTTY` in the child before exec, so
/// the child is a session leader with the pty as its controlling terminal.
pub struct NativePty {
    config: PtyConfig,
    master: Option<Box<dyn MasterPty + Send>>,
    slave: Option<Box<dyn SlavePty + Send>>,
    command: Option<CommandBuilder>,
    program: String,
}

impl NativePty {
    /// Create an unopened pty with the given configuration.
    pub fn new(config: PtyConfig) -> Self {
        Self {
            config,
            master: None,
            slave: None,
            command: None,
            program: String::new(),
        }
    }

    /// Create an unopened pty with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(PtyConfig::default())
    }

    /// Whether the master is currently held.
    pub fn is_open(&self) -> bool {
        self.master.is_some()
    }
}

impl PtyBackend for NativePty {
    fn open(&mut self) -> Result<(), PtyError> {
        let pair = native_pty_system()
            .openpty(PtySize {
                rows: self.config.terminal_height,
                cols: self.config.terminal_width,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::OpenFailed(e.to_string()))?;

        self.master = Some(pair.master);
        self.slave = Some(pair.slave);
        debug!(
            "pty opened ({}x{})",
            self.config.terminal_width, self.config.terminal_height
        );
        Ok(())
    }

    fn attach(&mut self, command: &CommandSpec) -> Result<(), PtyError> {
        if self.slave.is_none() {
            return Err(PtyError::NotOpen);
        }

        let mut builder = CommandBuilder::new(&command.program);
        builder.args(&command.args);
        for (key, value) in &command.env {
            builder.env(key, value);
        }
        if let Some(ref cwd) = command.cwd {
            builder.cwd(cwd);
        }

        self.program = command.program.display().to_string();
        self.command = Some(builder);
        Ok(())
    }

    fn start(&mut self) -> Result<PtyHandles, PtyError> {
        let master = self.master.as_ref().ok_or(PtyError::NotOpen)?;
        let slave = self.slave.take().ok_or(PtyError::NotOpen)?;
        let command = self.command.take().ok_or(PtyError::NotAttached)?;

        let child = slave
            .spawn_command(command)
            .map_err(|e| PtyError::SpawnFailed {
                program: self.program.clone(),
                message: e.to_string(),
            })?;

        // The child holds its own copies of the slave. Ours must go now or the
        // master never sees end-of-stream when the child exits.
        drop(slave);

        let reader = master
            .try_clone_reader()
            .map_err(|e| PtyError::MasterUnavailable(e.to_string()))?;
        let writer = master
            .take_writer()
            .map_err(|e| PtyError::MasterUnavailable(e.to_string()))?;

        debug!("spawned {} (pid {:?})", self.program, child.process_id());

        Ok(PtyHandles {
            reader: Box::new(MasterReader(reader)),
            writer,
            child: Box::new(NativeChild(child)),
        })
    }

    fn close(&mut self) {
        // A slave left here means start() never ran.
        self.slave = None;
        self.command = None;
        if self.master.take().is_some() {
            debug!("pty master closed");
        }
    }
}

impl Drop for NativePty {
    fn drop(&mut self) {
        self.close();
    }
}

/// Master reader that reports a slave hangup as end-of-stream.
struct MasterReader(Box<dyn Read + Send>);

impl Read for MasterReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.0.read(buf) {
            Err(e) if e.raw_os_error() == Some(EIO) => Ok(0),
            other => other,
        }
    }
}

struct NativeChild(Box<dyn PtyChild + Send + Sync>);

impl ChildHandle for NativeChild {
    fn wait(&mut self) -> io::Result<u32> {
        let status = self.0.wait()?;
        Ok(status.exit_code())
    }

    fn killer(&self) -> Box<dyn ProcessKiller> {
        Box::new(NativeKiller {
            hangup: self.0.clone_killer(),
            pid: self.0.process_id(),
        })
    }

    fn process_id(&self) -> Option<u32> {
        self.0.process_id()
    }
}

/// `portable-pty`'s killer only sends SIGHUP, which a child may ignore.
struct NativeKiller {
    hangup: Box<dyn PtyChildKiller + Send + Sync>,
    pid: Option<u32>,
}

impl ProcessKiller for NativeKiller {
    fn kill(&mut self) -> io::Result<()> {
        self.hangup
            .kill()
            .inspect_err(|e| warn!("failed to hang up child: {}", e))
    }

    fn force_kill(&mut self) -> io::Result<()> {
        let Some(pid) = self.pid else {
            return self.kill();
        };
        debug!("sending SIGKILL to process group {}", pid);
        signal_group(pid, libc::SIGKILL)
            .inspect_err(|e| warn!("failed to kill process group {}: {}", pid, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::signal::is_running;

    fn read_all(reader: &mut dyn Read) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            match reader.read(&mut buf) {
                Ok(0) | Err(_) => return out,
                Ok(n) => out.extend_from_slice(&buf[..n]),
            }
        }
    }

    #[test]
    fn test_command_spec_display() {
        let cmd = CommandSpec::new("/usr/bin/scp")
            .arg("-r")
            .args(["-P", "2222"])
            .env("LC_ALL", "C");
        assert_eq!(cmd.display(), "/usr/bin/scp -r -P 2222");
        assert_eq!(cmd.env.len(), 1);
    }

    #[test]
    fn test_attach_before_open() {
        let mut pty = NativePty::with_defaults();
        let err = pty.attach(&CommandSpec::new("/bin/sh")).unwrap_err();
        assert!(matches!(err, PtyError::NotOpen));
    }

    #[test]
    fn test_start_before_attach() {
        let mut pty = NativePty::with_defaults();
        pty.open().unwrap();
        let err = pty.start().unwrap_err();
        assert!(matches!(err, PtyError::NotAttached));
        pty.close();
    }

    #[test]
    fn test_eof_after_child_exit() {
        let mut pty = NativePty::with_defaults();
        pty.open().unwrap();
        pty.attach(&CommandSpec::new("/bin/sh").args(["-c", "printf SSHCHECK_OK"]))
            .unwrap();
        let mut handles = pty.start().unwrap();

        // Returns only once the slave is fully closed.
        let output = read_all(&mut handles.reader);
        assert!(String::from_utf8_lossy(&output).contains("SSHCHECK_OK"));
        assert_eq!(handles.child.wait().unwrap(), 0);

        pty.close();
    }

    #[test]
    fn test_child_has_controlling_terminal() {
        let mut pty = NativePty::with_defaults();
        pty.open().unwrap();
        pty.attach(&CommandSpec::new("/bin/sh").args(["-c", "tty -s && printf IS_TTY"]))
            .unwrap();
        let mut handles = pty.start().unwrap();

        let output = read_all(&mut handles.reader);
        assert!(String::from_utf8_lossy(&output).contains("IS_TTY"));
        assert_eq!(handles.child.wait().unwrap(), 0);
    }

    #[test]
    fn test_nonzero_exit_code() {
        let mut pty = NativePty::with_defaults();
        pty.open().unwrap();
        pty.attach(&CommandSpec::new("/bin/sh").args(["-c", "exit 3"]))
            .unwrap();
        let mut handles = pty.start().unwrap();

        read_all(&mut handles.reader);
        assert_eq!(handles.child.wait().unwrap(), 3);
    }

    #[test]
    fn test_spawn_missing_program() {
        let mut pty = NativePty::with_defaults();
        pty.open().unwrap();
        pty.attach(&CommandSpec::new("/nonexistent/sshcheck-program"))
            .unwrap();
        let err = pty.start().unwrap_err();
        assert!(matches!(err, PtyError::SpawnFailed { .. }));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut pty = NativePty::with_defaults();
        pty.open().unwrap();
        assert!(pty.is_open());
        pty.close();
        pty.close();
        assert!(!pty.is_open());
    }

    #[test]
    fn test_force_kill_stops_child_ignoring_hangup() {
        let mut pty = NativePty::with_defaults();
        pty.open().unwrap();
        pty.attach(&CommandSpec::new("/bin/sh").args(["-c", "trap '' HUP; exec sleep 30"]))
            .unwrap();
        let mut handles = pty.start().unwrap();
        let pid = handles.child.process_id().unwrap();

        let mut killer = handles.child.killer();
        killer.force_kill().unwrap();
        handles.child.wait().unwrap();

        // The slave is gone with the group, so the master reaches end-of-stream.
        read_all(&mut handles.reader);
        assert!(!is_running(pid));
        pty.close();
    }
}
