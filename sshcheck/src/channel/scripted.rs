//! In-memory pty stand-in for tests.
//!
//! The "child" is a closure running on its own thread. Its output travels to
//! the master reader as discrete chunks over a channel, so tests control
//! exactly how a prompt is split across reads.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::pty::{ChildHandle, CommandSpec, ProcessKiller, PtyBackend, PtyHandles};
use crate::error::PtyError;

type Script = Box<dyn FnOnce(ChildIo) -> u32 + Send>;

/// The child's view of the pty.
pub(crate) struct ChildIo {
    output: Option<Sender<Vec<u8>>>,
    input: Receiver<Vec<u8>>,
    killed: Arc<AtomicBool>,
    force_killed: Arc<AtomicBool>,
}

impl ChildIo {
    /// Emit one chunk of output.
    pub fn write(&self, data: &[u8]) {
        if let Some(ref tx) = self.output {
            let _ = tx.send(data.to_vec());
        }
    }

    /// Read input up to and including a newline.
    pub fn read_line(&self, timeout: Duration) -> Option<Vec<u8>> {
        let deadline = Instant::now() + timeout;
        let mut line = Vec::new();
        while !line.ends_with(b"\n") {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            match self.input.recv_timeout(remaining) {
                Ok(chunk) => line.extend_from_slice(&chunk),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None;
                }
            }
        }
        Some(line)
    }

    /// Whether the parent has killed this child.
    pub fn killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    /// Block until killed.
    pub fn hang(&self) {
        while !self.killed() {
            thread::sleep(Duration::from_millis(5));
        }
    }

    /// Block until force-killed, as a child that traps SIGHUP would.
    pub fn hang_ignoring_hangup(&self) {
        while !self.force_killed.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(5));
        }
    }

    /// Hand the output side to someone who outlives the child's exit.
    pub fn detach_output(&mut self) -> Sender<Vec<u8>> {
        match self.output.take() {
            Some(tx) => tx,
            None => mpsc::channel().0,
        }
    }
}

/// Observations shared between a [`ScriptedPty`] and the test.
#[derive(Clone, Default)]
pub(crate) struct Monitor {
    /// Everything the parent wrote to the master.
    pub input: Arc<Mutex<Vec<u8>>>,

    /// Separate output chunks handed to the master reader.
    pub chunks_read: Arc<AtomicUsize>,

    /// Times the master was actually released.
    pub master_releases: Arc<AtomicUsize>,

    /// Set once the child thread has returned.
    pub exited: Arc<AtomicBool>,

    /// Set when the killer fired.
    pub killed: Arc<AtomicBool>,

    /// Set when the killer escalated to a forced kill.
    pub force_killed: Arc<AtomicBool>,
}

impl Monitor {
    pub fn input(&self) -> Vec<u8> {
        self.input.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

/// Scripted [`PtyBackend`].
pub(crate) struct ScriptedPty {
    script: Option<Script>,
    monitor: Monitor,
    opened: bool,
    attached: bool,
    fail_open: bool,
}

impl ScriptedPty {
    pub fn new(script: impl FnOnce(ChildIo) -> u32 + Send + 'static) -> Self {
        Self {
            script: Some(Box::new(script)),
            monitor: Monitor::default(),
            opened: false,
            attached: false,
            fail_open: false,
        }
    }

    /// A backend whose `open` fails, as when the OS is out of ptys.
    pub fn exhausted() -> Self {
        let mut pty = Self::new(|_| 0);
        pty.fail_open = true;
        pty
    }

    pub fn monitor(&self) -> Monitor {
        self.monitor.clone()
    }
}

impl PtyBackend for ScriptedPty {
    fn open(&mut self) -> Result<(), PtyError> {
        if self.fail_open {
            return Err(PtyError::OpenFailed("out of pseudo-terminals".into()));
        }
        self.opened = true;
        Ok(())
    }

    fn attach(&mut self, _command: &CommandSpec) -> Result<(), PtyError> {
        if !self.opened {
            return Err(PtyError::NotOpen);
        }
        self.attached = true;
        Ok(())
    }

    fn start(&mut self) -> Result<PtyHandles, PtyError> {
        if !self.opened {
            return Err(PtyError::NotOpen);
        }
        if !self.attached {
            return Err(PtyError::NotAttached);
        }
        let script = self.script.take().ok_or(PtyError::NotAttached)?;

        let (out_tx, out_rx) = mpsc::channel();
        let (in_tx, in_rx) = mpsc::channel();
        let killed = self.monitor.killed.clone();
        let force_killed = self.monitor.force_killed.clone();
        let exited = self.monitor.exited.clone();

        let io = ChildIo {
            output: Some(out_tx),
            input: in_rx,
            killed: killed.clone(),
            force_killed: force_killed.clone(),
        };
        let handle = thread::spawn(move || {
            let code = script(io);
            exited.store(true, Ordering::SeqCst);
            code
        });

        Ok(PtyHandles {
            reader: Box::new(ChunkReader {
                rx: out_rx,
                pending: Vec::new(),
                pos: 0,
                chunks_read: self.monitor.chunks_read.clone(),
            }),
            writer: Box::new(ChunkWriter {
                tx: in_tx,
                log: self.monitor.input.clone(),
            }),
            child: Box::new(ScriptedChild {
                handle: Some(handle),
                killed,
                force_killed,
            }),
        })
    }

    fn close(&mut self) {
        if self.opened {
            self.opened = false;
            self.monitor.master_releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

struct ChunkReader {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    pos: usize,
    chunks_read: Arc<AtomicUsize>,
}

impl Read for ChunkReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.pending.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.chunks_read.fetch_add(1, Ordering::SeqCst);
                    self.pending = chunk;
                    self.pos = 0;
                }
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len() - self.pos);
        buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

struct ChunkWriter {
    tx: Sender<Vec<u8>>,
    log: Arc<Mutex<Vec<u8>>>,
}

impl Write for ChunkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut log) = self.log.lock() {
            log.extend_from_slice(buf);
        }
        self.tx
            .send(buf.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "child input closed"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct ScriptedChild {
    handle: Option<JoinHandle<u32>>,
    killed: Arc<AtomicBool>,
    force_killed: Arc<AtomicBool>,
}

impl ChildHandle for ScriptedChild {
    fn wait(&mut self) -> io::Result<u32> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| io::Error::other("already waited"))?;
        handle
            .join()
            .map_err(|_| io::Error::other("scripted child panicked"))
    }

    fn killer(&self) -> Box<dyn ProcessKiller> {
        Box::new(ScriptedKiller {
            killed: self.killed.clone(),
            force_killed: self.force_killed.clone(),
        })
    }

    fn process_id(&self) -> Option<u32> {
        None
    }
}

struct ScriptedKiller {
    killed: Arc<AtomicBool>,
    force_killed: Arc<AtomicBool>,
}

impl ProcessKiller for ScriptedKiller {
    fn kill(&mut self) -> io::Result<()> {
        self.killed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn force_kill(&mut self) -> io::Result<()> {
        self.killed.store(true, Ordering::SeqCst);
        self.force_killed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
