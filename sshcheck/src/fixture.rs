//! Disposable source and target trees for transfer checks.

use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use rand::Rng;
use tempfile::TempDir;

use crate::error::ConfigError;

/// Name of the generated payload.
pub const FIXTURE_FILE: &str = "binary.dat";

/// Size of the generated payload in bytes.
pub const FIXTURE_SIZE: usize = 1024;

/// A source directory holding one random file, plus an empty target.
///
/// Both directories are removed on drop.
#[derive(Debug)]
pub struct TransferFixture {
    source: TempDir,
    target: TempDir,
}

impl TransferFixture {
    pub fn new() -> Result<Self, ConfigError> {
        let source = tempfile::Builder::new()
            .prefix("scp-source")
            .tempdir()
            .map_err(ConfigError::Fixture)?;
        let target = tempfile::Builder::new()
            .prefix("scp-target")
            .tempdir()
            .map_err(ConfigError::Fixture)?;

        let mut data = [0u8; FIXTURE_SIZE];
        rand::thread_rng().fill(&mut data[..]);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o664)
            .open(source.path().join(FIXTURE_FILE))
            .map_err(ConfigError::Fixture)?;
        file.write_all(&data).map_err(ConfigError::Fixture)?;
        file.sync_all().map_err(ConfigError::Fixture)?;

        Ok(Self { source, target })
    }

    pub fn source(&self) -> &Path {
        self.source.path()
    }

    pub fn target(&self) -> &Path {
        self.target.path()
    }

    /// Path of the payload inside the source directory.
    pub fn file(&self) -> PathBuf {
        self.source.path().join(FIXTURE_FILE)
    }

    pub fn file_name(&self) -> &'static str {
        FIXTURE_FILE
    }
}
