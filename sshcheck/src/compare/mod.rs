//! Recursive directory tree comparison.
//!
//! Used after a round trip to prove the pulled tree is the pushed one:
//! same names at every level, same kinds, same permission bits, same sizes
//! and byte-identical contents. The first difference wins.

mod snapshot;

pub use snapshot::{DirectorySnapshot, EntryKind, SnapshotEntry};

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{CompareError, MismatchError, MismatchKind};
use snapshot::permission_bits;

const CHUNK_SIZE: usize = 8 * 1024;

/// Compare the trees rooted at `left` and `right`.
pub fn compare_trees(left: &Path, right: &Path) -> Result<(), CompareError> {
    let left_mode = mode_of(left)?;
    let right_mode = mode_of(right)?;
    if left_mode != right_mode {
        return Err(mismatch(
            PathBuf::new(),
            MismatchKind::Mode {
                left: left_mode,
                right: right_mode,
            },
        ));
    }

    compare_level(left, right, Path::new(""))?;
    debug!("{} matches {}", left.display(), right.display());
    Ok(())
}

fn compare_level(left: &Path, right: &Path, relative: &Path) -> Result<(), CompareError> {
    let a = DirectorySnapshot::capture(left)?;
    let b = DirectorySnapshot::capture(right)?;

    if a.len() != b.len() {
        return Err(mismatch(
            relative.to_path_buf(),
            MismatchKind::EntryCount {
                left: a.len(),
                right: b.len(),
            },
        ));
    }

    for (x, y) in a.entries().iter().zip(b.entries()) {
        if x.name != y.name {
            return Err(mismatch(
                relative.to_path_buf(),
                MismatchKind::Name {
                    left: x.name.clone(),
                    right: y.name.clone(),
                },
            ));
        }

        let path = relative.join(&x.name);
        if x.kind != y.kind {
            return Err(mismatch(path, MismatchKind::Kind));
        }

        if x.mode != y.mode {
            return Err(mismatch(
                path,
                MismatchKind::Mode {
                    left: x.mode,
                    right: y.mode,
                },
            ));
        }

        match x.kind {
            EntryKind::Directory => {
                compare_level(&left.join(&x.name), &right.join(&y.name), &path)?;
            }
            EntryKind::File => {
                if x.size != y.size {
                    return Err(mismatch(
                        path,
                        MismatchKind::Size {
                            left: x.size,
                            right: y.size,
                        },
                    ));
                }
                if let Some(offset) =
                    first_difference(&left.join(&x.name), &right.join(&y.name))?
                {
                    return Err(mismatch(path, MismatchKind::Content { offset }));
                }
            }
        }
    }

    Ok(())
}

fn mismatch(path: PathBuf, kind: MismatchKind) -> CompareError {
    MismatchError { path, kind }.into()
}

fn mode_of(path: &Path) -> Result<u32, CompareError> {
    fs::metadata(path)
        .map(|meta| permission_bits(&meta))
        .map_err(|source| io_error(path, source))
}

fn io_error(path: &Path, source: io::Error) -> CompareError {
    CompareError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Offset of the first differing byte, if any.
fn first_difference(left: &Path, right: &Path) -> Result<Option<u64>, CompareError> {
    let mut a = File::open(left).map_err(|e| io_error(left, e))?;
    let mut b = File::open(right).map_err(|e| io_error(right, e))?;
    let mut buf_a = vec![0u8; CHUNK_SIZE];
    let mut buf_b = vec![0u8; CHUNK_SIZE];
    let mut offset = 0u64;

    loop {
        let n = fill(&mut a, &mut buf_a).map_err(|e| io_error(left, e))?;
        let m = fill(&mut b, &mut buf_b).map_err(|e| io_error(right, e))?;

        if let Some(i) = buf_a[..n]
            .iter()
            .zip(&buf_b[..m])
            .position(|(x, y)| x != y)
        {
            return Ok(Some(offset + i as u64));
        }
        if n != m {
            return Ok(Some(offset + n.min(m) as u64));
        }
        if n == 0 {
            return Ok(None);
        }
        offset += n as u64;
    }
}

/// Read until `buf` is full or the reader is exhausted.
fn fill(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
